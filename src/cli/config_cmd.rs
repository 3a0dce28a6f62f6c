//! Config command handler

use tracing_subscriber::EnvFilter;

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, InputSource};
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS, VALID_LOG_LEVELS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let config = store.load().await?;

    match read_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        let value = read_value(&config, key);
        presenter.key_value(key, value.as_deref().unwrap_or(NOT_SET));
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Validate `value` and store it under `key`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "source" => {
            let source = value
                .parse::<InputSource>()
                .map_err(|e| invalid(key, e.to_string()))?;
            config.source = Some(source.to_string());
        }
        "host" => config.host = Some(value.to_string()),
        "device" => config.device = Some(value.to_string()),
        "sample_rate" => config.sample_rate = Some(parse_positive(key, value)?),
        "buffer_size" => config.buffer_size = Some(parse_positive(key, value)?),
        "queue_depth" => config.queue_depth = Some(parse_positive(key, value)?),
        "exclusive_device" => {
            config.exclusive_device = Some(
                parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'"))?,
            )
        }
        "stall_timeout" => {
            let timeout = value
                .parse::<Duration>()
                .map_err(|e| invalid(key, e.to_string()))?;
            config.stall_timeout = Some(timeout.to_string());
        }
        "log_level" => {
            validate_log_level(value).map_err(|message| invalid(key, message))?;
            config.log_level = Some(value.to_string());
        }
        _ => unreachable!(), // Already validated
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "source" => config.source.clone(),
        "host" => config.host.clone(),
        "device" => config.device.clone(),
        "sample_rate" => config.sample_rate.map(|v| v.to_string()),
        "buffer_size" => config.buffer_size.map(|v| v.to_string()),
        "queue_depth" => config.queue_depth.map(|v| v.to_string()),
        "exclusive_device" => config.exclusive_device.map(|b| b.to_string()),
        "stall_timeout" => config.stall_timeout.clone(),
        "log_level" => config.log_level.clone(),
        _ => None,
    }
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialOrd,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid(key, "Value must be a positive integer")),
    }
}

/// Accept a bare level name or any `RUST_LOG` style directive
fn validate_log_level(value: &str) -> Result<(), String> {
    if VALID_LOG_LEVELS.contains(&value.to_lowercase().as_str()) {
        return Ok(());
    }
    EnvFilter::try_new(value).map(|_| ()).map_err(|e| {
        format!(
            "{}. Use one of {} or a filter directive",
            e,
            VALID_LOG_LEVELS.join(", ")
        )
    })
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(key: &str, value: &str) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::empty();
        apply_value(&mut config, key, value)?;
        Ok(config)
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("true"), Ok(true));
        assert_eq!(parse_bool("false"), Ok(false));
        assert_eq!(parse_bool("yes"), Ok(true));
        assert_eq!(parse_bool("no"), Ok(false));
        assert_eq!(parse_bool("1"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("invalid").is_err());
    }

    #[test]
    fn source_is_normalized() {
        let config = set("source", "MIC").unwrap();
        assert_eq!(config.source.as_deref(), Some("microphone"));
        assert!(set("source", "tape").is_err());
    }

    #[test]
    fn sizes_must_be_positive() {
        assert_eq!(set("sample_rate", "48000").unwrap().sample_rate, Some(48000));
        assert_eq!(set("buffer_size", "512").unwrap().buffer_size, Some(512));
        assert!(set("sample_rate", "0").is_err());
        assert!(set("buffer_size", "-4").is_err());
        assert!(set("queue_depth", "many").is_err());
    }

    #[test]
    fn exclusive_device_takes_bool() {
        assert_eq!(
            set("exclusive_device", "no").unwrap().exclusive_device,
            Some(false)
        );
        assert!(set("exclusive_device", "sometimes").is_err());
    }

    #[test]
    fn stall_timeout_is_canonicalized() {
        let config = set("stall_timeout", "1500ms").unwrap();
        assert_eq!(config.stall_timeout.as_deref(), Some("1s500ms"));
        assert!(set("stall_timeout", "later").is_err());
    }

    #[test]
    fn log_level_accepts_levels_and_directives() {
        assert!(set("log_level", "debug").is_ok());
        assert!(set("log_level", "audio_kit=trace,warn").is_ok());
        assert!(set("log_level", "audio_kit=loud").is_err());
    }

    #[test]
    fn read_value_reports_unset() {
        let config = AppConfig::empty();
        for key in VALID_CONFIG_KEYS {
            assert!(read_value(&config, key).is_none());
        }
        let config = AppConfig::defaults();
        assert_eq!(read_value(&config, "source").as_deref(), Some("microphone"));
        assert_eq!(read_value(&config, "exclusive_device").as_deref(), Some("true"));
    }

    #[test]
    fn unknown_key_lists_valid_keys() {
        let err = check_key("api_key").unwrap_err();
        assert!(err.to_string().contains("sample_rate"));
    }
}
