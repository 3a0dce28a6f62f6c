//! audio-kit CLI entry point

use std::process::ExitCode;

use clap::Parser;

use audio_kit::cli::{
    app::{load_merged_config, run_devices, run_record, run_stream, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands, RecordOptions, StreamOptions},
    config_cmd::handle_config_command,
    logging::init_tracing,
    presenter::Presenter,
};
use audio_kit::domain::config::AppConfig;
use audio_kit::domain::recording::Duration;
use audio_kit::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();
    let overrides = cli.config_overrides();

    match cli.command {
        // Config management never touches audio
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            match handle_config_command(action, &store, &presenter).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    presenter.error(&e.to_string());
                    ExitCode::from(EXIT_ERROR)
                }
            }
        }
        Commands::Record { path, duration } => {
            let duration = match parse_duration(duration.as_deref(), &presenter) {
                Ok(d) => d,
                Err(code) => return code,
            };
            let config = prepare(overrides, cli.verbose).await;
            run_record(&config, RecordOptions { path, duration }).await
        }
        Commands::Stream { duration, json } => {
            let duration = match parse_duration(duration.as_deref(), &presenter) {
                Ok(d) => d,
                Err(code) => return code,
            };
            let config = prepare(overrides, cli.verbose).await;
            run_stream(&config, StreamOptions { duration, json }).await
        }
        Commands::Devices => {
            let config = prepare(overrides, cli.verbose).await;
            run_devices(&config)
        }
    }
}

/// Merge stored config under the flags and install logging
async fn prepare(overrides: AppConfig, verbose: bool) -> AppConfig {
    let config = load_merged_config(overrides).await;
    init_tracing(verbose, config.log_level_or_default());
    config
}

fn parse_duration(raw: Option<&str>, presenter: &Presenter) -> Result<Option<Duration>, ExitCode> {
    match raw.map(str::parse::<Duration>) {
        None => Ok(None),
        Some(Ok(d)) => Ok(Some(d)),
        Some(Err(e)) => {
            presenter.error(&format!("Invalid duration: {}", e));
            Err(ExitCode::from(EXIT_USAGE_ERROR))
        }
    }
}
