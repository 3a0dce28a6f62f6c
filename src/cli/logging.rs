//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Filter used by `-v`
const VERBOSE_FILTER: &str = "debug";

/// Pick the filter: `-v` wins, then `RUST_LOG`, then the configured level
pub fn filter_directive(verbose: bool, env: Option<&str>, configured: &str) -> String {
    if verbose {
        return VERBOSE_FILTER.to_string();
    }
    match env {
        Some(directive) if !directive.trim().is_empty() => directive.to_string(),
        _ => configured.to_string(),
    }
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
pub fn init_tracing(verbose: bool, configured: &str) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(verbose, env.as_deref(), configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
