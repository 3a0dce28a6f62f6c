//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, Ctrl-C handling,
//! logging setup and the command runners.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod logging;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{
    load_merged_config, run_devices, run_record, run_stream, EXIT_ERROR, EXIT_SUCCESS,
    EXIT_USAGE_ERROR,
};
pub use args::{Cli, Commands, ConfigAction, RecordOptions, StreamOptions};
pub use presenter::Presenter;
