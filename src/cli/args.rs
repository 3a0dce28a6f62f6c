//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::config::{AppConfig, InputSource};
use crate::domain::recording::Duration;

/// audio-kit - microphone recording and live amplitude streaming
#[derive(Parser, Debug)]
#[command(name = "audio-kit")]
#[command(version)]
#[command(about = "Record the microphone to FLAC and stream live amplitudes")]
#[command(long_about = None)]
pub struct Cli {
    /// Audio source
    #[arg(long, global = true, value_name = "SOURCE")]
    pub source: Option<SourceArg>,

    /// Audio host (e.g. alsa, jack, coreaudio, wasapi)
    #[arg(long, global = true, value_name = "HOST")]
    pub host: Option<String>,

    /// Input device name (see `audio-kit devices`)
    #[arg(long, global = true, value_name = "NAME")]
    pub device: Option<String>,

    /// Capture sample rate in Hz
    #[arg(long, global = true, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Samples per amplitude frame
    #[arg(long, global = true, value_name = "SAMPLES")]
    pub buffer_size: Option<usize>,

    /// Let recording and streaming open the device at the same time
    #[arg(long, global = true)]
    pub shared_device: bool,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings given on the command line, for merging over the config file
    pub fn config_overrides(&self) -> AppConfig {
        AppConfig {
            source: self.source.map(|s| InputSource::from(s).to_string()),
            host: self.host.clone(),
            device: self.device.clone(),
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
            exclusive_device: if self.shared_device { Some(false) } else { None },
            ..Default::default()
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record to a FLAC file until the duration elapses or Ctrl-C
    Record {
        /// Output file
        path: PathBuf,

        /// Recording duration (e.g., 10s, 1m, 2m30s)
        #[arg(short = 'd', long, value_name = "TIME")]
        duration: Option<String>,
    },
    /// Print live amplitude frames until the duration elapses or Ctrl-C
    Stream {
        /// Streaming duration (e.g., 500ms, 10s)
        #[arg(short = 'd', long, value_name = "TIME")]
        duration: Option<String>,

        /// Emit one JSON object per frame
        #[arg(long)]
        json: bool,
    },
    /// List input devices
    Devices,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Source argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    #[value(alias = "mic")]
    Microphone,
    Sine,
}

impl From<SourceArg> for InputSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Microphone => InputSource::Microphone,
            SourceArg::Sine => InputSource::Sine,
        }
    }
}

/// Parsed record options
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub path: PathBuf,
    /// Unbounded (until Ctrl-C) when `None`
    pub duration: Option<Duration>,
}

/// Parsed stream options
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub duration: Option<Duration>,
    pub json: bool,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "source",
    "host",
    "device",
    "sample_rate",
    "buffer_size",
    "queue_depth",
    "exclusive_device",
    "stall_timeout",
    "log_level",
];

/// Valid log level values
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
