//! Application configuration value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::InvalidSourceError;
use crate::domain::recording::Duration;
use crate::domain::stream::format::{CaptureFormat, DEFAULT_FRAME_LEN, DEFAULT_SAMPLE_RATE};

/// Default number of frames queued toward a slow subscriber
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Where audio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputSource {
    #[default]
    Microphone,
    /// Generated test tone, no hardware needed
    Sine,
}

impl InputSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Microphone => "microphone",
            Self::Sine => "sine",
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InputSource {
    type Err = InvalidSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "microphone" | "mic" => Ok(Self::Microphone),
            "sine" => Ok(Self::Sine),
            _ => Err(InvalidSourceError {
                input: s.to_string(),
            }),
        }
    }
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub source: Option<String>,
    pub host: Option<String>,
    pub device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<usize>,
    pub queue_depth: Option<usize>,
    pub exclusive_device: Option<bool>,
    pub stall_timeout: Option<String>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            source: Some(InputSource::default().to_string()),
            host: None,
            device: None,
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            buffer_size: Some(DEFAULT_FRAME_LEN),
            queue_depth: Some(DEFAULT_QUEUE_DEPTH),
            exclusive_device: Some(true),
            stall_timeout: Some(Duration::default_stall_timeout().to_string()),
            log_level: Some("warn".to_string()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            source: other.source.or(self.source),
            host: other.host.or(self.host),
            device: other.device.or(self.device),
            sample_rate: other.sample_rate.or(self.sample_rate),
            buffer_size: other.buffer_size.or(self.buffer_size),
            queue_depth: other.queue_depth.or(self.queue_depth),
            exclusive_device: other.exclusive_device.or(self.exclusive_device),
            stall_timeout: other.stall_timeout.or(self.stall_timeout),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn source_or_default(&self) -> InputSource {
        self.source
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Capture format from sample_rate/buffer_size; zero values fall back to defaults
    pub fn capture_format(&self) -> CaptureFormat {
        let sample_rate = self
            .sample_rate
            .filter(|r| *r > 0)
            .unwrap_or(DEFAULT_SAMPLE_RATE);
        let frame_len = self
            .buffer_size
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_FRAME_LEN);
        CaptureFormat::new(sample_rate, frame_len)
    }

    pub fn queue_depth_or_default(&self) -> usize {
        self.queue_depth
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_QUEUE_DEPTH)
    }

    pub fn exclusive_device_or_default(&self) -> bool {
        self.exclusive_device.unwrap_or(true)
    }

    pub fn stall_timeout_or_default(&self) -> Duration {
        self.stall_timeout
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_stall_timeout)
    }

    pub fn log_level_or_default(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }
}
