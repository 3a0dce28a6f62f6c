//! Domain layer - Core value objects
//!
//! Contains frames, formats, the recorder lifecycle and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod recording;
pub mod stream;

// Re-export common types
pub use config::{AppConfig, InputSource};
pub use error::*;
pub use recording::{Duration, RecorderLifecycle, RecorderState, RecordingClock, RecordingStatus};
pub use stream::{CaptureFormat, SampleFrame};
