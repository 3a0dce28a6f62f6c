//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod encoder;

// Re-export common types
pub use capture::{AudioInput, CaptureError, InputStream};
pub use config::ConfigStore;
pub use encoder::{EncodeError, RecordingSink, SinkFactory, SinkSummary};
