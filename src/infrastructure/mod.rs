//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with the platform audio host, the file system and
//! the FLAC encoder.

pub mod capture;
pub mod config;
pub mod recording;

// Re-export adapters
pub use capture::{create_input, CpalInput, SineInput};
pub use config::XdgConfigStore;
pub use recording::{probe_flac, FlacSinkFactory};
