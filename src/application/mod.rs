//! Application layer - Use cases and port interfaces
//!
//! Contains the recording and streaming operations and the trait
//! definitions for audio inputs, encoders and configuration storage.

pub mod audio_kit;
pub mod capture_session;
pub mod device;
pub mod error;
pub mod file_recorder;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export use cases
pub use audio_kit::{AudioKit, AudioKitSettings};
pub use capture_session::{AmplitudeEvent, AmplitudeStream, AudioCaptureSession};
pub use device::{DeviceArbiter, DeviceLease, DevicePolicy, DeviceUser};
pub use error::AudioKitError;
pub use file_recorder::{validate_output_path, ErrorCallback, FileRecorder};
