//! audio-kit - microphone recording and live amplitude streaming
//!
//! This crate records the microphone to FLAC files with pause/resume and
//! streams normalized amplitude frames to a subscriber, sharing one input
//! device between the two paths.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Frames, formats, the recorder lifecycle, and errors
//! - **Application**: The recorder, the capture session, device arbitration, and port traits
//! - **Infrastructure**: Adapter implementations (cpal, FLAC, sine generator, XDG config)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

pub use application::{
    AmplitudeEvent, AmplitudeStream, AudioKit, AudioKitError, AudioKitSettings, DevicePolicy,
};
pub use domain::{CaptureFormat, RecordingStatus, SampleFrame};
