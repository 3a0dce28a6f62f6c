//! Streaming value objects

pub mod format;
pub mod frame;

pub use format::CaptureFormat;
pub use frame::{normalize_f32, normalize_i16, to_i16, SampleFrame, MAX_AMPLITUDE_I16};
