//! Audio input port interfaces

use thiserror::Error;

use crate::domain::stream::{CaptureFormat, SampleFrame};

/// Input driver errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Interrupted(String),
}

/// Port for an audio input back end (hardware driver or generator).
///
/// Implementations are selected once at startup and shared by the
/// streaming and recording paths.
pub trait AudioInput: Send + Sync {
    /// Short driver name for logs
    fn name(&self) -> &str;

    /// Open the input and start delivering audio.
    ///
    /// The returned stream should be read from the thread that opened it.
    /// Dropping the stream releases the device before `drop` returns.
    fn open(&self, format: &CaptureFormat) -> Result<Box<dyn InputStream>, CaptureError>;
}

/// An open input stream
pub trait InputStream: Send {
    /// Block until one frame of `format.frame_len` normalized samples is
    /// available and return it.
    ///
    /// # Errors
    /// `CaptureError::Interrupted` once the device stops delivering audio;
    /// the stream is unusable afterwards.
    fn read_frame(&mut self) -> Result<SampleFrame, CaptureError>;
}
