//! Recording sink port interfaces

use std::path::Path;

use thiserror::Error;

use crate::domain::stream::{CaptureFormat, SampleFrame};

/// Encoder pipeline errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{0}")]
    Init(String),

    #[error("{0}")]
    Write(String),
}

/// Summary of a finalized recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSummary {
    /// Samples written to the output
    pub samples: u64,
    /// Size of the output file in bytes
    pub bytes: u64,
}

/// Port for creating recording sinks bound to an output path
pub trait SinkFactory: Send + Sync {
    /// Check that a sink could be created for `path` without touching the
    /// file system.
    fn prepare(&self, path: &Path, format: &CaptureFormat) -> Result<(), EncodeError>;

    /// Create the sink; output may be created lazily or immediately.
    fn create(
        &self,
        path: &Path,
        format: &CaptureFormat,
    ) -> Result<Box<dyn RecordingSink>, EncodeError>;
}

/// Streaming audio encoder
///
/// Frames arrive in capture order, one call per frame. `finalize` flushes
/// everything to disk; the output is durable once it returns `Ok`.
pub trait RecordingSink: Send {
    fn write_frame(&mut self, frame: &SampleFrame) -> Result<(), EncodeError>;

    fn finalize(self: Box<Self>) -> Result<SinkSummary, EncodeError>;
}
