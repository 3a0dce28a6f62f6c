//! FLAC recording sink
//!
//! Frames are encoded block by block into `<path>.part` while recording.
//! Finalize patches the stream header, syncs, and renames the file into
//! place. A failed finalize leaves the partial file behind so the audio
//! is not lost.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::flac_encoder::{verify_encoder_config, FlacWriter};
use crate::application::ports::{EncodeError, RecordingSink, SinkFactory, SinkSummary};
use crate::domain::stream::{to_i16, CaptureFormat, SampleFrame};

/// File written while recording to `path`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Creates FLAC sinks
#[derive(Debug, Default, Clone, Copy)]
pub struct FlacSinkFactory;

impl FlacSinkFactory {
    pub fn new() -> Self {
        Self
    }
}

impl SinkFactory for FlacSinkFactory {
    fn prepare(&self, _path: &Path, format: &CaptureFormat) -> Result<(), EncodeError> {
        if format.sample_rate == 0 {
            return Err(EncodeError::Init("sample rate must be positive".into()));
        }
        verify_encoder_config().map_err(|e| EncodeError::Init(e.to_string()))
    }

    fn create(
        &self,
        path: &Path,
        format: &CaptureFormat,
    ) -> Result<Box<dyn RecordingSink>, EncodeError> {
        Ok(Box::new(FlacSink::create(path, format)?))
    }
}

/// Streaming FLAC writer for one recording
pub struct FlacSink {
    writer: FlacWriter<BufWriter<File>>,
    path: PathBuf,
    partial: PathBuf,
}

impl FlacSink {
    pub fn create(path: &Path, format: &CaptureFormat) -> Result<Self, EncodeError> {
        let partial = partial_path(path);
        let file = File::create(&partial).map_err(|e| {
            EncodeError::Init(format!("Failed to create {}: {}", partial.display(), e))
        })?;
        let writer = FlacWriter::new(BufWriter::new(file), format.sample_rate)
            .map_err(|e| EncodeError::Init(e.to_string()))?;
        debug!("Encoding to {}", partial.display());

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            partial,
        })
    }
}

impl RecordingSink for FlacSink {
    fn write_frame(&mut self, frame: &SampleFrame) -> Result<(), EncodeError> {
        self.writer
            .write_samples(frame.samples().iter().map(|&s| to_i16(s)))
            .map_err(|e| EncodeError::Write(e.to_string()))
    }

    fn finalize(self: Box<Self>) -> Result<SinkSummary, EncodeError> {
        let FlacSink {
            writer,
            path,
            partial,
        } = *self;
        let write_failed =
            |e: std::io::Error| EncodeError::Write(format!("{}: {}", partial.display(), e));

        let (out, totals) = writer
            .finish()
            .map_err(|e| EncodeError::Write(e.to_string()))?;
        let file = out.into_inner().map_err(|e| write_failed(e.into_error()))?;
        file.sync_all().map_err(write_failed)?;
        drop(file);
        fs::rename(&partial, &path).map_err(write_failed)?;
        debug!("Wrote {} ({} bytes)", path.display(), totals.bytes);

        Ok(SinkSummary {
            samples: totals.samples,
            bytes: totals.bytes,
        })
    }
}
