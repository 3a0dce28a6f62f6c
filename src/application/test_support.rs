//! Hand-written port doubles shared by the application tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::ports::{
    AudioInput, CaptureError, EncodeError, InputStream, RecordingSink, SinkFactory, SinkSummary,
};
use crate::domain::stream::{CaptureFormat, SampleFrame};

/// Input that produces constant frames of `level` (raw 16-bit)
pub struct ScriptedInput {
    pub level: i16,
    pub fail_open: bool,
    pub interrupt_after: Option<usize>,
    pub frame_delay: Duration,
    pub opened: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn new(level: i16) -> Self {
        Self {
            level,
            fail_open: false,
            interrupt_after: None,
            frame_delay: Duration::from_millis(2),
            opened: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new(0)
        }
    }

    pub fn interrupting_after(frames: usize) -> Self {
        Self {
            interrupt_after: Some(frames),
            ..Self::new(1000)
        }
    }

    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl AudioInput for ScriptedInput {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&self, format: &CaptureFormat) -> Result<Box<dyn InputStream>, CaptureError> {
        if self.fail_open {
            return Err(CaptureError::Unavailable("no scripted device".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            level: self.level,
            frame_len: format.frame_len,
            remaining: self.interrupt_after,
            delay: self.frame_delay,
            live: Arc::clone(&self.live),
        }))
    }
}

struct ScriptedStream {
    level: i16,
    frame_len: usize,
    remaining: Option<usize>,
    delay: Duration,
    live: Arc<AtomicUsize>,
}

impl InputStream for ScriptedStream {
    fn read_frame(&mut self) -> Result<SampleFrame, CaptureError> {
        std::thread::sleep(self.delay);
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CaptureError::Interrupted("reclaimed by system".to_string()));
            }
            *remaining -= 1;
        }
        Ok(SampleFrame::from_i16(&vec![self.level; self.frame_len]))
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What a `MemorySink` recorded, shared with the test
#[derive(Debug, Default)]
pub struct SinkLog {
    pub created: Vec<PathBuf>,
    pub frames: usize,
    pub samples: Vec<f32>,
    pub finalized: usize,
}

/// Sink factory that keeps everything in memory
#[derive(Default)]
pub struct MemorySinkFactory {
    pub log: Arc<Mutex<SinkLog>>,
    pub fail_prepare: bool,
    pub fail_create: bool,
    pub fail_after_frames: Option<usize>,
}

impl MemorySinkFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn prepare(&self, _path: &Path, _format: &CaptureFormat) -> Result<(), EncodeError> {
        if self.fail_prepare {
            return Err(EncodeError::Init("unsupported block size".to_string()));
        }
        Ok(())
    }

    fn create(
        &self,
        path: &Path,
        _format: &CaptureFormat,
    ) -> Result<Box<dyn RecordingSink>, EncodeError> {
        if self.fail_create {
            return Err(EncodeError::Init("cannot create output".to_string()));
        }
        self.log.lock().created.push(path.to_path_buf());
        Ok(Box::new(MemorySink {
            log: Arc::clone(&self.log),
            remaining: self.fail_after_frames,
        }))
    }
}

struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
    remaining: Option<usize>,
}

impl RecordingSink for MemorySink {
    fn write_frame(&mut self, frame: &SampleFrame) -> Result<(), EncodeError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(EncodeError::Write("No space left on device".to_string()));
            }
            *remaining -= 1;
        }
        let mut log = self.log.lock();
        log.frames += 1;
        log.samples.extend_from_slice(frame.samples());
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<SinkSummary, EncodeError> {
        let mut log = self.log.lock();
        log.finalized += 1;
        Ok(SinkSummary {
            samples: log.samples.len() as u64,
            bytes: (log.samples.len() * 2) as u64,
        })
    }
}
