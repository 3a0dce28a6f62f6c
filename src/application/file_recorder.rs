//! Compressed file recording use case

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::recording::{RecorderLifecycle, RecorderState, RecordingClock, RecordingStatus};
use crate::domain::stream::CaptureFormat;

use super::device::{DeviceArbiter, DeviceLease, DeviceUser};
use super::error::AudioKitError;
use super::ports::{AudioInput, InputStream, RecordingSink, SinkFactory, SinkSummary};

/// Invoked once per recorder fault, from the recorder's worker thread
pub type ErrorCallback = Arc<dyn Fn(&AudioKitError) + Send + Sync>;

type CallbackSlot = Arc<Mutex<Option<ErrorCallback>>>;

/// Check that `path` can name an output file.
pub fn validate_output_path(path: &Path) -> Result<(), AudioKitError> {
    if path.as_os_str().is_empty() {
        return Err(AudioKitError::InvalidPath("path is empty".to_string()));
    }
    if path.is_dir() {
        return Err(AudioKitError::InvalidPath(format!(
            "{} is a directory",
            path.display()
        )));
    }
    if path.file_name().is_none() {
        return Err(AudioKitError::InvalidPath(format!(
            "{} does not name a file",
            path.display()
        )));
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(AudioKitError::InvalidPath(format!(
                "directory {} does not exist",
                parent.display()
            )))
        }
        _ => Ok(()),
    }
}

#[derive(Default)]
struct WorkerControl {
    stop: AtomicBool,
    paused: AtomicBool,
    fault: Mutex<Option<AudioKitError>>,
    /// When the worker stopped taking audio
    ended: Mutex<Option<Instant>>,
}

struct Worker {
    control: Arc<WorkerControl>,
    thread: JoinHandle<Option<SinkSummary>>,
}

/// Writes microphone audio to a compressed file with pause/resume.
///
/// All calls are synchronous; the audio itself is read and encoded on a
/// dedicated worker thread that owns the input stream and the sink.
pub struct FileRecorder {
    input: Arc<dyn AudioInput>,
    sinks: Arc<dyn SinkFactory>,
    arbiter: DeviceArbiter,
    format: CaptureFormat,
    lifecycle: RecorderLifecycle,
    path: Option<PathBuf>,
    clock: RecordingClock,
    worker: Option<Worker>,
    on_error: CallbackSlot,
    pending_fault: Option<AudioKitError>,
}

impl FileRecorder {
    pub fn new(
        input: Arc<dyn AudioInput>,
        sinks: Arc<dyn SinkFactory>,
        arbiter: DeviceArbiter,
        format: CaptureFormat,
    ) -> Self {
        Self {
            input,
            sinks,
            arbiter,
            format,
            lifecycle: RecorderLifecycle::new(),
            path: None,
            clock: RecordingClock::new(),
            worker: None,
            on_error: Arc::new(Mutex::new(None)),
            pending_fault: None,
        }
    }

    /// Set the output path.
    ///
    /// A recording in progress is finalized first. The duration is reset.
    pub fn configure(&mut self, path: impl Into<PathBuf>) -> Result<(), AudioKitError> {
        let path = path.into();
        validate_output_path(&path)?;
        self.sinks.prepare(&path, &self.format)?;

        self.reap();
        if self.lifecycle.state().is_active() {
            info!("Reconfigured while recording, finalizing current file");
            self.finish();
        }
        if let Err(e) = self.lifecycle.configure() {
            debug!("{}", e);
        }

        info!("Recorder configured: {}", path.display());
        self.path = Some(path);
        self.clock = RecordingClock::new();
        Ok(())
    }

    /// Toggle: begin from Idle, pause while Recording, resume while Paused
    pub fn start(&mut self) -> Result<RecordingStatus, AudioKitError> {
        self.reap();
        match self.lifecycle.state() {
            RecorderState::Unconfigured => return Err(AudioKitError::NotConfigured),
            RecorderState::Idle => self.begin()?,
            RecorderState::Recording => self.suspend(),
            RecorderState::Paused => self.unsuspend(),
        }
        self.status().ok_or(AudioKitError::NotConfigured)
    }

    /// No-op unless Recording
    pub fn pause(&mut self) -> Option<RecordingStatus> {
        self.reap();
        if self.lifecycle.is_recording() {
            self.suspend();
        }
        self.status()
    }

    /// No-op unless Paused
    pub fn resume(&mut self) -> Option<RecordingStatus> {
        self.reap();
        if self.lifecycle.is_paused() {
            self.unsuspend();
        }
        self.status()
    }

    /// Finalize the file and release the device. No-op unless active.
    pub fn stop(&mut self) -> Option<RecordingStatus> {
        self.reap();
        if self.lifecycle.state().is_active() {
            self.finish();
        }
        self.status()
    }

    /// Snapshot; `None` before the first successful `configure`.
    ///
    /// A pending fault is included once and then cleared.
    pub fn status(&mut self) -> Option<RecordingStatus> {
        self.reap();
        let path = self.path.as_ref()?;
        let status = RecordingStatus::new(path, self.lifecycle.state(), self.clock.elapsed())
            .with_error(self.pending_fault.take().map(|e| e.report()));
        Some(status)
    }

    pub fn is_recording(&mut self) -> bool {
        self.reap();
        self.lifecycle.is_recording()
    }

    pub fn state(&mut self) -> RecorderState {
        self.reap();
        self.lifecycle.state()
    }

    /// Register the fault callback, replacing any previous one
    pub fn on_error(&self, callback: ErrorCallback) {
        *self.on_error.lock() = Some(callback);
    }

    fn begin(&mut self) -> Result<(), AudioKitError> {
        let path = self.path.clone().ok_or(AudioKitError::NotConfigured)?;
        let lease = self.arbiter.acquire(DeviceUser::FileRecorder)?;

        let control = Arc::new(WorkerControl::default());
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let job = RecordJob {
            input: Arc::clone(&self.input),
            sinks: Arc::clone(&self.sinks),
            path: path.clone(),
            format: self.format,
            control: Arc::clone(&control),
            on_error: Arc::clone(&self.on_error),
        };

        let thread = thread::Builder::new()
            .name("audio-kit-recorder".to_string())
            .spawn(move || job.run(lease, ready_tx))
            .map_err(|e| {
                AudioKitError::DeviceUnavailable(format!("failed to spawn recorder thread: {}", e))
            })?;

        let opened = match ready_rx.recv() {
            Ok(result) => result,
            Err(_) => Err(AudioKitError::DeviceUnavailable(
                "recorder thread exited while opening the device".to_string(),
            )),
        };
        if let Err(e) = opened {
            let _ = thread.join();
            return Err(e);
        }

        if let Err(e) = self.lifecycle.start() {
            debug!("{}", e);
        }
        self.clock.restart();
        self.pending_fault = None;
        self.worker = Some(Worker { control, thread });
        info!("Recording started: {}", path.display());
        Ok(())
    }

    fn suspend(&mut self) {
        if let Some(worker) = &self.worker {
            worker.control.paused.store(true, Ordering::SeqCst);
        }
        if let Err(e) = self.lifecycle.pause() {
            debug!("{}", e);
        }
        self.clock.halt();
        info!("Recording paused at {:?}", self.clock.elapsed());
    }

    fn unsuspend(&mut self) {
        if let Some(worker) = &self.worker {
            worker.control.paused.store(false, Ordering::SeqCst);
        }
        if let Err(e) = self.lifecycle.resume() {
            debug!("{}", e);
        }
        self.clock.resume();
        info!("Recording resumed");
    }

    /// Stop the worker, wait for the file to be finalized, go Idle
    fn finish(&mut self) {
        if let Some(worker) = &self.worker {
            worker.control.stop.store(true, Ordering::SeqCst);
        }
        // Finalizing is not recording time
        self.clock.halt();
        self.join_worker();
    }

    /// Pick up a worker that ended on its own after a fault
    fn reap(&mut self) {
        let finished = self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.thread.is_finished());
        if finished {
            debug!("Recorder worker ended on its own");
            self.join_worker();
        }
    }

    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        match worker.thread.join() {
            Ok(Some(summary)) => info!(
                "Recording finalized: {} samples, {} bytes",
                summary.samples, summary.bytes
            ),
            Ok(None) => {}
            Err(_) => error!("Recorder thread panicked"),
        }
        if let Some(fault) = worker.control.fault.lock().take() {
            self.pending_fault = Some(fault);
        }

        // A worker that died on its own stopped the clock when it ended,
        // not when we noticed
        match worker.control.ended.lock().take() {
            Some(at) => self.clock.halt_at(at),
            None => self.clock.halt(),
        }
        if let Err(e) = self.lifecycle.stop() {
            debug!("{}", e);
        }
    }
}

impl Drop for FileRecorder {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.finish();
        }
    }
}

struct RecordJob {
    input: Arc<dyn AudioInput>,
    sinks: Arc<dyn SinkFactory>,
    path: PathBuf,
    format: CaptureFormat,
    control: Arc<WorkerControl>,
    on_error: CallbackSlot,
}

impl RecordJob {
    fn run(
        self,
        lease: DeviceLease,
        ready: std_mpsc::Sender<Result<(), AudioKitError>>,
    ) -> Option<SinkSummary> {
        let stream = match self.input.open(&self.format) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open input for recording: {}", e);
                let _ = ready.send(Err(AudioKitError::DeviceUnavailable(e.to_string())));
                return None;
            }
        };
        let sink = match self.sinks.create(&self.path, &self.format) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("Failed to create encoder for {}: {}", self.path.display(), e);
                let _ = ready.send(Err(AudioKitError::EncoderInitFailed(e.to_string())));
                return None;
            }
        };
        let _ = ready.send(Ok(()));

        let (sink, fault) = self.pump(stream, sink);
        // Device first, then the potentially slow finalize
        drop(lease);

        let finalized = sink.finalize().map_err(AudioKitError::from);
        match (fault, finalized) {
            (None, Ok(summary)) => Some(summary),
            (Some(fault), finalized) => {
                if let Err(e) = finalized {
                    warn!("Finalizing after fault also failed: {}", e);
                }
                self.report(fault);
                None
            }
            (None, Err(e)) => {
                self.report(e);
                None
            }
        }
    }

    fn pump(
        &self,
        mut stream: Box<dyn InputStream>,
        mut sink: Box<dyn RecordingSink>,
    ) -> (Box<dyn RecordingSink>, Option<AudioKitError>) {
        let mut fault = None;

        while !self.control.stop.load(Ordering::SeqCst) {
            let frame = match stream.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    fault = Some(e.into());
                    break;
                }
            };
            if self.control.paused.load(Ordering::SeqCst) {
                continue;
            }
            if let Err(e) = sink.write_frame(&frame) {
                fault = Some(e.into());
                break;
            }
        }

        *self.control.ended.lock() = Some(Instant::now());
        drop(stream);
        (sink, fault)
    }

    fn report(&self, fault: AudioKitError) {
        error!("Recording to {} failed: {}", self.path.display(), fault);
        let callback = self.on_error.lock().clone();
        if let Some(callback) = callback {
            callback(&fault);
        }
        *self.control.fault.lock() = Some(fault);
    }
}
