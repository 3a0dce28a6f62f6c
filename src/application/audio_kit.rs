//! Facade over the recording and streaming paths

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::config::AppConfig;
use crate::domain::recording::RecordingStatus;
use crate::domain::stream::CaptureFormat;

use super::capture_session::{AmplitudeStream, AudioCaptureSession};
use super::device::{DeviceArbiter, DevicePolicy};
use super::error::AudioKitError;
use super::file_recorder::{ErrorCallback, FileRecorder};
use super::ports::{AudioInput, SinkFactory};

/// Tunables shared by both paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioKitSettings {
    pub format: CaptureFormat,
    /// Frames buffered toward the amplitude subscriber
    pub queue_depth: usize,
    pub policy: DevicePolicy,
}

impl Default for AudioKitSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::defaults())
    }
}

impl AudioKitSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let policy = if config.exclusive_device_or_default() {
            DevicePolicy::Exclusive
        } else {
            DevicePolicy::Shared
        };
        Self {
            format: config.capture_format(),
            queue_depth: config.queue_depth_or_default(),
            policy,
        }
    }
}

/// Microphone recording and amplitude streaming behind one call surface.
///
/// Every method takes `&self`; share it between threads with `Arc`.
pub struct AudioKit {
    recorder: Mutex<FileRecorder>,
    session: Mutex<AudioCaptureSession>,
    arbiter: DeviceArbiter,
}

impl AudioKit {
    pub fn new(
        input: Arc<dyn AudioInput>,
        sinks: Arc<dyn SinkFactory>,
        settings: AudioKitSettings,
    ) -> Self {
        let arbiter = DeviceArbiter::new(settings.policy);
        let recorder = FileRecorder::new(
            Arc::clone(&input),
            sinks,
            arbiter.clone(),
            settings.format,
        );
        let session =
            AudioCaptureSession::new(input, arbiter.clone(), settings.format, settings.queue_depth);

        Self {
            recorder: Mutex::new(recorder),
            session: Mutex::new(session),
            arbiter,
        }
    }

    /// Bind the recorder to `path`; always `true` on success
    pub fn configure(&self, path: impl Into<PathBuf>) -> Result<bool, AudioKitError> {
        self.recorder.lock().configure(path)?;
        Ok(true)
    }

    /// Toggle recording: begin, pause or resume depending on state
    pub fn start(&self) -> Result<RecordingStatus, AudioKitError> {
        let mut recorder = self.recorder.lock();
        let status = recorder.start()?;
        Ok(self.with_streaming(status))
    }

    pub fn pause(&self) -> Option<RecordingStatus> {
        let status = self.recorder.lock().pause();
        status.map(|s| self.with_streaming(s))
    }

    pub fn resume(&self) -> Option<RecordingStatus> {
        let status = self.recorder.lock().resume();
        status.map(|s| self.with_streaming(s))
    }

    pub fn stop(&self) -> Option<RecordingStatus> {
        let status = self.recorder.lock().stop();
        status.map(|s| self.with_streaming(s))
    }

    pub fn status(&self) -> Option<RecordingStatus> {
        let status = self.recorder.lock().status();
        status.map(|s| self.with_streaming(s))
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.lock().is_recording()
    }

    /// Start streaming; replaces any current subscription
    pub fn subscribe_to_amplitudes(&self) -> Result<AmplitudeStream, AudioKitError> {
        self.session.lock().subscribe()
    }

    pub fn unsubscribe(&self) {
        self.session.lock().unsubscribe();
    }

    pub fn is_streaming(&self) -> bool {
        self.session.lock().is_streaming()
    }

    pub fn on_recording_error(&self, callback: ErrorCallback) {
        self.recorder.lock().on_error(callback);
    }

    pub fn device_policy(&self) -> DevicePolicy {
        self.arbiter.policy()
    }

    fn with_streaming(&self, status: RecordingStatus) -> RecordingStatus {
        status.with_streaming(self.session.lock().is_streaming())
    }
}
