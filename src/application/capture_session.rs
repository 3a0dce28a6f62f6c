//! Amplitude streaming use case

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::domain::stream::{CaptureFormat, SampleFrame};

use super::device::{DeviceArbiter, DeviceLease, DeviceUser};
use super::error::AudioKitError;
use super::ports::{AudioInput, InputStream};

/// One item delivered to an amplitude subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum AmplitudeEvent {
    Frame(SampleFrame),
    /// Terminal; the stream yields `None` afterwards
    Error(AudioKitError),
}

type FaultSlot = Arc<Mutex<Option<AudioKitError>>>;

/// Receiving end of an amplitude subscription.
///
/// Frames arrive in capture order. When the subscriber falls behind by
/// more than the queue depth, newer frames are dropped and counted; the
/// sequence numbers on delivered frames show the gap.
pub struct AmplitudeStream {
    frames: mpsc::Receiver<SampleFrame>,
    fault: FaultSlot,
    dropped: Arc<AtomicU64>,
    finished: bool,
}

impl AmplitudeStream {
    /// Next event, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<AmplitudeEvent> {
        if self.finished {
            return None;
        }
        match self.frames.recv().await {
            Some(frame) => Some(AmplitudeEvent::Frame(frame)),
            None => self.finish(),
        }
    }

    /// Blocking variant of [`recv`](Self::recv) for non-async callers.
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn blocking_recv(&mut self) -> Option<AmplitudeEvent> {
        if self.finished {
            return None;
        }
        match self.frames.blocking_recv() {
            Some(frame) => Some(AmplitudeEvent::Frame(frame)),
            None => self.finish(),
        }
    }

    /// Frames discarded because this subscriber was too slow
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn finish(&mut self) -> Option<AmplitudeEvent> {
        self.finished = true;
        self.fault.lock().take().map(AmplitudeEvent::Error)
    }
}

struct ActiveCapture {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Live microphone capture delivering normalized frames to one subscriber
pub struct AudioCaptureSession {
    input: Arc<dyn AudioInput>,
    arbiter: DeviceArbiter,
    format: CaptureFormat,
    queue_depth: usize,
    active: Option<ActiveCapture>,
}

impl AudioCaptureSession {
    pub fn new(
        input: Arc<dyn AudioInput>,
        arbiter: DeviceArbiter,
        format: CaptureFormat,
        queue_depth: usize,
    ) -> Self {
        Self {
            input,
            arbiter,
            format,
            queue_depth: queue_depth.max(1),
            active: None,
        }
    }

    /// Start capturing and return the frame stream.
    ///
    /// A subscription that is already running is stopped first; its stream
    /// simply ends. The device is open when this returns `Ok`.
    pub fn subscribe(&mut self) -> Result<AmplitudeStream, AudioKitError> {
        self.unsubscribe();

        let lease = self.arbiter.acquire(DeviceUser::AmplitudeStream)?;

        let (tx, rx) = mpsc::channel(self.queue_depth);
        let fault: FaultSlot = Arc::new(Mutex::new(None));
        let dropped = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let capture = CaptureLoop {
            tx,
            fault: Arc::clone(&fault),
            dropped: Arc::clone(&dropped),
            stop: Arc::clone(&stop),
        };
        let input = Arc::clone(&self.input);
        let format = self.format;

        let thread = thread::Builder::new()
            .name("audio-kit-capture".to_string())
            .spawn(move || capture.run(input, format, lease, ready_tx))
            .map_err(|e| {
                AudioKitError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AudioKitError::DeviceUnavailable(
                    "capture thread exited while opening the device".to_string(),
                ));
            }
        }

        info!(
            "Amplitude stream started ({} Hz, {} samples per frame, input: {})",
            self.format.sample_rate,
            self.format.frame_len,
            self.input.name()
        );
        self.active = Some(ActiveCapture { stop, thread });

        Ok(AmplitudeStream {
            frames: rx,
            fault,
            dropped,
            finished: false,
        })
    }

    /// Stop capturing. The device is released when this returns.
    pub fn unsubscribe(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop.store(true, Ordering::SeqCst);
            if active.thread.join().is_err() {
                error!("Capture thread panicked");
            }
            info!("Amplitude stream stopped");
        }
    }

    /// Whether the capture loop is still delivering frames
    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.thread.is_finished())
    }
}

impl Drop for AudioCaptureSession {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

struct CaptureLoop {
    tx: mpsc::Sender<SampleFrame>,
    fault: FaultSlot,
    dropped: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
}

impl CaptureLoop {
    fn run(
        self,
        input: Arc<dyn AudioInput>,
        format: CaptureFormat,
        lease: DeviceLease,
        ready: std_mpsc::Sender<Result<(), AudioKitError>>,
    ) {
        let stream = match input.open(&format) {
            Ok(stream) => {
                let _ = ready.send(Ok(()));
                stream
            }
            Err(e) => {
                warn!("Failed to open input for amplitude stream: {}", e);
                let _ = ready.send(Err(AudioKitError::DeviceUnavailable(e.to_string())));
                return;
            }
        };

        self.pump(stream, lease);
    }

    /// Consumes the sender, so the subscriber sees end of stream only after
    /// the input is closed and the lease is released.
    fn pump(self, mut stream: Box<dyn InputStream>, lease: DeviceLease) {
        let mut sequence = 0u64;

        while !self.stop.load(Ordering::SeqCst) {
            let frame = match stream.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Amplitude stream interrupted: {}", e);
                    *self.fault.lock() = Some(e.into());
                    break;
                }
            };

            match self.tx.try_send(frame.with_sequence(sequence)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped == 1 || dropped % 100 == 0 {
                        warn!("Subscriber is falling behind, {} frame(s) dropped", dropped);
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Amplitude subscriber went away");
                    break;
                }
            }
            sequence += 1;
        }

        drop(stream);
        drop(lease);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::ScriptedInput;
    use std::time::Duration;

    fn session_with(input: Arc<ScriptedInput>, arbiter: DeviceArbiter) -> AudioCaptureSession {
        AudioCaptureSession::new(input, arbiter, CaptureFormat::new(44100, 64), 64)
    }

    #[tokio::test]
    async fn delivers_normalized_frames_in_order() {
        let input = Arc::new(ScriptedInput::new(16384));
        let mut session = session_with(Arc::clone(&input), DeviceArbiter::default());

        let mut stream = session.subscribe().unwrap();
        assert!(session.is_streaming());

        for expected in 0..5u64 {
            match stream.recv().await {
                Some(AmplitudeEvent::Frame(frame)) => {
                    assert_eq!(frame.sequence(), expected);
                    assert_eq!(frame.len(), 64);
                    let value = frame.samples()[0];
                    assert!((value - 16384.0 / 32767.0).abs() < 1e-6);
                }
                other => panic!("expected frame, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn interruption_ends_stream_with_error() {
        let input = Arc::new(ScriptedInput::interrupting_after(3));
        let arbiter = DeviceArbiter::default();
        let mut session = session_with(Arc::clone(&input), arbiter.clone());

        let mut stream = session.subscribe().unwrap();
        let mut frames = 0;
        let mut terminal = None;
        while let Some(event) = stream.recv().await {
            match event {
                AmplitudeEvent::Frame(_) => frames += 1,
                AmplitudeEvent::Error(e) => terminal = Some(e),
            }
        }

        assert_eq!(frames, 3);
        assert!(matches!(
            terminal,
            Some(AudioKitError::DeviceInterrupted(_))
        ));
        assert!(stream.recv().await.is_none());

        session.unsubscribe();
        assert!(!session.is_streaming());
        assert!(arbiter.holders().is_empty());
        assert_eq!(input.live_streams(), 0);
    }

    #[test]
    fn device_is_free_once_interrupted_stream_ends() {
        let arbiter = DeviceArbiter::default();
        let input = Arc::new(ScriptedInput::interrupting_after(0));
        let mut session = session_with(Arc::clone(&input), arbiter.clone());

        for _ in 0..50 {
            let mut stream = session.subscribe().unwrap();
            while stream.blocking_recv().is_some() {}

            // No unsubscribe: the end of stream alone must free the device
            assert!(arbiter.holders().is_empty());
            assert_eq!(input.live_streams(), 0);
            let lease = arbiter.acquire(DeviceUser::FileRecorder).unwrap();
            drop(lease);
        }
    }

    #[test]
    fn open_failure_is_reported_synchronously() {
        let input = Arc::new(ScriptedInput::failing());
        let arbiter = DeviceArbiter::default();
        let mut session = session_with(input, arbiter.clone());

        let err = session.subscribe().err().unwrap();
        assert!(matches!(err, AudioKitError::DeviceUnavailable(_)));
        assert!(!session.is_streaming());
        assert!(arbiter.holders().is_empty());
    }

    #[tokio::test]
    async fn resubscribe_replaces_previous_stream() {
        let input = Arc::new(ScriptedInput::new(100));
        let mut session = session_with(Arc::clone(&input), DeviceArbiter::default());

        let mut first = session.subscribe().unwrap();
        let mut second = session.subscribe().unwrap();

        // The first stream drains whatever was queued, then ends without error
        while let Some(event) = first.recv().await {
            assert!(matches!(event, AmplitudeEvent::Frame(_)));
        }
        assert!(matches!(
            second.recv().await,
            Some(AmplitudeEvent::Frame(_))
        ));
        assert_eq!(input.open_count(), 2);
        assert_eq!(input.live_streams(), 1);
    }

    #[test]
    fn unsubscribe_releases_device_and_is_idempotent() {
        let input = Arc::new(ScriptedInput::new(0));
        let arbiter = DeviceArbiter::default();
        let mut session = session_with(Arc::clone(&input), arbiter.clone());

        let _stream = session.subscribe().unwrap();
        assert_eq!(arbiter.holders(), vec![DeviceUser::AmplitudeStream]);

        session.unsubscribe();
        session.unsubscribe();
        assert!(arbiter.holders().is_empty());
        assert_eq!(input.live_streams(), 0);
    }

    #[test]
    fn busy_device_is_rejected() {
        let arbiter = DeviceArbiter::default();
        let _recorder = arbiter.acquire(DeviceUser::FileRecorder).unwrap();
        let input = Arc::new(ScriptedInput::new(0));
        let mut session = session_with(Arc::clone(&input), arbiter);

        let err = session.subscribe().err().unwrap();
        assert_eq!(
            err,
            AudioKitError::DeviceBusy {
                held_by: DeviceUser::FileRecorder
            }
        );
        assert_eq!(input.open_count(), 0);
    }

    #[test]
    fn slow_subscriber_drops_frames() {
        let input = Arc::new(ScriptedInput::new(0));
        let mut session =
            AudioCaptureSession::new(input, DeviceArbiter::default(), CaptureFormat::new(44100, 8), 1);

        let mut stream = session.subscribe().unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert!(stream.dropped_frames() > 0);

        match stream.blocking_recv() {
            Some(AmplitudeEvent::Frame(frame)) => assert_eq!(frame.sequence(), 0),
            other => panic!("expected frame, got {:?}", other),
        }
        session.unsubscribe();
    }

    #[test]
    fn dropping_session_stops_capture() {
        let input = Arc::new(ScriptedInput::new(0));
        let session = session_with(Arc::clone(&input), DeviceArbiter::default());
        let mut session = session;
        let _stream = session.subscribe().unwrap();
        drop(session);
        assert_eq!(input.live_streams(), 0);
    }
}
