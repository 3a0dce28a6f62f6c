//! Hardware microphone input using cpal
//!
//! Captures mono PCM at the requested rate:
//! - i16 or f32 device formats, normalized to [-1.0, 1.0]
//! - multi-channel devices are mixed down to mono
//! - devices that cannot run at the requested rate are resampled with rubato

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use rubato::{FftFixedIn, Resampler};
use tracing::{debug, info, warn};

use crate::application::ports::{AudioInput, CaptureError, InputStream};
use crate::domain::stream::{normalize_f32, normalize_i16, CaptureFormat, SampleFrame};

/// Seconds of device audio the ring buffer can hold
const RING_SECONDS: usize = 2;

/// Input chunk size fed to the resampler
const RESAMPLE_CHUNK: usize = 1024;

/// How often a waiting reader rechecks for faults
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Which host and device to open
#[derive(Debug, Clone)]
pub struct CpalInputOptions {
    /// Host name as reported by cpal (`alsa`, `jack`, `coreaudio`, `wasapi`)
    pub host: Option<String>,
    /// Input device name; the host default when unset
    pub device: Option<String>,
    /// A stream that delivers nothing for this long is reported as interrupted
    pub stall_timeout: Duration,
}

impl Default for CpalInputOptions {
    fn default() -> Self {
        Self {
            host: None,
            device: None,
            stall_timeout: Duration::from_secs(2),
        }
    }
}

/// An input device as listed by `devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// Audio input backed by the platform audio host
///
/// cpal::Stream is not Send, so every open stream lives on its own owner
/// thread and is dropped there.
pub struct CpalInput {
    options: CpalInputOptions,
}

impl CpalInput {
    pub fn new(options: CpalInputOptions) -> Self {
        Self { options }
    }
}

impl Default for CpalInput {
    fn default() -> Self {
        Self::new(CpalInputOptions::default())
    }
}

/// Names of the audio hosts compiled into this build
pub fn available_hosts() -> Vec<&'static str> {
    cpal::available_hosts()
        .into_iter()
        .map(|id| id.name())
        .collect()
}

/// List input devices of the selected host
pub fn list_input_devices(host: Option<&str>) -> Result<Vec<InputDeviceInfo>, CaptureError> {
    let host = select_host(host)?;
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::Unavailable(format!("Failed to enumerate devices: {}", e)))?;

    let mut listed: Vec<InputDeviceInfo> = devices
        .filter_map(|d| d.name().ok())
        .map(|name| InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();
    listed.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
    Ok(listed)
}

fn select_host(name: Option<&str>) -> Result<cpal::Host, CaptureError> {
    let Some(name) = name else {
        return Ok(cpal::default_host());
    };

    let id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            CaptureError::Unavailable(format!(
                "Audio host '{}' is not available (available: {})",
                name,
                available_hosts().join(", ")
            ))
        })?;

    cpal::host_from_id(id).map_err(|e| CaptureError::Unavailable(e.to_string()))
}

fn select_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::Unavailable(format!("No input device named '{}'", name))),
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::Unavailable("No input audio device available".into())),
    }
}

/// Pick a stream configuration for `target_rate`.
///
/// Prefers configs that include the target rate, then fewer channels.
fn select_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<(StreamConfig, SampleFormat), CaptureError> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| CaptureError::Unavailable(format!("Failed to get configs: {}", e)))?;

    let includes_target = |c: &cpal::SupportedStreamConfigRange| {
        c.min_sample_rate().0 <= target_rate && c.max_sample_rate().0 >= target_rate
    };

    let best = supported
        .filter(|c| matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .min_by_key(|c| (!includes_target(c), c.channels()))
        .ok_or_else(|| CaptureError::Unavailable("No i16 or f32 input config found".into()))?;

    let sample_rate = if includes_target(&best) {
        SampleRate(target_rate)
    } else {
        best.max_sample_rate()
    };

    let config = StreamConfig {
        channels: best.channels(),
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };
    Ok((config, best.sample_format()))
}

/// State shared between the driver callbacks and the reader
#[derive(Clone)]
struct CallbackShared {
    reader: Thread,
    fault: Arc<Mutex<Option<String>>>,
    overflowed: Arc<AtomicU64>,
}

impl CallbackShared {
    fn push_mono(&self, producer: &mut HeapProd<f32>, mono: impl Iterator<Item = f32>) {
        let mut lost = 0u64;
        for sample in mono {
            if producer.try_push(sample).is_err() {
                lost += 1;
            }
        }
        if lost > 0 {
            self.overflowed.fetch_add(lost, Ordering::Relaxed);
        }
        self.reader.unpark();
    }

    fn fail(&self, message: String) {
        *self.fault.lock() = Some(message);
        self.reader.unpark();
    }
}

/// Average interleaved channels into normalized mono samples
fn mix_down<T: Copy>(
    data: &[T],
    channels: usize,
    normalize: fn(T) -> f32,
) -> impl Iterator<Item = f32> + '_ {
    data.chunks(channels.max(1)).map(move |frame| {
        let sum: f32 = frame.iter().map(|&s| normalize(s)).sum();
        sum / frame.len() as f32
    })
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    mut producer: HeapProd<f32>,
    shared: CallbackShared,
) -> Result<cpal::Stream, CaptureError> {
    let channels = config.channels as usize;
    let on_error = {
        let shared = shared.clone();
        move |err: cpal::StreamError| shared.fail(err.to_string())
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                shared.push_mono(&mut producer, mix_down(data, channels, normalize_i16));
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                shared.push_mono(&mut producer, mix_down(data, channels, normalize_f32));
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::Unavailable(format!(
                "Unsupported sample format {:?}",
                other
            )))
        }
    };

    stream.map_err(|e| CaptureError::Unavailable(format!("Failed to build input stream: {}", e)))
}

struct Opened {
    consumer: HeapCons<f32>,
    device_rate: u32,
}

/// Runs on the owner thread; the returned stream must be dropped there too
fn open_on_owner(
    options: &CpalInputOptions,
    target_rate: u32,
    shared: CallbackShared,
) -> Result<(cpal::Stream, Opened), CaptureError> {
    let host = select_host(options.host.as_deref())?;
    let device = select_device(&host, options.device.as_deref())?;
    let (config, sample_format) = select_config(&device, target_rate)?;
    let device_rate = config.sample_rate.0;

    let ring = HeapRb::<f32>::new(device_rate as usize * RING_SECONDS);
    let (producer, consumer) = ring.split();
    let stream = build_stream(&device, &config, sample_format, producer, shared)?;
    stream
        .play()
        .map_err(|e| CaptureError::Unavailable(e.to_string()))?;

    info!(
        "Input opened: {} ({} Hz, {} ch, {:?})",
        device.name().unwrap_or_else(|_| "unknown".into()),
        device_rate,
        config.channels,
        sample_format
    );
    Ok((
        stream,
        Opened {
            consumer,
            device_rate,
        },
    ))
}

impl AudioInput for CpalInput {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open(&self, format: &CaptureFormat) -> Result<Box<dyn InputStream>, CaptureError> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<Opened, CaptureError>>();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        let shared = CallbackShared {
            reader: thread::current(),
            fault: Arc::new(Mutex::new(None)),
            overflowed: Arc::new(AtomicU64::new(0)),
        };
        let options = self.options.clone();
        let target_rate = format.sample_rate;
        let owner_shared = shared.clone();

        let owner = thread::Builder::new()
            .name("audio-kit-cpal".to_string())
            .spawn(move || {
                match open_on_owner(&options, target_rate, owner_shared) {
                    Ok((stream, opened)) => {
                        let _ = ready_tx.send(Ok(opened));
                        // Blocks until the reader drops its sender
                        let _ = shutdown_rx.recv();
                        drop(stream);
                        debug!("Input stream closed");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| CaptureError::Unavailable(format!("Failed to spawn audio thread: {}", e)))?;

        let opened = match ready_rx.recv() {
            Ok(Ok(opened)) => opened,
            Ok(Err(e)) => {
                let _ = owner.join();
                return Err(e);
            }
            Err(_) => {
                let _ = owner.join();
                return Err(CaptureError::Unavailable("Audio thread exited during open".into()));
            }
        };

        let resampler = if opened.device_rate != target_rate {
            info!(
                "Resampling input from {} Hz to {} Hz",
                opened.device_rate, target_rate
            );
            Some(StreamResampler::new(opened.device_rate, target_rate)?)
        } else {
            None
        };

        Ok(Box::new(CpalStream {
            consumer: opened.consumer,
            shared,
            resampler,
            pending: Vec::with_capacity(format.frame_len * 2),
            frame_len: format.frame_len,
            stall_timeout: self.options.stall_timeout,
            reported_overflow: 0,
            shutdown: Some(shutdown_tx),
            owner: Some(owner),
        }))
    }
}

/// Streaming wrapper around rubato's fixed-input resampler
struct StreamResampler {
    inner: FftFixedIn<f32>,
    staged: Vec<f32>,
}

impl StreamResampler {
    fn new(source_rate: u32, target_rate: u32) -> Result<Self, CaptureError> {
        let inner = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            RESAMPLE_CHUNK,
            2, // Sub-chunks
            1, // Mono
        )
        .map_err(|e| CaptureError::Unavailable(format!("Resampler init failed: {}", e)))?;

        Ok(Self {
            inner,
            staged: Vec::with_capacity(RESAMPLE_CHUNK * 2),
        })
    }

    fn push(&mut self, input: &[f32], out: &mut Vec<f32>) -> Result<(), CaptureError> {
        self.staged.extend_from_slice(input);
        loop {
            let needed = self.inner.input_frames_next();
            if self.staged.len() < needed {
                return Ok(());
            }
            let chunk: Vec<f32> = self.staged.drain(..needed).collect();
            let resampled = self
                .inner
                .process(&vec![chunk], None)
                .map_err(|e| CaptureError::Interrupted(format!("Resampling failed: {}", e)))?;
            out.extend(resampled[0].iter().copied().map(normalize_f32));
        }
    }
}

struct CpalStream {
    consumer: HeapCons<f32>,
    shared: CallbackShared,
    resampler: Option<StreamResampler>,
    /// Target-rate samples not yet emitted
    pending: Vec<f32>,
    frame_len: usize,
    stall_timeout: Duration,
    reported_overflow: u64,
    shutdown: Option<std_mpsc::Sender<()>>,
    owner: Option<JoinHandle<()>>,
}

impl CpalStream {
    fn drain_ring(&mut self) -> Result<bool, CaptureError> {
        let available = self.consumer.occupied_len();
        if available == 0 {
            return Ok(false);
        }

        let mut chunk = vec![0.0f32; available];
        let n = self.consumer.pop_slice(&mut chunk);
        chunk.truncate(n);

        match self.resampler.as_mut() {
            Some(resampler) => resampler.push(&chunk, &mut self.pending)?,
            None => self.pending.extend_from_slice(&chunk),
        }
        Ok(n > 0)
    }

    fn check_overflow(&mut self) {
        let overflowed = self.shared.overflowed.load(Ordering::Relaxed);
        if overflowed > self.reported_overflow {
            warn!(
                "Input ring buffer overflowed, {} sample(s) lost",
                overflowed - self.reported_overflow
            );
            self.reported_overflow = overflowed;
        }
    }
}

impl InputStream for CpalStream {
    fn read_frame(&mut self) -> Result<SampleFrame, CaptureError> {
        let mut last_data = Instant::now();

        while self.pending.len() < self.frame_len {
            if let Some(message) = self.shared.fault.lock().take() {
                return Err(CaptureError::Interrupted(message));
            }
            if self.drain_ring()? {
                last_data = Instant::now();
                continue;
            }
            if last_data.elapsed() >= self.stall_timeout {
                return Err(CaptureError::Interrupted(format!(
                    "No audio from device for {:?}",
                    self.stall_timeout
                )));
            }
            thread::park_timeout(POLL_INTERVAL);
        }

        self.check_overflow();
        let rest = self.pending.split_off(self.frame_len);
        let samples = std::mem::replace(&mut self.pending, rest);
        Ok(SampleFrame::new(samples))
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(owner) = self.owner.take() {
            if owner.join().is_err() {
                warn!("Audio thread panicked while closing the stream");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_down_mono_passes_through() {
        let data = [0i16, 16384, -32768];
        let mixed: Vec<f32> = mix_down(&data, 1, normalize_i16).collect();
        assert_eq!(mixed.len(), 3);
        assert!((mixed[1] - 16384.0 / 32767.0).abs() < 1e-6);
        assert_eq!(mixed[2], -1.0);
    }

    #[test]
    fn mix_down_averages_channels() {
        let data = [0.5f32, 0.25, -1.0, 1.0];
        let mixed: Vec<f32> = mix_down(&data, 2, normalize_f32).collect();
        assert_eq!(mixed, vec![0.375, 0.0]);
    }

    #[test]
    fn mix_down_clamps_float_input() {
        let data = [2.0f32, f32::NAN];
        let mixed: Vec<f32> = mix_down(&data, 1, normalize_f32).collect();
        assert_eq!(mixed, vec![1.0, 0.0]);
    }

    #[test]
    fn resampler_converts_rate() {
        let mut resampler = StreamResampler::new(48000, 44100).unwrap();
        let input = vec![0.25f32; 48000];
        let mut out = Vec::new();
        resampler.push(&input, &mut out).unwrap();

        // Everything but the last partial chunk is converted
        let expected = 44100.0 * (48000 - 48000 % RESAMPLE_CHUNK) as f64 / 48000.0;
        assert!((out.len() as f64 - expected).abs() < RESAMPLE_CHUNK as f64);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn unknown_host_is_unavailable() {
        let err = select_host(Some("no-such-host")).err().unwrap();
        assert!(matches!(err, CaptureError::Unavailable(_)));
    }

    #[test]
    fn default_options() {
        let options = CpalInputOptions::default();
        assert!(options.host.is_none());
        assert!(options.device.is_none());
        assert_eq!(options.stall_timeout, Duration::from_secs(2));
    }
}
