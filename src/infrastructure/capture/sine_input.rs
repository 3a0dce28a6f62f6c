//! Synthetic sine-wave input
//!
//! Stands in for a microphone where no hardware is available: demos,
//! integration tests and the `--source sine` CLI flag.

use std::f32::consts::PI;
use std::thread;
use std::time::Instant;

use tracing::debug;

use crate::application::ports::{AudioInput, CaptureError, InputStream};
use crate::domain::stream::{normalize_i16, CaptureFormat, SampleFrame, MAX_AMPLITUDE_I16};

/// Raw sample encoding the generator pretends the device delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SineEncoding {
    #[default]
    I16,
    F32,
}

/// Sine generator behaving like a capture device
#[derive(Debug, Clone)]
pub struct SineInput {
    frequency: f32,
    peak: i16,
    encoding: SineEncoding,
    realtime: bool,
    fail_open: bool,
    interrupt_after: Option<u64>,
}

impl Default for SineInput {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            peak: 16384,
            encoding: SineEncoding::I16,
            realtime: true,
            fail_open: false,
            interrupt_after: None,
        }
    }
}

impl SineInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frequency(mut self, hz: f32) -> Self {
        self.frequency = hz;
        self
    }

    /// Peak amplitude in raw 16-bit units
    pub fn with_peak(mut self, peak: i16) -> Self {
        self.peak = peak;
        self
    }

    pub fn with_encoding(mut self, encoding: SineEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Pace frames at the capture rate (default) or deliver them immediately
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Make every `open` fail as if no device were present
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Report an interruption after `frames` frames
    pub fn interrupt_after(mut self, frames: u64) -> Self {
        self.interrupt_after = Some(frames);
        self
    }

    /// Expected normalized peak of every frame
    pub fn normalized_peak(&self) -> f32 {
        normalize_i16(self.peak)
    }
}

impl AudioInput for SineInput {
    fn name(&self) -> &str {
        "sine"
    }

    fn open(&self, format: &CaptureFormat) -> Result<Box<dyn InputStream>, CaptureError> {
        if self.fail_open {
            return Err(CaptureError::Unavailable(
                "Synthetic input configured to fail".to_string(),
            ));
        }
        debug!(
            "Sine input opened: {} Hz tone, peak {}, {:?}",
            self.frequency, self.peak, self.encoding
        );

        Ok(Box::new(SineStream {
            settings: self.clone(),
            format: *format,
            position: 0,
            frames: 0,
            started: Instant::now(),
        }))
    }
}

struct SineStream {
    settings: SineInput,
    format: CaptureFormat,
    /// Index of the next sample
    position: u64,
    frames: u64,
    started: Instant,
}

impl SineStream {
    fn sample(&self, index: u64) -> f32 {
        let t = index as f32 / self.format.sample_rate as f32;
        (2.0 * PI * self.settings.frequency * t).sin() * self.settings.peak as f32
    }

    fn pace(&self) {
        let due = self.format.frame_duration().mul_f64((self.frames + 1) as f64);
        let elapsed = self.started.elapsed();
        if due > elapsed {
            thread::sleep(due - elapsed);
        }
    }
}

impl InputStream for SineStream {
    fn read_frame(&mut self) -> Result<SampleFrame, CaptureError> {
        if self.settings.interrupt_after == Some(self.frames) {
            return Err(CaptureError::Interrupted(
                "Synthetic input interrupted".to_string(),
            ));
        }
        if self.settings.realtime {
            self.pace();
        }

        let start = self.position;
        let len = self.format.frame_len as u64;
        let frame = match self.settings.encoding {
            SineEncoding::I16 => {
                let raw: Vec<i16> = (start..start + len)
                    .map(|i| self.sample(i).round() as i16)
                    .collect();
                SampleFrame::from_i16(&raw)
            }
            SineEncoding::F32 => {
                let raw: Vec<f32> = (start..start + len)
                    .map(|i| self.sample(i) / MAX_AMPLITUDE_I16)
                    .collect();
                SampleFrame::from_f32(&raw)
            }
        };

        self.position += len;
        self.frames += 1;
        Ok(frame)
    }
}
