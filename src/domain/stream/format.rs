//! Capture format shared by the streaming and recording paths

use std::time::Duration;

/// Default capture rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default samples per emitted frame (~46 ms at 44.1 kHz)
pub const DEFAULT_FRAME_LEN: usize = 2048;

/// Mono PCM capture format.
///
/// Drivers deliver frames of exactly `frame_len` samples at `sample_rate`;
/// recordings are stored as 16-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_len: usize,
}

impl CaptureFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    pub fn new(sample_rate: u32, frame_len: usize) -> Self {
        Self {
            sample_rate,
            channels: 1,
            frame_len,
        }
    }

    /// Wall-clock time covered by one frame
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_len as f64 / self.sample_rate as f64)
    }
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_FRAME_LEN)
    }
}
