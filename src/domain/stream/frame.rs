//! Normalized sample frames

/// Full-scale value for signed 16-bit PCM
pub const MAX_AMPLITUDE_I16: f32 = i16::MAX as f32;

/// Scale a signed 16-bit sample into [-1.0, 1.0].
///
/// `i16::MIN` would land just below -1.0 and is clamped.
#[inline]
pub fn normalize_i16(sample: i16) -> f32 {
    (sample as f32 / MAX_AMPLITUDE_I16).max(-1.0)
}

/// Pass a float sample through, clamped; non-finite values become silence.
#[inline]
pub fn normalize_f32(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Convert a normalized sample back to 16-bit PCM
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    (normalize_f32(sample) * MAX_AMPLITUDE_I16).round() as i16
}

/// One buffer's worth of normalized mono samples.
///
/// Samples are always within [-1.0, 1.0]; every constructor enforces it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFrame {
    sequence: u64,
    samples: Vec<f32>,
}

impl SampleFrame {
    /// Build from float samples, clamping anything out of range
    pub fn new(mut samples: Vec<f32>) -> Self {
        for sample in samples.iter_mut() {
            *sample = normalize_f32(*sample);
        }
        Self {
            sequence: 0,
            samples,
        }
    }

    pub fn from_i16(samples: &[i16]) -> Self {
        Self {
            sequence: 0,
            samples: samples.iter().copied().map(normalize_i16).collect(),
        }
    }

    pub fn from_f32(samples: &[f32]) -> Self {
        Self::new(samples.to_vec())
    }

    /// Position of this frame in its stream (0-based)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Root mean square level
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f32).sqrt()
    }
}
