//! Errors reported across the audio-kit call surface

use thiserror::Error;

use super::device::DeviceUser;
use super::ports::{CaptureError, EncodeError};

/// Errors returned by unary calls and delivered on the amplitude stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioKitError {
    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Input device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Input device is busy: held by the {held_by}")]
    DeviceBusy { held_by: DeviceUser },

    #[error("Encoder initialization failed: {0}")]
    EncoderInitFailed(String),

    #[error("Failed to write recording: {0}")]
    WriteFailed(String),

    #[error("Input device interrupted: {0}")]
    DeviceInterrupted(String),

    #[error("No output path configured")]
    NotConfigured,
}

impl AudioKitError {
    /// Stable identifier for host boundaries
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "InvalidPath",
            Self::DeviceUnavailable(_) => "DeviceUnavailable",
            Self::DeviceBusy { .. } => "DeviceBusy",
            Self::EncoderInitFailed(_) => "EncoderInitFailed",
            Self::WriteFailed(_) => "WriteFailed",
            Self::DeviceInterrupted(_) => "DeviceInterrupted",
            Self::NotConfigured => "NotConfigured",
        }
    }

    /// `code: message`, the form carried in `RecordingStatus::error`
    pub fn report(&self) -> String {
        format!("{}: {}", self.code(), self)
    }
}

impl From<CaptureError> for AudioKitError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Unavailable(msg) => Self::DeviceUnavailable(msg),
            CaptureError::Interrupted(msg) => Self::DeviceInterrupted(msg),
        }
    }
}

impl From<EncodeError> for AudioKitError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Init(msg) => Self::EncoderInitFailed(msg),
            EncodeError::Write(msg) => Self::WriteFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AudioKitError::InvalidPath(String::new()).code(), "InvalidPath");
        assert_eq!(
            AudioKitError::DeviceBusy {
                held_by: DeviceUser::FileRecorder
            }
            .code(),
            "DeviceBusy"
        );
        assert_eq!(AudioKitError::NotConfigured.code(), "NotConfigured");
    }

    #[test]
    fn capture_errors_map() {
        let err: AudioKitError = CaptureError::Unavailable("no mic".into()).into();
        assert_eq!(err, AudioKitError::DeviceUnavailable("no mic".into()));

        let err: AudioKitError = CaptureError::Interrupted("reclaimed".into()).into();
        assert_eq!(err, AudioKitError::DeviceInterrupted("reclaimed".into()));
    }

    #[test]
    fn encode_errors_map() {
        let err: AudioKitError = EncodeError::Init("bad block size".into()).into();
        assert_eq!(err.code(), "EncoderInitFailed");

        let err: AudioKitError = EncodeError::Write("disk full".into()).into();
        assert_eq!(err.code(), "WriteFailed");
    }

    #[test]
    fn report_prefixes_code() {
        let err = AudioKitError::WriteFailed("disk full".into());
        let report = err.report();
        assert!(report.starts_with("WriteFailed: "));
        assert!(report.contains("disk full"));
    }

    #[test]
    fn busy_names_holder() {
        let err = AudioKitError::DeviceBusy {
            held_by: DeviceUser::AmplitudeStream,
        };
        assert!(err.to_string().contains("amplitude stream"));
    }
}
