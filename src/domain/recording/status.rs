//! Recording status snapshot

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::state::RecorderState;

/// Point-in-time view of the file recorder, as returned by
/// `start`, `stop` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub file_path: PathBuf,
    pub duration_seconds: u64,
    pub duration_millis: u64,
    pub is_recording: bool,
    pub is_paused: bool,
    pub is_streaming: bool,
    /// Pending recorder fault, reported once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordingStatus {
    pub fn new(path: &Path, state: RecorderState, elapsed: Duration) -> Self {
        Self {
            file_path: path.to_path_buf(),
            duration_seconds: elapsed.as_secs(),
            duration_millis: elapsed.as_millis() as u64,
            is_recording: state == RecorderState::Recording,
            is_paused: state == RecorderState::Paused,
            is_streaming: false,
            error: None,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.is_streaming = streaming;
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_state_flags() {
        let status = RecordingStatus::new(
            Path::new("/tmp/out.flac"),
            RecorderState::Recording,
            Duration::from_millis(2500),
        );
        assert!(status.is_recording);
        assert!(!status.is_paused);
        assert_eq!(status.duration_seconds, 2);
        assert_eq!(status.duration_millis, 2500);
    }

    #[test]
    fn paused_is_not_recording() {
        let status = RecordingStatus::new(
            Path::new("/tmp/out.flac"),
            RecorderState::Paused,
            Duration::ZERO,
        );
        assert!(!status.is_recording);
        assert!(status.is_paused);
    }

    #[test]
    fn serializes_camel_case() {
        let status = RecordingStatus::new(
            Path::new("/tmp/out.flac"),
            RecorderState::Idle,
            Duration::from_secs(2),
        )
        .with_streaming(true);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["filePath"], "/tmp/out.flac");
        assert_eq!(json["durationSeconds"], 2);
        assert_eq!(json["isRecording"], false);
        assert_eq!(json["isStreaming"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_is_serialized_when_present() {
        let status = RecordingStatus::new(
            Path::new("/tmp/out.flac"),
            RecorderState::Idle,
            Duration::ZERO,
        )
        .with_error(Some("WriteFailed: disk full".to_string()));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["error"], "WriteFailed: disk full");
    }
}
