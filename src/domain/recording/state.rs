//! File recorder lifecycle state machine

use std::fmt;
use thiserror::Error;

/// Recorder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Unconfigured,
    Idle,
    Recording,
    Paused,
}

impl RecorderState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }

    /// True while the recorder holds the input device
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: RecorderState,
    pub action: &'static str,
}

/// Recorder lifecycle.
///
/// State machine:
///   UNCONFIGURED -> IDLE (configure)
///   IDLE -> IDLE (configure, rebinds the path)
///   IDLE -> RECORDING (start)
///   RECORDING -> PAUSED (pause)
///   PAUSED -> RECORDING (resume)
///   RECORDING | PAUSED -> IDLE (stop, or end on fault)
#[derive(Debug, Default)]
pub struct RecorderLifecycle {
    state: RecorderState,
}

impl RecorderLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn is_paused(&self) -> bool {
        self.state == RecorderState::Paused
    }

    pub fn configure(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            "configure",
            &[RecorderState::Unconfigured, RecorderState::Idle],
            RecorderState::Idle,
        )
    }

    pub fn start(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition("start", &[RecorderState::Idle], RecorderState::Recording)
    }

    pub fn pause(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition("pause", &[RecorderState::Recording], RecorderState::Paused)
    }

    pub fn resume(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition("resume", &[RecorderState::Paused], RecorderState::Recording)
    }

    /// Also used when the recording ends on its own after a fault
    pub fn stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            "stop",
            &[RecorderState::Recording, RecorderState::Paused],
            RecorderState::Idle,
        )
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: &[RecorderState],
        to: RecorderState,
    ) -> Result<(), InvalidStateTransition> {
        if !from.contains(&self.state) {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action,
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lifecycle_is_unconfigured() {
        let lifecycle = RecorderLifecycle::new();
        assert_eq!(lifecycle.state(), RecorderState::Unconfigured);
        assert!(!lifecycle.is_recording());
    }

    #[test]
    fn start_requires_configure() {
        let mut lifecycle = RecorderLifecycle::new();
        let err = lifecycle.start().unwrap_err();
        assert_eq!(err.current_state, RecorderState::Unconfigured);
        assert_eq!(err.action, "start");
    }

    #[test]
    fn configure_is_repeatable_while_idle() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.configure().unwrap();
        lifecycle.configure().unwrap();
        assert_eq!(lifecycle.state(), RecorderState::Idle);
    }

    #[test]
    fn configure_rejected_while_recording() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.configure().unwrap();
        lifecycle.start().unwrap();
        assert!(lifecycle.configure().is_err());
    }

    #[test]
    fn pause_and_resume_cycle() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.configure().unwrap();
        lifecycle.start().unwrap();

        lifecycle.pause().unwrap();
        assert!(lifecycle.is_paused());
        assert!(lifecycle.pause().is_err());

        lifecycle.resume().unwrap();
        assert!(lifecycle.is_recording());
        assert!(lifecycle.resume().is_err());
    }

    #[test]
    fn stop_from_paused_returns_to_idle() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.configure().unwrap();
        lifecycle.start().unwrap();
        lifecycle.pause().unwrap();
        lifecycle.stop().unwrap();
        assert_eq!(lifecycle.state(), RecorderState::Idle);
    }

    #[test]
    fn stop_from_idle_fails() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.configure().unwrap();
        let err = lifecycle.stop().unwrap_err();
        assert_eq!(err.current_state, RecorderState::Idle);
    }

    #[test]
    fn full_cycle_can_repeat() {
        let mut lifecycle = RecorderLifecycle::new();
        lifecycle.configure().unwrap();
        for _ in 0..2 {
            lifecycle.start().unwrap();
            lifecycle.stop().unwrap();
        }
        assert_eq!(lifecycle.state(), RecorderState::Idle);
    }

    #[test]
    fn active_states() {
        assert!(RecorderState::Recording.is_active());
        assert!(RecorderState::Paused.is_active());
        assert!(!RecorderState::Idle.is_active());
        assert!(!RecorderState::Unconfigured.is_active());
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition {
            current_state: RecorderState::Paused,
            action: "start",
        };
        let msg = err.to_string();
        assert!(msg.contains("start"));
        assert!(msg.contains("paused"));
    }
}
