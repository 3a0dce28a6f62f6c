//! Elapsed-time tracking for a pausable recording

use std::time::{Duration, Instant};

/// Stopwatch that only advances while running.
///
/// Paused intervals are excluded; the total is kept after `halt`
/// until the next `restart`.
#[derive(Debug, Clone, Default)]
pub struct RecordingClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to zero and start running
    pub fn restart(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(Instant::now());
    }

    /// Stop advancing, keeping the total so far
    pub fn halt(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    /// Stop advancing as of `at`. An instant before the current run began
    /// adds nothing.
    pub fn halt_at(&mut self, at: Instant) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += at.saturating_duration_since(since);
        }
    }

    /// Continue advancing from the current total
    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn new_clock_is_zero() {
        let clock = RecordingClock::new();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn advances_while_running() {
        let mut clock = RecordingClock::new();
        clock.restart();
        sleep(Duration::from_millis(20));
        assert!(clock.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn halt_freezes_total() {
        let mut clock = RecordingClock::new();
        clock.restart();
        sleep(Duration::from_millis(10));
        clock.halt();
        let frozen = clock.elapsed();
        sleep(Duration::from_millis(20));
        assert_eq!(clock.elapsed(), frozen);
    }

    #[test]
    fn halt_at_ignores_time_after_the_instant() {
        let mut clock = RecordingClock::new();
        clock.restart();
        sleep(Duration::from_millis(10));
        let ended = Instant::now();
        sleep(Duration::from_millis(40));
        clock.halt_at(ended);
        let total = clock.elapsed();
        assert!(total >= Duration::from_millis(10));
        assert!(total < Duration::from_millis(40));
    }

    #[test]
    fn halt_at_is_a_no_op_when_halted() {
        let mut clock = RecordingClock::new();
        clock.restart();
        clock.halt();
        let frozen = clock.elapsed();
        clock.halt_at(Instant::now());
        assert_eq!(clock.elapsed(), frozen);
    }

    #[test]
    fn resume_continues_from_total() {
        let mut clock = RecordingClock::new();
        clock.restart();
        sleep(Duration::from_millis(10));
        clock.halt();
        let frozen = clock.elapsed();
        clock.resume();
        sleep(Duration::from_millis(10));
        assert!(clock.elapsed() >= frozen + Duration::from_millis(10));
    }

    #[test]
    fn restart_resets() {
        let mut clock = RecordingClock::new();
        clock.restart();
        sleep(Duration::from_millis(20));
        clock.halt();
        clock.restart();
        assert!(clock.elapsed() < Duration::from_millis(20));
    }
}
