//! Duration value object used for CLI and config time values

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default interval after which a silent driver counts as interrupted
pub const DEFAULT_STALL_TIMEOUT_MS: u64 = 2000;

/// Value object representing a time span.
/// Immutable and validated on creation (never zero when parsed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// Default stall timeout for input drivers
    pub const fn default_stall_timeout() -> Self {
        Self::from_millis(DEFAULT_STALL_TIMEOUT_MS)
    }

    /// Whole seconds, truncated
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }
}

impl From<StdDuration> for Duration {
    fn from(d: StdDuration) -> Self {
        Self::from_millis(d.as_millis() as u64)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse strings such as "500ms", "30s", "1m", "2m30s" or "1m500ms".
    /// Units may appear at most once each, largest first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DurationParseError {
            input: s.to_string(),
        };
        let input = s.trim().to_lowercase();

        let mut total_ms: u64 = 0;
        let mut current = String::new();
        // 0 = nothing yet, 1 = minutes, 2 = seconds, 3 = milliseconds
        let mut last_unit = 0u8;
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch.is_ascii_digit() {
                current.push(ch);
                continue;
            }
            if current.is_empty() {
                return Err(err());
            }
            let value: u64 = current.parse().map_err(|_| err())?;
            current.clear();

            let (unit, factor) = match ch {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    (3, 1)
                }
                'm' => (1, 60_000),
                's' => (2, 1000),
                _ => return Err(err()),
            };
            if unit <= last_unit {
                return Err(err());
            }
            last_unit = unit;
            total_ms = value
                .checked_mul(factor)
                .and_then(|v| total_ms.checked_add(v))
                .ok_or_else(err)?;
        }

        if !current.is_empty() || last_unit == 0 || total_ms == 0 {
            return Err(err());
        }

        Ok(Self {
            milliseconds: total_ms,
        })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.milliseconds / 60_000;
        let seconds = (self.milliseconds / 1000) % 60;
        let millis = self.milliseconds % 1000;

        let mut wrote = false;
        if minutes > 0 {
            write!(f, "{}m", minutes)?;
            wrote = true;
        }
        if seconds > 0 {
            write!(f, "{}s", seconds)?;
            wrote = true;
        }
        if millis > 0 || !wrote {
            write!(f, "{}ms", millis)?;
        }
        Ok(())
    }
}
