//! Minute arithmetic on the timeline axis
//!
//! The axis runs from minute `0` to `domain_minutes` (1440 for a single day,
//! 2880 for a 48-hour window). All positions are snapped to a fixed minute
//! granularity and clamped by anchoring, which never truncates a duration.

use std::fmt;

use thiserror::Error;

/// Single-day view
pub const DAY_MINUTES: i64 = 1440;

/// 48-hour rolling window
pub const TWO_DAY_MINUTES: i64 = 2880;

/// Default snap granularity
pub const DEFAULT_SNAP_MINUTES: i64 = 5;

/// Largest magnitude accepted from user input, well past any window
pub const MAX_INPUT_MINUTES: i64 = 10 * TWO_DAY_MINUTES;

#[derive(Debug, Error, PartialEq)]
pub enum TimeError {
    #[error("Invalid time '{0}': expected HH:MM or a minute count")]
    InvalidFormat(String),

    #[error("Invalid minutes in '{0}': must be below 60")]
    InvalidMinutes(String),

    #[error("Time '{0}' is out of range (at most {max} minutes either way)", max = MAX_INPUT_MINUTES)]
    OutOfRange(String),
}

/// The timeline domain and its snap granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub domain_minutes: i64,
    pub snap_minutes: i64,
}

impl Window {
    pub fn new(domain_minutes: i64, snap_minutes: i64) -> Self {
        Self {
            domain_minutes,
            snap_minutes,
        }
    }

    /// Rounds to the nearest multiple of the snap granularity (half rounds up)
    pub fn snap(&self, minute: i64) -> i64 {
        let snap = self.snap_minutes.max(1);
        let rem = minute.rem_euclid(snap);
        let floor = minute.saturating_sub(rem);
        if rem >= snap - rem {
            floor.saturating_add(snap)
        } else {
            floor
        }
    }

    /// Places a span of `duration` starting at `start` inside the domain.
    ///
    /// A negative start anchors the span at 0, an end past the domain anchors
    /// it at `domain_minutes`. Duration is always preserved.
    pub fn anchor(&self, start: i64, duration: i64) -> (i64, i64) {
        let mut start = start;
        let mut end = start.saturating_add(duration);

        if start < 0 {
            start = 0;
            end = duration;
        }
        if end > self.domain_minutes {
            end = self.domain_minutes;
            start = self.domain_minutes - duration;
        }

        (start, end)
    }

    /// Snaps then anchors a candidate start
    pub fn place(&self, candidate_start: i64, duration: i64) -> (i64, i64) {
        self.anchor(self.snap(candidate_start), duration)
    }

    /// Returns true if `[start, end)` is a valid span inside the domain
    pub fn contains_span(&self, start: i64, end: i64) -> bool {
        0 <= start && start < end && end <= self.domain_minutes
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(DAY_MINUTES, DEFAULT_SNAP_MINUTES)
    }
}

/// Converts a pixel offset to minutes (rounding half up)
pub fn px_to_minutes(px: f64, minute_px: f64) -> i64 {
    if minute_px <= 0.0 {
        return 0;
    }
    (px / minute_px + 0.5).floor() as i64
}

/// Parses `HH:MM` (hours may exceed 23 on a multi-day window) or a bare minute count
pub fn parse_clock(s: &str) -> Result<i64, TimeError> {
    let s = s.trim();

    let Some((hours, minutes)) = s.split_once(':') else {
        let minutes = s
            .parse::<i64>()
            .map_err(|_| TimeError::InvalidFormat(s.to_string()))?;
        return in_input_range(s, Some(minutes));
    };

    let hours: i64 = hours
        .parse()
        .map_err(|_| TimeError::InvalidFormat(s.to_string()))?;
    let minutes: i64 = minutes
        .parse()
        .map_err(|_| TimeError::InvalidFormat(s.to_string()))?;

    if hours < 0 || minutes < 0 {
        return Err(TimeError::InvalidFormat(s.to_string()));
    }
    if minutes >= 60 {
        return Err(TimeError::InvalidMinutes(s.to_string()));
    }

    in_input_range(s, hours.checked_mul(60).and_then(|h| h.checked_add(minutes)))
}

fn in_input_range(s: &str, minutes: Option<i64>) -> Result<i64, TimeError> {
    minutes
        .filter(|m| m.abs() <= MAX_INPUT_MINUTES)
        .ok_or_else(|| TimeError::OutOfRange(s.to_string()))
}

/// A minute offset rendered as `HH:MM`
pub struct Clock(pub i64);

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let m = self.0.abs();
        write!(f, "{}{:02}:{:02}", sign, m / 60, m % 60)
    }
}
