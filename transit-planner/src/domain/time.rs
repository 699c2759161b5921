//! Timetable time handling.
//!
//! Feeds express times of day as "HH:MM" or "HH:MM:SS" strings, where the
//! hour may run past 23 for service continuing after midnight. The engines
//! work with a continuous minute offset instead, so this module converts
//! between the two.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time {input:?}: {reason}")]
pub struct TimeError {
    input: String,
    reason: &'static str,
}

impl TimeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }

    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// A point in the service day, in minutes since midnight.
///
/// Never NaN, which gives it a total order and makes it usable as a heap
/// key. Values of 1440 and above are service past midnight.
///
/// # Examples
///
/// ```
/// use transit_planner::domain::parse_time;
///
/// let t = parse_time("25:10").unwrap();
/// assert_eq!(t.as_f64(), 1510.0);
/// assert_eq!(t.to_string(), "25:10:00");
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct Minutes(f64);

impl Minutes {
    /// Sentinel for "not reached yet".
    pub const INFINITY: Self = Self(f64::INFINITY);

    /// Midnight at the start of the service day.
    pub const ZERO: Self = Self(0.0);

    /// Wrap a raw minute count. Returns `None` for NaN.
    pub fn new(minutes: f64) -> Option<Self> {
        if minutes.is_nan() {
            None
        } else {
            Some(Self(minutes))
        }
    }

    /// Returns the raw minute count.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns true unless this is [`Minutes::INFINITY`].
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl Eq for Minutes {}

impl Ord for Minutes {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Minutes {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Minutes {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<f64> for Minutes {
    type Output = Self;

    /// Adding NaN leaves the value unchanged.
    fn add(self, rhs: f64) -> Self::Output {
        if rhs.is_nan() { self } else { Self(self.0 + rhs) }
    }
}

impl fmt::Debug for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_finite() {
            write!(f, "Minutes({} = {})", self.0, format_time(*self))
        } else {
            write!(f, "Minutes(inf)")
        }
    }
}

impl fmt::Display for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_time(*self))
    }
}

/// Parse a time of day into minutes since midnight.
///
/// Accepts `HH:MM` and `HH:MM:SS`. Hours may exceed 23. Each field must be
/// an unsigned integer; the result is `h * 60 + m + s / 60`.
///
/// # Examples
///
/// ```
/// use transit_planner::domain::parse_time;
///
/// assert_eq!(parse_time("08:05").unwrap().as_f64(), 485.0);
/// assert_eq!(parse_time("00:00:30").unwrap().as_f64(), 0.5);
///
/// assert!(parse_time("0805").is_err());
/// assert!(parse_time("08:05:00:00").is_err());
/// assert!(parse_time("08:xx").is_err());
/// assert!(parse_time("").is_err());
/// ```
pub fn parse_time(s: &str) -> Result<Minutes, TimeError> {
    let trimmed = s.trim();
    let fields: Vec<&str> = trimmed.split(':').collect();
    if fields.len() < 2 || fields.len() > 3 {
        return Err(TimeError::new(s, "expected HH:MM or HH:MM:SS"));
    }

    let mut values = [0u32; 3];
    for (slot, field) in values.iter_mut().zip(&fields) {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeError::new(s, "fields must be unsigned integers"));
        }
        *slot = field
            .parse()
            .map_err(|_| TimeError::new(s, "field out of range"))?;
    }

    let [hours, minutes, seconds] = values;
    Ok(Minutes(
        f64::from(hours) * 60.0 + f64::from(minutes) + f64::from(seconds) / 60.0,
    ))
}

/// Format minutes since midnight as zero-padded `HH:MM:SS`.
///
/// Hours and minutes are floored, the seconds remainder rounded. Rounding is
/// done on the whole-second count so a remainder of 59.6s carries into the
/// minute instead of printing `:60`.
///
/// ```
/// use transit_planner::domain::{format_time, parse_time};
///
/// assert_eq!(format_time(parse_time("8:05").unwrap()), "08:05:00");
/// assert_eq!(format_time(parse_time("23:59:59").unwrap()), "23:59:59");
/// ```
pub fn format_time(minutes: Minutes) -> String {
    if !minutes.is_finite() {
        return "--:--:--".to_string();
    }
    let total_seconds = (minutes.0 * 60.0).round().max(0.0) as u64;
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}
