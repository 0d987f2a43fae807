//! Clock and timestamp utilities.
//!
//! Every RallyMark timestamp is an integer number of milliseconds from the
//! start of the source media. This module provides:
//! - A monotonic clock used to advance a playhead while media is "playing"
//! - Conversion between milliseconds and fractional seconds
//! - Operator-facing parsing and formatting of timestamps

use std::time::Instant;

use crate::error::{RallymarkError, RallymarkResult};

/// A monotonic clock that reports milliseconds elapsed since it was started.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Milliseconds elapsed since the clock started.
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Convert milliseconds to fractional seconds.
pub fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1_000.0
}

/// Convert fractional seconds to milliseconds, rounding to the nearest ms.
/// Negative and non-finite inputs map to zero.
pub fn secs_to_ms(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1_000.0).round() as u64
}

/// Render a timestamp the way marker lists show it: `12.34s`.
pub fn format_secs(ms: u64) -> String {
    format!("{:.2}s", ms_to_secs(ms))
}

/// Render a timestamp as `mm:ss.mmm` (or `h:mm:ss.mmm` past an hour).
pub fn format_clock(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1_000) % 60;
    let millis = ms % 1_000;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
    } else {
        format!("{minutes:02}:{seconds:02}.{millis:03}")
    }
}

/// Parse an operator-supplied timestamp into milliseconds.
///
/// Accepted forms:
/// - `12500`: plain integer milliseconds
/// - `12.5s`: seconds with an `s` suffix
/// - `1:02.5` / `1:02:03.250`: clock notation
pub fn parse_timestamp(input: &str) -> RallymarkResult<u64> {
    let raw = input.trim();
    let invalid = || RallymarkError::Config {
        message: format!("Invalid timestamp '{input}' (use 12500, 12.5s, or 1:02.5)"),
    };

    if raw.is_empty() || raw.starts_with('-') {
        return Err(invalid());
    }

    if let Some(secs) = raw.strip_suffix('s') {
        let secs: f64 = secs.trim().parse().map_err(|_| invalid())?;
        if !secs.is_finite() {
            return Err(invalid());
        }
        return Ok(secs_to_ms(secs));
    }

    if raw.contains(':') {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }
        let (last, whole) = parts.split_last().ok_or_else(invalid)?;
        let secs: f64 = last.parse().map_err(|_| invalid())?;
        if !secs.is_finite() || secs >= 60.0 {
            return Err(invalid());
        }
        let mut total_ms = secs_to_ms(secs);
        let mut unit_ms = 60_000u64;
        for (index, part) in whole.iter().rev().enumerate() {
            let value: u64 = part.parse().map_err(|_| invalid())?;
            // Only the leading field may exceed its clock range.
            if index + 1 < whole.len() && value >= 60 {
                return Err(invalid());
            }
            total_ms = value
                .checked_mul(unit_ms)
                .and_then(|v| total_ms.checked_add(v))
                .ok_or_else(invalid)?;
            unit_ms *= 60;
        }
        return Ok(total_ms);
    }

    raw.parse::<u64>().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = MonotonicClock::start();
        assert!(clock.elapsed_ms() < 1_000);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_ms_secs_conversion() {
        assert!((ms_to_secs(1_500) - 1.5).abs() < 1e-9);
        assert_eq!(secs_to_ms(2.0), 2_000);
        assert_eq!(secs_to_ms(0.0004), 0);
        assert_eq!(secs_to_ms(-3.0), 0);
        assert_eq!(secs_to_ms(f64::NAN), 0);
    }

    #[test]
    fn test_format_secs_matches_marker_list() {
        assert_eq!(format_secs(12_345), "12.35s");
        assert_eq!(format_secs(0), "0.00s");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(62_500), "01:02.500");
        assert_eq!(format_clock(3_723_250), "1:02:03.250");
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp("12500").unwrap(), 12_500);
        assert_eq!(parse_timestamp("12.5s").unwrap(), 12_500);
        assert_eq!(parse_timestamp(" 1:02.5 ").unwrap(), 62_500);
        assert_eq!(parse_timestamp("1:02:03.250").unwrap(), 3_723_250);
        assert_eq!(parse_timestamp("90:00").unwrap(), 5_400_000);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        for bad in [
            "",
            "-5",
            "abc",
            "1:75",
            "1:2:3:4",
            "nans",
            "12.5",
            "1:75:00",
            "400000000000000:00",
        ] {
            assert!(parse_timestamp(bad).is_err(), "{bad} should be rejected");
        }
    }
}
