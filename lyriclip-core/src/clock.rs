//! Clock-time parsing for request windows.
//!
//! Accepts `ss`, `mm:ss` and `hh:mm:ss`. Only the seconds field may carry a
//! fractional part (`01:02.5`).

use crate::error::ValidationError;

/// Parse a clock-time string into seconds.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedTime`] if the string is not one of the
/// accepted shapes.
pub fn parse_clock_time(value: &str) -> Result<f64, ValidationError> {
    let malformed = || ValidationError::MalformedTime {
        value: value.to_string(),
    };

    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() > 3 {
        return Err(malformed());
    }

    let Some((seconds, units)) = parts.split_last() else {
        return Err(malformed());
    };

    let mut total = parse_seconds(seconds).ok_or_else(malformed)?;
    for (unit, multiplier) in units.iter().rev().zip([60.0, 3600.0]) {
        let whole = parse_whole(unit).ok_or_else(malformed)?;
        total += whole * multiplier;
    }

    Ok(total)
}

fn parse_whole(s: &str) -> Option<f64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_seconds(s: &str) -> Option<f64> {
    match s.split_once('.') {
        Some((whole, fraction)) => {
            let digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
            if whole.is_empty() || !digits(whole) || !digits(fraction) {
                return None;
            }
            s.parse().ok()
        }
        None => parse_whole(s),
    }
}
