//! Playback windows and slicing of timed lyrics into them.

use crate::error::ValidationError;
use crate::lrc::{TimedLine, TimedLyrics};

/// Closed playback interval `[start, end]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    start: f64,
    end: f64,
}

impl Window {
    /// Create a window, rejecting negative, non-finite or inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if either bound is not a finite
    /// non-negative number or if `start > end`.
    pub fn new(start: f64, end: f64) -> Result<Self, ValidationError> {
        for value in [start, end] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::TimeOutOfRange { value });
            }
        }
        if start > end {
            return Err(ValidationError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> f64 {
        self.end
    }

    #[must_use]
    pub fn contains(&self, offset: f64) -> bool {
        self.start <= offset && offset <= self.end
    }
}

impl TimedLyrics {
    /// Extract the lines inside `window`, rebased so the window starts at zero.
    ///
    /// Boundaries are inclusive. Rebased offsets are rounded to hundredths of
    /// a second. Input order is kept as-is, even if it is not sorted. A
    /// window with no lines in it produces an empty sequence.
    #[must_use]
    pub fn slice(&self, window: Window) -> Self {
        self.iter()
            .filter(|line| window.contains(line.offset))
            .map(|line| TimedLine::new(round_hundredths(line.offset - window.start), &*line.text))
            .collect()
    }
}

fn round_hundredths(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
