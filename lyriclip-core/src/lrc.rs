use serde::{Deserialize, Serialize};

/// A single lyric event: text that becomes active `offset` seconds into playback.
///
/// Serialized as `{"start": <seconds>, "text": <string>}`, the shape the
/// renderer reads from a lyric window document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLine {
    #[serde(rename = "start")]
    pub offset: f64,
    pub text: String,
}

impl TimedLine {
    pub fn new(offset: f64, text: impl Into<String>) -> Self {
        Self {
            offset,
            text: text.into(),
        }
    }
}

/// Ordered sequence of timed lyric lines, in document order.
///
/// Offsets are usually non-decreasing but this is not enforced: duplicate or
/// out-of-order timestamps are kept exactly as the document listed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimedLyrics {
    lines: Vec<TimedLine>,
}

impl TimedLyrics {
    #[must_use]
    pub const fn new(lines: Vec<TimedLine>) -> Self {
        Self { lines }
    }

    /// Parse an LRC document.
    ///
    /// Every line of the form `[mm:ss.xx]text` becomes one [`TimedLine`].
    /// Blank lines and lines without a leading timestamp (ID tags, comments,
    /// garbage) are skipped. Parsing never fails; a document with no timed
    /// lines yields an empty sequence.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let lines = input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(parse_lyric_line)
            .collect();

        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[TimedLine] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimedLine> {
        self.lines.iter()
    }
}

impl FromIterator<TimedLine> for TimedLyrics {
    fn from_iter<I: IntoIterator<Item = TimedLine>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TimedLyrics {
    type Item = &'a TimedLine;
    type IntoIter = std::slice::Iter<'a, TimedLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Parse a trimmed line like `[01:02.50]Some words`.
///
/// Only the leading timestamp is consumed; anything after its closing bracket,
/// including further bracketed tags, is the line's text.
fn parse_lyric_line(line: &str) -> Option<TimedLine> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    let offset = parse_timestamp(&rest[..end])?;
    let text = rest[end + 1..].trim();

    Some(TimedLine::new(offset, text))
}

/// Parse `minutes:seconds` where minutes are digits and seconds are digits
/// with an optional fractional part (`12`, `12.`, `12.34`).
fn parse_timestamp(s: &str) -> Option<f64> {
    let (minutes, seconds) = s.split_once(':')?;

    if !is_digits(minutes) {
        return None;
    }

    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };
    if !is_digits(whole) || fraction.is_some_and(|f| !f.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;

    Some(minutes * 60.0 + seconds)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
