//! Water level threshold checking.
//!
//! The daemon compares each current reading against the station's static
//! characteristic values. Only `HW100` raises a warning; the remaining
//! labels are used to describe how high the water is.
//!
//! Everything in here is pure: no I/O, no shared state.

use crate::model::{ReadingParseError, ThresholdLabel, Thresholds};

/// Parses a displayed level such as `"160 cm"` into centimetres.
///
/// A trailing unit marker is stripped. The suffix must not contain further
/// digits, so decimal values (`"12,5 cm"`) are rejected rather than silently
/// truncated.
pub fn parse_level(raw: &str) -> Result<i64, ReadingParseError> {
    let err = || ReadingParseError { raw: raw.to_string() };
    let text = raw.trim();

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text),
    };

    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let (digits, suffix) = unsigned.split_at(digits_end);

    if digits.is_empty() || suffix.chars().any(|c| c.is_ascii_digit()) {
        return Err(err());
    }

    digits.parse::<i64>().map(|v| sign * v).map_err(|_| err())
}

/// Looks up a threshold value by label. Absent labels and labels published
/// without a number both yield `None`.
pub fn threshold(thresholds: &Thresholds, label: ThresholdLabel) -> Option<i64> {
    thresholds.get(label.as_str()).copied().flatten()
}

/// Returns true iff an `HW100` value is configured and the current level
/// meets or exceeds it.
///
/// An unknown level (`None`) never warns; the caller logs the parse failure.
pub fn is_warning(current_value: Option<i64>, thresholds: &Thresholds) -> bool {
    match (current_value, threshold(thresholds, ThresholdLabel::Hw100)) {
        (Some(value), Some(critical)) => value >= critical,
        _ => false,
    }
}

/// Returns the most severe label whose value the level meets or exceeds.
pub fn highest_exceeded(value: i64, thresholds: &Thresholds) -> Option<ThresholdLabel> {
    // Check thresholds in descending order of severity
    ThresholdLabel::ALL
        .into_iter()
        .find(|label| threshold(thresholds, *label).is_some_and(|t| value >= t))
}
