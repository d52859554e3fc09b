//! Duration formatting and parsing.
//!
//! Durations are displayed as `3h0m0s`, `25m4s`, `7s` or `0s`, always
//! truncated to whole seconds. The same notation (with optional fractions and
//! sub-second units such as `1.5h` or `300ms`) is accepted when parsing.

use chrono::TimeDelta;
use thiserror::Error;

/// Errors from [`parse_duration`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    /// The input is not a duration.
    #[error("invalid duration: {input:?}")]
    Invalid { input: String },

    /// A number is not followed by a unit.
    #[error("missing unit in duration: {input:?}")]
    MissingUnit { input: String },

    /// The unit is not one of `ns`, `us`, `ms`, `s`, `m`, `h`.
    #[error("unknown unit {unit:?} in duration: {input:?}")]
    UnknownUnit { unit: String, input: String },

    /// The duration does not fit in a `TimeDelta`.
    #[error("duration out of range: {input:?}")]
    Overflow { input: String },
}

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Drops everything below whole seconds, rounding toward zero.
#[must_use]
pub fn truncate_to_seconds(duration: TimeDelta) -> TimeDelta {
    TimeDelta::seconds(duration.num_seconds())
}

/// Formats a duration truncated to whole seconds, e.g. `3h0m0s`.
pub fn format_duration(duration: TimeDelta) -> String {
    let seconds = duration.num_seconds();
    if seconds == 0 {
        return "0s".to_string();
    }
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    let hours = seconds / 3600;
    let minutes = seconds / 60 % 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

/// Parses a duration such as `1h30m`, `1.5h`, `45m`, `2h45m30.5s` or `300ms`.
///
/// A leading sign is allowed. The bare string `0` is the zero duration.
pub fn parse_duration(input: &str) -> Result<TimeDelta, DurationParseError> {
    let invalid = || DurationParseError::Invalid {
        input: input.to_string(),
    };
    let overflow = || DurationParseError::Overflow {
        input: input.to_string(),
    };

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        rest = tail;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }
        if unit.is_empty() {
            return Err(DurationParseError::MissingUnit {
                input: input.to_string(),
            });
        }
        let unit_nanos = unit_nanos(unit).ok_or_else(|| DurationParseError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let whole: i128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(unit_nanos).ok_or_else(overflow)?;

        // Digits beyond nanosecond resolution cannot change the result.
        let mut fraction_value: i128 = 0;
        let mut divisor: i128 = 1;
        for digit in fraction.bytes().take(20) {
            fraction_value = fraction_value * 10 + i128::from(digit - b'0');
            divisor *= 10;
        }
        nanos += fraction_value * unit_nanos / divisor;

        total_nanos = total_nanos.checked_add(nanos).ok_or_else(overflow)?;
    }

    if negative {
        total_nanos = -total_nanos;
    }
    let nanos = i64::try_from(total_nanos).map_err(|_| overflow())?;
    Ok(TimeDelta::nanoseconds(nanos))
}

fn unit_nanos(unit: &str) -> Option<i128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SECOND,
        "m" => 60 * NANOS_PER_SECOND,
        "h" => 3600 * NANOS_PER_SECOND,
        _ => return None,
    };
    Some(nanos)
}
