//! Duration text codec used for the `duration` field of recorded responses.
//!
//! Durations are written the way Go prints them (`"0s"`, `"850µs"`,
//! `"1.5ms"`, `"2m3.25s"`) so cassettes stay interchangeable with other
//! recorders. Reading also accepts a bare integer count of nanoseconds.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Serializes a duration as text.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*duration))
}

/// Deserializes a duration from text or integer nanoseconds.
///
/// # Errors
///
/// Fails on malformed duration text or negative values.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration such as \"1.5s\" or an integer count of nanoseconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_nanos(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_nanos)
            .map_err(|_| E::custom(format!("negative duration: {v}")))
    }
}

/// Formats a duration.
#[must_use]
pub fn format(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".into();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", decimal(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI));
    }

    let secs = nanos / NANOS_PER_SEC;
    let frac = nanos % NANOS_PER_SEC;
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);
    let seconds = decimal(seconds * NANOS_PER_SEC + frac, NANOS_PER_SEC);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, m) => format!("{m}m{seconds}s"),
        (h, m) => format!("{h}h{m}m{seconds}s"),
    }
}

/// `value / unit` rendered with the shortest exact decimal fraction.
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parses duration text: one or more `<number><unit>` terms, or a bare `0`.
///
/// # Errors
///
/// Returns a description of the problem for malformed or negative input.
pub fn parse(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let body = text.strip_prefix('+').unwrap_or(text);
    if body.starts_with('-') {
        return Err(format!("negative duration: {text:?}"));
    }
    if body == "0" {
        return Ok(Duration::ZERO);
    }
    if body.is_empty() {
        return Err("empty duration".into());
    }

    let mut total: u128 = 0;
    let mut rest = body;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(format!("invalid duration: {text:?}"));
        }
        let unit_len = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            "" => return Err(format!("missing unit in duration: {text:?}")),
            other => return Err(format!("unknown unit {other:?} in duration: {text:?}")),
        };
        total = total
            .checked_add(scaled(number, scale).ok_or_else(|| format!("invalid duration: {text:?}"))?)
            .ok_or_else(|| format!("duration overflow: {text:?}"))?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| format!("duration overflow: {text:?}"))?;
    let nanos = u32::try_from(total % NANOS_PER_SEC).unwrap_or(0);
    Ok(Duration::new(secs, nanos))
}

/// `number * scale` for a decimal number with an optional fraction.
fn scaled(number: &str, scale: u128) -> Option<u128> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if frac.contains('.') {
        return None;
    }
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(scale)?;
    let mut place = scale;
    for digit in frac.chars() {
        place /= 10;
        if place == 0 {
            break;
        }
        value += u128::from(digit.to_digit(10)?) * place;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_like_go() {
        assert_eq!(format(Duration::ZERO), "0s");
        assert_eq!(format(Duration::from_nanos(42)), "42ns");
        assert_eq!(format(Duration::from_nanos(1_500)), "1.5µs");
        assert_eq!(format(Duration::from_micros(1_500)), "1.5ms");
        assert_eq!(format(Duration::from_millis(2_250)), "2.25s");
        assert_eq!(format(Duration::from_secs(120)), "2m0s");
        assert_eq!(format(Duration::from_secs(3_723)), "1h2m3s");
    }

    #[test]
    fn parses_compound_and_integer_forms() {
        assert_eq!(parse("1.5ms").unwrap(), Duration::from_micros(1_500));
        assert_eq!(parse("1h2m3.5s").unwrap(), Duration::from_millis(3_723_500));
        assert_eq!(parse("850us").unwrap(), Duration::from_micros(850));
        assert_eq!(parse("850µs").unwrap(), Duration::from_micros(850));
        assert_eq!(parse("0").unwrap(), Duration::ZERO);
        assert_eq!(parse(&format(Duration::from_nanos(123_456_789))).unwrap(), Duration::from_nanos(123_456_789));
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(parse("").is_err());
        assert!(parse("-1s").is_err());
        assert!(parse("10").is_err());
        assert!(parse("3 parsecs").is_err());
        assert!(parse("1..5s").is_err());
    }

    #[test]
    fn deserializes_yaml_strings_and_integers() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "super")]
            d: Duration,
        }
        let w: Wrapper = serde_yaml::from_str("d: 12.5ms").unwrap();
        assert_eq!(w.d, Duration::from_micros(12_500));
        let w: Wrapper = serde_yaml::from_str("d: 2000").unwrap();
        assert_eq!(w.d, Duration::from_nanos(2_000));
    }
}
