//! Human-readable durations for config values such as request timeouts ("5s", "500ms").

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

const UNITS: [(&str, u64); 5] = [
    ("ms", 1),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
];

/// Parse a duration string like "500ms", "5s", "2m", "1h" or "1d".
///
/// The input is case-insensitive and whitespace is trimmed.
///
/// ```
/// use permafolio::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    // "ms" must be tried before "m" and "s".
    let (num, millis_per_unit) = UNITS
        .iter()
        .find_map(|(suffix, factor)| s.strip_suffix(suffix).map(|n| (n, *factor)))
        .context("Duration must end with ms, s, m, h, or d")?;

    let num: u64 = num.trim().parse().with_context(|| "Invalid number in duration")?;
    let millis = num
        .checked_mul(millis_per_unit)
        .context("Duration is too large")?;

    Ok(Duration::from_millis(millis))
}

/// Format a duration using the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis() as u64;
    for (suffix, factor) in UNITS.iter().skip(1) {
        if millis >= *factor && millis % factor == 0 {
            return format!("{}{suffix}", millis / factor);
        }
    }
    format!("{millis}ms")
}

/// Serde deserializer for duration strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("750ms").unwrap(), Duration::from_millis(750));
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(parse_duration(" 5S ").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("10MS").unwrap(), Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_input() {
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("5w").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("99999999999999999d").is_err());
    }

    #[test]
    fn test_format_picks_largest_even_unit() {
        assert_eq!(format_duration(Duration::from_secs(86400)), "1d");
        assert_eq!(format_duration(Duration::from_secs(90 * 60)), "90m");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }
}
