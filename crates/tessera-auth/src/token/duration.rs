//! Compact lifetime grammar.
//!
//! Token lifetimes are written as an unsigned integer immediately followed by
//! a unit: `s` (seconds), `m` (minutes), `h` (hours) or `d` (days), for
//! example `"15m"` or `"7d"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;

/// Parses a compact lifetime string into a [`Duration`].
///
/// # Errors
///
/// Returns [`AuthError::InvalidDurationFormat`] for anything other than
/// `<digits><s|m|h|d>`, including signs, whitespace and values that overflow.
pub fn parse_lifetime(value: &str) -> AuthResult<Duration> {
    let invalid = || AuthError::invalid_duration(value);

    let unit = value.chars().last().ok_or_else(invalid)?;
    let multiplier: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let digits = &value[..value.len() - 1];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let seconds = amount
        .checked_mul(multiplier)
        .and_then(|s| i64::try_from(s).ok())
        .ok_or_else(invalid)?;

    Ok(Duration::seconds(seconds))
}

/// Longest lifetime accepted by configuration.
pub const MAX_LIFETIME: Duration = Duration::days(3650);

/// Returns `start + lifetime`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidDurationFormat`] if the sum is outside the
/// representable date range.
pub fn expiry_after(start: OffsetDateTime, lifetime: Duration) -> AuthResult<OffsetDateTime> {
    start
        .checked_add(lifetime)
        .ok_or_else(|| AuthError::invalid_duration(format!("{}s", lifetime.whole_seconds())))
}

/// A validated lifetime that remembers how it was written.
///
/// Deserializes from and serializes to the compact string form, so it can be
/// used directly in configuration structs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifetime {
    raw: String,
    duration: Duration,
}

impl Lifetime {
    /// Returns the parsed duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns the lifetime in whole seconds.
    #[must_use]
    pub fn whole_seconds(&self) -> i64 {
        self.duration.whole_seconds()
    }

    /// Returns the original compact string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Lifetime {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            raw: s.to_string(),
            duration: parse_lifetime(s)?,
        })
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Lifetime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Lifetime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_unit() {
        assert_eq!(parse_lifetime("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_lifetime("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_lifetime("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_lifetime("7d").unwrap(), Duration::days(7));
    }

    #[test]
    fn test_zero_is_grammatical() {
        assert_eq!(parse_lifetime("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in [
            "", "s", "15", "15x", "15ms", "-5m", "+5m", " 5m", "5m ", "5 m", "1.5h", "h1", "5M",
        ] {
            let err = parse_lifetime(input).unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidDurationFormat { .. }),
                "input {input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_lifetime("99999999999999999999d").is_err());
        assert!(parse_lifetime("18446744073709551615d").is_err());
    }

    #[test]
    fn test_expiry_after_rejects_out_of_range() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(
            expiry_after(now, Duration::minutes(15)).unwrap(),
            now + Duration::minutes(15)
        );

        let huge = parse_lifetime("999999999d").unwrap();
        let err = expiry_after(now, huge).unwrap_err();
        assert!(matches!(err, AuthError::InvalidDurationFormat { .. }));
    }

    #[test]
    fn test_lifetime_deserializes_from_string() {
        let lifetime: Lifetime = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(lifetime.whole_seconds(), 900);
        assert_eq!(lifetime.as_str(), "15m");
        assert_eq!(serde_json::to_string(&lifetime).unwrap(), "\"15m\"");

        let err = serde_json::from_str::<Lifetime>("\"fifteen minutes\"").unwrap_err();
        assert!(err.to_string().contains("Invalid duration format"));
    }
}
