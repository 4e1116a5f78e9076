//! Snapshot timestamp format.
//!
//! Written as RFC 3339 UTC with only as many fractional digits as the value
//! needs. Older snapshots stored naive local ISO strings
//! (`2024-01-31T10:15:00.123456`); those are accepted and read as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(|naive| naive.and_utc()),
    }
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|e| de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
}

/// Same format for nullable fields (`return_date`).
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&super::format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => super::parse(s)
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid timestamp {:?}: {}", s, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_legacy_naive_format() {
        let dt = parse("2024-01-31T10:15:00.123456").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 31, 10, 15, 0).unwrap() + chrono::Duration::microseconds(123_456));
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse("2024-01-31T12:15:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 31, 10, 15, 0).unwrap());
    }

    #[test]
    fn test_sub_second_precision_survives() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap().with_nanosecond(987_654_321).unwrap();
        let text = format(&dt);
        assert_eq!(text, "2024-05-01T08:00:00.987654321Z");
        assert_eq!(parse(&text).unwrap(), dt);
    }

    #[test]
    fn test_whole_seconds_have_no_fraction() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(format(&dt), "2024-05-01T08:00:00Z");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse("yesterday").is_err());
    }
}
