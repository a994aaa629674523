//! Fixed timestamp format for persisted records
//!
//! Every stored timestamp is UTC at second precision, rendered as
//! `YYYY-MM-DDTHH:MM:SSZ`. Session identifiers derive from the same clock so
//! they sort chronologically by plain string comparison.

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{self, Deserialize, Deserializer, Serializer};

/// Wire format for all persisted timestamps
pub const SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Current UTC time truncated to whole seconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Render a timestamp in the fixed wire format
pub fn format(dt: &DateTime<Utc>) -> String {
    dt.format(SECOND_FORMAT).to_string()
}

/// Parse a timestamp in the fixed wire format
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, SECOND_FORMAT).map(|naive| Utc.from_utc_datetime(&naive))
}

/// Serde adapter for `#[serde(with = "crate::timefmt")]` fields
pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(dt))
}

/// Serde adapter for `#[serde(with = "crate::timefmt")]` fields
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse(&value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_format_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 2).unwrap();
        let rendered = format(&dt);
        assert_eq!(rendered, "2024-03-05T14:07:02Z");
        assert_eq!(parse(&rendered).unwrap(), dt);
    }

    #[test]
    fn test_now_is_second_precision() {
        assert_eq!(now().nanosecond(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("not-a-timestamp").is_err());
        assert!(parse("2024-03-05 14:07:02").is_err());
    }
}
