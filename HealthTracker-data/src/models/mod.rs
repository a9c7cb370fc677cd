//! Storage models for users, devices and health measurements.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

pub mod device;
pub mod health_data;
pub mod user;

pub use device::{Device, DeviceType};
pub use health_data::{DataType, HealthData};
pub use user::{User, UserRole};

/// Error returned when a stored or submitted label does not name a known variant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Name of the enum that failed to parse
    pub kind: &'static str,
    /// The offending label
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Format a timestamp for storage.
///
/// Fixed-width nanosecond RFC 3339 in UTC, so that comparing the stored text
/// orders the same way as comparing the instants.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a timestamp previously written by [`format_timestamp`]
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_timestamp_round_trip_keeps_nanoseconds() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap() + Duration::nanoseconds(123_456_789);
        let stored = format_timestamp(&ts);
        assert_eq!(stored, "2024-03-01T08:30:00.123456789Z");
        assert_eq!(parse_timestamp(&stored).unwrap(), ts);
    }

    #[test]
    fn test_stored_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let later = earlier + Duration::milliseconds(1);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
    }
}
