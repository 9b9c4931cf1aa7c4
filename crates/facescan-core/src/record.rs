//! Scan log entries and their on-disk timestamp format.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One saved face, as recorded in the scan log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub face_id: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    pub filepath: String,
    /// Absent when the detector gave no score. Both an omitted field and
    /// `null` deserialize to `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ScanRecord {
    pub fn new(
        face_id: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
        filepath: &Path,
        confidence: Option<f32>,
    ) -> Self {
        Self {
            face_id: face_id.into(),
            timestamp,
            filepath: filepath.to_string_lossy().into_owned(),
            confidence,
        }
    }
}

/// ISO-8601 timestamps.
///
/// Written as RFC 3339 with the UTC offset. Offset-less datetimes (as some
/// older logs contain) are read back in local time.
pub mod timestamp {
    use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<FixedOffset>) -> String {
        ts.to_rfc3339()
    }

    pub fn parse(s: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Some(ts);
        }
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|ts| ts.fixed_offset())
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<FixedOffset>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn sample(confidence: Option<f32>) -> ScanRecord {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T14:22:10.250+01:00").unwrap();
        ScanRecord::new(
            "face_1a2b3c4d_1709644930250_0000",
            ts,
            Path::new("face_data/scanned_faces/a.jpg"),
            confidence,
        )
    }

    #[test]
    fn test_absent_confidence_is_omitted() {
        let json = serde_json::to_string(&sample(None)).unwrap();
        assert!(!json.contains("confidence"), "{json}");
    }

    #[test]
    fn test_present_confidence_is_written() {
        let json = serde_json::to_value(sample(Some(0.87))).unwrap();
        assert!((json["confidence"].as_f64().unwrap() - 0.87).abs() < 1e-6);
        assert_eq!(json["timestamp"], "2024-03-05T14:22:10.250+01:00");
    }

    #[test]
    fn test_null_and_missing_confidence_read_as_none() {
        let with_null = r#"{"face_id":"f","timestamp":"2024-03-05T14:22:10+00:00","filepath":"p","confidence":null}"#;
        let without = r#"{"face_id":"f","timestamp":"2024-03-05T14:22:10+00:00","filepath":"p"}"#;
        assert_eq!(serde_json::from_str::<ScanRecord>(with_null).unwrap().confidence, None);
        assert_eq!(serde_json::from_str::<ScanRecord>(without).unwrap().confidence, None);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"face_id":"f","timestamp":"2024-03-05T14:22:10+00:00","filepath":"p","confidence":null,"scan_number":7}"#;
        let record: ScanRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.face_id, "f");
    }

    #[test]
    fn test_naive_timestamp_read_as_local() {
        let parsed = timestamp::parse("2024-03-05T14:22:10.123456").unwrap();
        let expected = Local.with_ymd_and_hms(2024, 3, 5, 14, 22, 10).earliest().unwrap();
        assert_eq!(parsed.timestamp(), expected.timestamp());
        assert_eq!(parsed.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let json = r#"{"face_id":"f","timestamp":"yesterday","filepath":"p"}"#;
        assert!(serde_json::from_str::<ScanRecord>(json).is_err());
    }
}
