//! Measurement records as delivered by the ingestion layer
//!
//! A record carries an untyped metrics payload whose shape depends on the
//! device and its firmware version. The engine never mutates records.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A single test result for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Record identifier from the source system
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Athlete (entity) the result belongs to
    #[serde(alias = "entityId", alias = "athlete_id", alias = "athleteId")]
    pub entity_id: String,

    /// ISO-8601 timestamp, any offset; normalized to UTC
    #[serde(alias = "recordedAt", alias = "test_date", alias = "testDate")]
    pub recorded_at: DateTime<Utc>,

    /// Raw device-specific test label
    #[serde(alias = "testType")]
    pub test_type: String,

    /// Optional sub-test name (e.g. the frame rig position)
    #[serde(
        default,
        alias = "subTest",
        alias = "test_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub_test: Option<String>,

    /// Untyped payload: an object, or a JSON-encoded string of one
    #[serde(default)]
    pub metrics: Value,
}

impl Measurement {
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        recorded_at: DateTime<Utc>,
        test_type: impl Into<String>,
        metrics: Value,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            recorded_at,
            test_type: test_type.into(),
            sub_test: None,
            metrics,
        }
    }

    pub fn with_sub_test(mut self, sub_test: impl Into<String>) -> Self {
        self.sub_test = Some(sub_test.into());
        self
    }
}

/// Load a measurement snapshot (a JSON array of records) from disk
pub fn load_measurements<P: AsRef<Path>>(path: P) -> Result<Vec<Measurement>> {
    let content = fs::read_to_string(path.as_ref()).with_context(|| {
        format!(
            "Failed to read measurements file: {}",
            path.as_ref().display()
        )
    })?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse measurements JSON: {}",
            path.as_ref().display()
        )
    })
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_deserialize_camel_case_record() {
        let record: Measurement = serde_json::from_value(json!({
            "id": 42,
            "athleteId": "a-1",
            "recordedAt": "2024-03-05T23:30:00+10:00",
            "testType": "CMJ",
            "metrics": {"JUMP_HEIGHT": 38.2}
        }))
        .unwrap();

        assert_eq!(record.id, "42");
        assert_eq!(record.entity_id, "a-1");
        assert_eq!(
            record.recorded_at,
            Utc.with_ymd_and_hms(2024, 3, 5, 13, 30, 0).unwrap()
        );
        assert_eq!(record.sub_test, None);
    }

    #[test]
    fn test_string_metrics_payload_is_kept_verbatim() {
        let record: Measurement = serde_json::from_value(json!({
            "id": "m1",
            "entity_id": "a-1",
            "recorded_at": "2024-03-05T08:00:00Z",
            "test_type": "Nordic",
            "metrics": "{\"leftMaxForce\": 310}"
        }))
        .unwrap();

        assert!(record.metrics.is_string());
    }

    #[test]
    fn test_missing_metrics_defaults_to_null() {
        let record: Measurement = serde_json::from_value(json!({
            "id": "m1",
            "entity_id": "a-1",
            "recorded_at": "2024-03-05T08:00:00Z",
            "test_type": "Nordic"
        }))
        .unwrap();

        assert!(record.metrics.is_null());
    }

    #[test]
    fn test_rejects_object_id() {
        let result: std::result::Result<Measurement, _> = serde_json::from_value(json!({
            "id": {"nested": true},
            "entity_id": "a-1",
            "recorded_at": "2024-03-05T08:00:00Z",
            "test_type": "CMJ"
        }));
        assert!(result.is_err());
    }
}
