//! Response normalizer: raw dashboard JSON into typed snapshots.
//!
//! Sits between wire decoding and everything else: no untyped
//! `serde_json::Value` leaves this module. Missing or malformed fields are
//! filled with safe defaults silently, since partial data from the service is
//! normal. Only a body that is not a JSON object at all is reported, as a
//! [`DecodeError`], so the caller can tell "zero activity" from "data
//! unavailable".

pub mod dates;
pub mod numeric;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;

pub use dates::parse_date_token;
pub use numeric::{FloatStrings, safe_numeric_get, safe_numeric_get_with};

// ---------------------------------------------------------------------------
// Stats snapshot
// ---------------------------------------------------------------------------

/// Which distribution a category list belongs to.
///
/// Decides the label a null category id is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    BodyPart,
    Risk,
}

impl CategoryKind {
    /// Label substituted for a null category id.
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::BodyPart => "Not Specified",
            Self::Risk => "Unknown",
        }
    }
}

/// One slice of a distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: i64,
    /// The service sent a null id; `label` is the placeholder.
    pub unspecified: bool,
}

/// Aggregate KPIs and distributions from `/dashboard/stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_users: i64,
    pub total_images: i64,
    pub total_analyses: i64,
    pub body_part_distribution: Vec<CategoryCount>,
    pub risk_distribution: Vec<CategoryCount>,
}

/// Normalize a `/dashboard/stats` response body.
pub fn normalize_stats(body: &str) -> Result<StatsSnapshot, DecodeError> {
    let map = decode_object(body)?;
    Ok(stats_from_map(&map))
}

/// Build a snapshot from an already-decoded object.
pub fn stats_from_map(map: &Map<String, Value>) -> StatsSnapshot {
    StatsSnapshot {
        total_users: safe_numeric_get(map, "total_users", 0),
        total_images: safe_numeric_get(map, "total_images", 0),
        total_analyses: safe_numeric_get(map, "total_analyses", 0),
        body_part_distribution: category_counts(
            list_field(map, "body_part_distribution"),
            CategoryKind::BodyPart,
        ),
        risk_distribution: category_counts(list_field(map, "risk_distribution"), CategoryKind::Risk),
    }
}

/// Normalize a distribution list, relabeling null ids for `kind`.
///
/// Entries that are not JSON objects carry no usable category and are
/// skipped.
pub fn category_counts(entries: &[Value], kind: CategoryKind) -> Vec<CategoryCount> {
    entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let id = entry.get("_id").or_else(|| entry.get("id"));
            let (label, unspecified) = match id {
                None | Some(Value::Null) => (kind.placeholder().to_string(), true),
                Some(Value::String(s)) => (s.clone(), false),
                Some(other) => (other.to_string(), false),
            };
            CategoryCount {
                label,
                count: safe_numeric_get(entry, "count", 0),
                unspecified,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Activity series
// ---------------------------------------------------------------------------

/// A count attached to one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatedCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Daily uploads and analyses from `/dashboard/user_activity`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivitySeries {
    pub daily_uploads: Vec<DatedCount>,
    pub daily_analyses: Vec<DatedCount>,
    /// Entries dropped because their date key could not be parsed.
    pub skipped: usize,
}

/// Normalize a `/dashboard/user_activity` response body.
pub fn normalize_activity(body: &str) -> Result<ActivitySeries, DecodeError> {
    let map = decode_object(body)?;
    Ok(activity_from_map(&map))
}

/// Build an activity series from an already-decoded object.
pub fn activity_from_map(map: &Map<String, Value>) -> ActivitySeries {
    let (daily_uploads, skipped_uploads) = dated_counts(list_field(map, "daily_uploads"), "uploads");
    let (daily_analyses, skipped_analyses) =
        dated_counts(list_field(map, "daily_analyses"), "analyses");

    ActivitySeries {
        daily_uploads,
        daily_analyses,
        skipped: skipped_uploads + skipped_analyses,
    }
}

/// Parse `{ "_id": <date>, <count_key>: n }` entries.
///
/// Returns the parsed entries in input order and the number skipped.
pub fn dated_counts(entries: &[Value], count_key: &str) -> (Vec<DatedCount>, usize) {
    let mut out = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for entry in entries {
        let parsed = entry.as_object().and_then(|obj| {
            let date = obj
                .get("_id")
                .or_else(|| obj.get("date"))
                .and_then(Value::as_str)
                .and_then(parse_date_token)?;
            Some(DatedCount {
                date,
                count: safe_numeric_get(obj, count_key, 0),
            })
        });

        match parsed {
            Some(dc) => out.push(dc),
            None => skipped += 1,
        }
    }

    (out, skipped)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode a body that must be a JSON object.
fn decode_object(body: &str) -> Result<Map<String, Value>, DecodeError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| DecodeError::new(e.to_string(), body))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::new(
            format!("expected a JSON object, got {}", json_type_name(&other)),
            body,
        )),
    }
}

/// A list field, or an empty slice when absent or not an array.
fn list_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn stats_with_error_sentinel_defaults_to_zero() {
        let snap = normalize_stats(r#"{"total_images": "Error", "total_analyses": 5}"#).unwrap();
        assert_eq!(snap.total_images, 0);
        assert_eq!(snap.total_analyses, 5);
        assert_eq!(snap.total_users, 0);
        assert!(snap.body_part_distribution.is_empty());
        assert!(snap.risk_distribution.is_empty());
    }

    #[test]
    fn empty_object_is_a_zero_snapshot_not_an_error() {
        let snap = normalize_stats("{}").unwrap();
        assert_eq!(snap, StatsSnapshot::default());
    }

    #[test]
    fn invalid_json_is_unavailable() {
        let err = normalize_stats("<html>502 Bad Gateway</html>").unwrap_err();
        assert_eq!(err.raw_body, "<html>502 Bad Gateway</html>");
    }

    #[test]
    fn non_object_top_level_is_unavailable() {
        let err = normalize_stats("[1, 2, 3]").unwrap_err();
        assert!(err.detail.contains("an array"));
        assert!(normalize_activity("null").is_err());
    }

    #[test]
    fn null_ids_are_relabeled_per_kind() {
        let body = r#"{
            "body_part_distribution": [{"_id": null, "count": 4}, {"_id": "back", "count": 2}],
            "risk_distribution": [{"_id": "high", "count": 1}, {"_id": null, "count": 3}]
        }"#;
        let snap = normalize_stats(body).unwrap();

        assert_eq!(snap.body_part_distribution[0].label, "Not Specified");
        assert!(snap.body_part_distribution[0].unspecified);
        assert_eq!(snap.body_part_distribution[0].count, 4);
        assert_eq!(snap.body_part_distribution[1].label, "back");

        assert_eq!(snap.risk_distribution[1].label, "Unknown");
        assert_eq!(snap.risk_distribution[1].count, 3);
    }

    #[test]
    fn missing_id_counts_as_unspecified() {
        let entries = vec![serde_json::json!({ "count": 9 })];
        let out = category_counts(&entries, CategoryKind::Risk);
        assert_eq!(out[0].label, "Unknown");
        assert!(out[0].unspecified);
    }

    #[test]
    fn numeric_ids_are_stringified_and_bad_counts_default() {
        let entries = vec![
            serde_json::json!({ "_id": 3, "count": "Error" }),
            serde_json::json!("not an entry"),
        ];
        let out = category_counts(&entries, CategoryKind::BodyPart);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "3");
        assert_eq!(out[0].count, 0);
    }

    #[test]
    fn distribution_field_of_wrong_type_is_empty() {
        let snap = normalize_stats(r#"{"risk_distribution": "Error"}"#).unwrap();
        assert!(snap.risk_distribution.is_empty());
    }

    #[test]
    fn activity_uses_source_specific_count_keys() {
        let body = r#"{
            "daily_uploads": [{"_id": "2024-01-01", "uploads": 3}],
            "daily_analyses": [{"_id": "2024-01-02", "analyses": 2, "uploads": 99}]
        }"#;
        let series = normalize_activity(body).unwrap();
        assert_eq!(
            series.daily_uploads,
            vec![DatedCount { date: d(2024, 1, 1), count: 3 }]
        );
        assert_eq!(
            series.daily_analyses,
            vec![DatedCount { date: d(2024, 1, 2), count: 2 }]
        );
        assert_eq!(series.skipped, 0);
    }

    #[test]
    fn activity_skips_undated_entries() {
        let body = r#"{
            "daily_uploads": [
                {"_id": "2024-01-01", "uploads": 1},
                {"_id": null, "uploads": 5},
                {"_id": "soon", "uploads": 5},
                42
            ]
        }"#;
        let series = normalize_activity(body).unwrap();
        assert_eq!(series.daily_uploads.len(), 1);
        assert!(series.daily_analyses.is_empty());
        assert_eq!(series.skipped, 3);
    }
}
