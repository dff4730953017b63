use std::collections::HashMap;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Endpoint;

// ---------------------------------------------------------------------------
// Fetch log entry (JSONL)
// ---------------------------------------------------------------------------

/// A single dashboard fetch in `~/.melanalytics/fetch-log.jsonl`.
///
/// Never holds credentials: only which endpoint was called, how it ended and
/// how long it took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: String,
    /// Request path, e.g. `/dashboard/stats`.
    pub endpoint: String,
    /// `"ok"`, or the failure kind (`"timeout"`, `"transport"`, `"status"`, ...).
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<u16>,
    pub latency_ms: u64,
}

/// Record one fetch. Best-effort; write failures are ignored.
pub fn log_fetch(
    path: &Path,
    endpoint: Endpoint,
    outcome: &str,
    status: Option<u16>,
    latency_ms: u64,
) {
    let entry = FetchLogEntry {
        timestamp: Utc::now().to_rfc3339(),
        endpoint: endpoint.path().to_string(),
        outcome: outcome.to_string(),
        status,
        latency_ms,
    };
    let _ = append_entry(path, &entry);
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every entry, skipping malformed lines. Missing file → empty.
pub fn read_entries(path: &Path) -> Vec<FetchLogEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<FetchLogEntry>(&line).ok())
        .collect()
}

/// Per-endpoint roll-up of the fetch log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointSummary {
    pub calls: usize,
    pub failures: usize,
    pub avg_latency_ms: u64,
    /// Outcome of the most recent failed call, if any.
    pub last_failure: Option<String>,
}

/// Summarize entries by endpoint path.
pub fn summarize(entries: &[FetchLogEntry]) -> HashMap<String, EndpointSummary> {
    let mut latency_sums: HashMap<&str, u64> = HashMap::new();
    let mut out: HashMap<String, EndpointSummary> = HashMap::new();

    for entry in entries {
        let summary = out.entry(entry.endpoint.clone()).or_default();
        summary.calls += 1;
        if entry.outcome != "ok" {
            summary.failures += 1;
            summary.last_failure = Some(entry.outcome.clone());
        }
        *latency_sums.entry(entry.endpoint.as_str()).or_default() += entry.latency_ms;
    }

    for (endpoint, summary) in out.iter_mut() {
        let sum = latency_sums.get(endpoint.as_str()).copied().unwrap_or(0);
        summary.avg_latency_ms = sum / summary.calls.max(1) as u64;
    }

    out
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_entry(path: &Path, entry: &FetchLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Default location of the fetch log.
pub fn fetch_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".melanalytics").join("fetch-log.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fetch-log.jsonl");

        log_fetch(&path, Endpoint::Stats, "ok", Some(200), 12);
        log_fetch(&path, Endpoint::Activity, "timeout", None, 30_000);

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].endpoint, "/dashboard/stats");
        assert_eq!(entries[0].status, Some(200));
        assert_eq!(entries[1].outcome, "timeout");
        assert_eq!(entries[1].status, None);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_entries(&dir.path().join("absent.jsonl")).is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch-log.jsonl");
        fs::write(
            &path,
            "not json\n{\"timestamp\":\"t\",\"endpoint\":\"/dashboard/stats\",\"outcome\":\"ok\",\"latency_ms\":5}\n",
        )
        .unwrap();
        assert_eq!(read_entries(&path).len(), 1);
    }

    #[test]
    fn summarize_counts_failures_and_latency() {
        let entry = |endpoint: &str, outcome: &str, latency_ms: u64| FetchLogEntry {
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            endpoint: endpoint.to_string(),
            outcome: outcome.to_string(),
            status: None,
            latency_ms,
        };
        let entries = vec![
            entry("/dashboard/stats", "ok", 10),
            entry("/dashboard/stats", "decode", 30),
            entry("/dashboard/user_activity", "ok", 5),
        ];

        let summary = summarize(&entries);
        let stats = &summary["/dashboard/stats"];
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.avg_latency_ms, 20);
        assert_eq!(stats.last_failure.as_deref(), Some("decode"));

        let activity = &summary["/dashboard/user_activity"];
        assert_eq!(activity.failures, 0);
        assert_eq!(activity.last_failure, None);
    }
}
