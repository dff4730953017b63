//! One fetch-and-render pass of the dashboard.
//!
//! A pass is gated on the session, fetches stats and activity in parallel,
//! normalizes both, and assembles a [`DashboardView`]. The two endpoints are
//! independent: a failure in one still renders the other, and every failure
//! is collected so the operator sees them together.

use std::thread;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::analytics::logger;
use crate::client::DashboardApi;
use crate::daterange::DateRange;
use crate::error::{DecodeError, Endpoint, FetchError, combine_messages};
use crate::merge::{MergedActivityRow, merge_activity};
use crate::metrics::{CategoryShare, analysis_rate, distribution_shares, format_rate};
use crate::normalize::{ActivitySeries, StatsSnapshot, normalize_activity, normalize_stats};
use crate::session::Session;

/// Placeholder for a KPI whose source data is unavailable.
pub const NOT_AVAILABLE: &str = "N/A";

/// No token in the session: redirect to login, fetch nothing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Please login first")]
pub struct NotAuthenticated;

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

/// KPIs, distributions and their derived figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsPanel {
    pub snapshot: StatsSnapshot,
    pub analysis_rate: f64,
    /// `analysis_rate` with one decimal digit, e.g. `"25.0%"`.
    pub analysis_rate_display: String,
    pub body_part_shares: Vec<CategoryShare>,
    pub risk_shares: Vec<CategoryShare>,
}

impl StatsPanel {
    pub fn from_snapshot(snapshot: StatsSnapshot) -> Self {
        let rate = analysis_rate(snapshot.total_analyses, snapshot.total_images);
        Self {
            analysis_rate: rate,
            analysis_rate_display: format_rate(rate),
            body_part_shares: distribution_shares(&snapshot.body_part_distribution),
            risk_shares: distribution_shares(&snapshot.risk_distribution),
            snapshot,
        }
    }
}

/// The merged daily activity chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPanel {
    /// The `days` parameter sent to the activity endpoint.
    pub days: i64,
    pub rows: Vec<MergedActivityRow>,
    /// Source entries dropped for an unreadable date.
    pub skipped_entries: usize,
}

impl ActivityPanel {
    pub fn from_series(series: &ActivitySeries, days: i64) -> Self {
        Self {
            days,
            rows: merge_activity(&series.daily_uploads, &series.daily_analyses),
            skipped_entries: series.skipped,
        }
    }

    /// No activity at all in the period (as opposed to unavailable data).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything one render shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub range: DateRange,
    /// `None` when the stats endpoint failed.
    pub stats: Option<StatsPanel>,
    /// `None` when the activity endpoint failed.
    pub activity: Option<ActivityPanel>,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<FetchError>,
}

impl DashboardView {
    /// All failures of this pass as one itemized message.
    pub fn combined_error(&self) -> Option<String> {
        combine_messages(&self.errors)
    }

    /// Whether the service rejected the token during this pass.
    pub fn token_rejected(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, FetchError::Unauthorized { .. }))
    }

    /// Display value of a KPI, or `"N/A"` when stats are unavailable.
    pub fn kpi(&self, pick: impl Fn(&StatsSnapshot) -> i64) -> String {
        self.stats
            .as_ref()
            .map(|panel| pick(&panel.snapshot).to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

fn serialize_errors<S: serde::Serializer>(
    errors: &[FetchError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(errors.len()))?;
    for e in errors {
        seq.serialize_element(&serde_json::json!({
            "endpoint": e.endpoint(),
            "kind": e.kind(),
            "message": e.to_string(),
        }))?;
    }
    seq.end()
}

// ---------------------------------------------------------------------------
// Render pass
// ---------------------------------------------------------------------------

/// Run one render pass.
///
/// Returns [`NotAuthenticated`] without touching the network when the session
/// has no token. If the service rejects the token, the session is logged out
/// so the next interaction lands on the login screen.
pub fn render_pass(
    api: &impl DashboardApi,
    session: &mut Session,
    range: DateRange,
) -> Result<DashboardView, NotAuthenticated> {
    let token = session.current_token().ok_or(NotAuthenticated)?.clone();
    let days = range.days_in_range();

    let (stats_result, activity_result) = thread::scope(|s| {
        let stats = s.spawn(|| {
            fetch_decoded(api, Endpoint::Stats, normalize_stats, || {
                api.fetch_stats(&token, &range)
            })
        });
        let activity = fetch_decoded(api, Endpoint::Activity, normalize_activity, || {
            api.fetch_activity(&token, days)
        });
        (join_fetch(Endpoint::Stats, stats), activity)
    });

    let mut errors = Vec::new();

    let stats = match stats_result {
        Ok(snapshot) => Some(StatsPanel::from_snapshot(snapshot)),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let activity = match activity_result {
        Ok(series) => Some(ActivityPanel::from_series(&series, days)),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let view = DashboardView {
        range,
        stats,
        activity,
        errors,
    };

    if view.token_rejected() {
        session.logout();
    }

    Ok(view)
}

/// Fetch one endpoint and normalize its body, recording the outcome in the
/// fetch log once decoding is known.
fn fetch_decoded<A, T>(
    api: &A,
    endpoint: Endpoint,
    normalize: fn(&str) -> Result<T, DecodeError>,
    fetch: impl FnOnce() -> Result<String, FetchError>,
) -> Result<T, FetchError>
where
    A: DashboardApi + ?Sized,
{
    let started = Instant::now();
    let result = fetch().and_then(|body| {
        normalize(&body).map_err(|source| FetchError::Decode { endpoint, source })
    });

    if let Some(path) = api.fetch_log() {
        let (outcome, status) = match &result {
            Ok(_) => ("ok", None),
            Err(FetchError::Status { status, .. }) => ("status", Some(*status)),
            Err(FetchError::Unauthorized { .. }) => ("unauthorized", Some(401)),
            Err(e) => (e.kind(), None),
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        logger::log_fetch(path, endpoint, outcome, status, latency_ms);
    }

    result
}

/// Join a fetch thread; a panicked fetch counts as a transport failure.
fn join_fetch<T>(
    endpoint: Endpoint,
    handle: thread::ScopedJoinHandle<'_, Result<T, FetchError>>,
) -> Result<T, FetchError> {
    handle.join().unwrap_or_else(|_| {
        Err(FetchError::Transport {
            endpoint,
            detail: "request thread panicked".to_string(),
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::session::{Authenticate, BearerToken};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeApi {
        stats: Result<String, FetchError>,
        activity: Result<String, FetchError>,
        calls: AtomicUsize,
        log: Option<std::path::PathBuf>,
    }

    impl FakeApi {
        fn new(stats: Result<&str, FetchError>, activity: Result<&str, FetchError>) -> Self {
            Self {
                stats: stats.map(str::to_string),
                activity: activity.map(str::to_string),
                calls: AtomicUsize::new(0),
                log: None,
            }
        }
    }

    impl DashboardApi for FakeApi {
        fn fetch_stats(&self, _: &BearerToken, _: &DateRange) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.stats.clone()
        }

        fn fetch_activity(&self, _: &BearerToken, _: i64) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.activity.clone()
        }

        fn fetch_log(&self) -> Option<&std::path::Path> {
            self.log.as_deref()
        }
    }

    struct AcceptAll;

    impl Authenticate for AcceptAll {
        fn authenticate(&self, _: &str, _: &str) -> Result<BearerToken, AuthError> {
            Ok(BearerToken::new("t"))
        }
    }

    fn logged_in() -> Session {
        let mut session = Session::new();
        session.login(&AcceptAll, "alice", "pw").unwrap();
        session
    }

    fn range() -> DateRange {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        DateRange::new(d(1), d(7)).unwrap()
    }

    #[test]
    fn anonymous_session_fetches_nothing() {
        let api = FakeApi::new(Ok("{}"), Ok("{}"));
        let mut session = Session::new();
        assert_eq!(
            render_pass(&api, &mut session, range()),
            Err(NotAuthenticated)
        );
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn full_success_renders_both_panels() {
        let api = FakeApi::new(
            Ok(r#"{"total_images": 200, "total_analyses": 50, "total_users": 4}"#),
            Ok(r#"{"daily_uploads": [{"_id": "2024-01-01", "uploads": 3}], "daily_analyses": []}"#),
        );
        let view = render_pass(&api, &mut logged_in(), range()).unwrap();

        let stats = view.stats.as_ref().unwrap();
        assert_eq!(stats.analysis_rate, 25.0);
        assert_eq!(stats.analysis_rate_display, "25.0%");
        assert_eq!(view.kpi(|s| s.total_users), "4");

        let activity = view.activity.as_ref().unwrap();
        assert_eq!(activity.days, 7);
        assert_eq!(activity.rows.len(), 1);
        assert_eq!(activity.rows[0].uploads, 3);
        assert_eq!(activity.rows[0].analyses, 0);

        assert!(view.errors.is_empty());
        assert_eq!(view.combined_error(), None);
    }

    #[test]
    fn error_sentinel_guards_rate() {
        let api = FakeApi::new(
            Ok(r#"{"total_images": "Error", "total_analyses": 5}"#),
            Ok("{}"),
        );
        let view = render_pass(&api, &mut logged_in(), range()).unwrap();
        let stats = view.stats.unwrap();
        assert_eq!(stats.snapshot.total_images, 0);
        assert_eq!(stats.snapshot.total_analyses, 5);
        assert_eq!(stats.analysis_rate, 0.0);
    }

    #[test]
    fn partial_failure_still_renders_other_panel() {
        let api = FakeApi::new(
            Err(FetchError::Timeout {
                endpoint: Endpoint::Stats,
            }),
            Ok(r#"{"daily_analyses": [{"_id": "2024-01-02", "analyses": 1}]}"#),
        );
        let view = render_pass(&api, &mut logged_in(), range()).unwrap();

        assert!(view.stats.is_none());
        assert_eq!(view.kpi(|s| s.total_images), NOT_AVAILABLE);
        assert_eq!(view.activity.as_ref().unwrap().rows.len(), 1);
        assert_eq!(view.errors.len(), 1);
    }

    #[test]
    fn both_failures_are_combined() {
        let api = FakeApi::new(
            Ok("not json"),
            Err(FetchError::Transport {
                endpoint: Endpoint::Activity,
                detail: "connection refused".to_string(),
            }),
        );
        let view = render_pass(&api, &mut logged_in(), range()).unwrap();

        assert!(view.stats.is_none());
        assert!(view.activity.is_none());
        let msg = view.combined_error().unwrap();
        assert!(msg.contains("/dashboard/stats"));
        assert!(msg.contains("not json"));
        assert!(msg.contains("/dashboard/user_activity"));
    }

    #[test]
    fn rejected_token_logs_out() {
        let api = FakeApi::new(
            Err(FetchError::Unauthorized {
                endpoint: Endpoint::Stats,
            }),
            Ok("{}"),
        );
        let mut session = logged_in();
        let view = render_pass(&api, &mut session, range()).unwrap();
        assert!(view.token_rejected());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn empty_activity_is_not_an_error() {
        let api = FakeApi::new(Ok("{}"), Ok(r#"{"daily_uploads": [], "daily_analyses": []}"#));
        let view = render_pass(&api, &mut logged_in(), range()).unwrap();
        assert!(view.activity.unwrap().is_empty());
        assert!(view.errors.is_empty());
    }

    #[test]
    fn view_serializes_errors_as_messages() {
        let api = FakeApi::new(
            Err(FetchError::Timeout {
                endpoint: Endpoint::Stats,
            }),
            Ok("{}"),
        );
        let view = render_pass(&api, &mut logged_in(), range()).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["errors"][0]["endpoint"], "stats");
        assert_eq!(json["errors"][0]["kind"], "timeout");
        assert!(json["stats"].is_null());
        assert_eq!(json["range"]["start"], "2024-01-01");
    }

    #[test]
    fn fetch_log_records_outcome_after_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch-log.jsonl");
        let mut api = FakeApi::new(
            Ok("Error"),
            Err(FetchError::Status {
                endpoint: Endpoint::Activity,
                status: 503,
                body: String::new(),
            }),
        );
        api.log = Some(path.clone());

        render_pass(&api, &mut logged_in(), range()).unwrap();

        let summary = logger::summarize(&logger::read_entries(&path));
        let stats = &summary["/dashboard/stats"];
        assert_eq!(stats.calls, 1);
        assert_eq!(stats.last_failure.as_deref(), Some("decode"));
        let activity = &summary["/dashboard/user_activity"];
        assert_eq!(activity.last_failure.as_deref(), Some("status"));

        let entries = logger::read_entries(&path);
        let status = entries
            .iter()
            .find(|e| e.endpoint == "/dashboard/user_activity")
            .and_then(|e| e.status);
        assert_eq!(status, Some(503));
    }
}
