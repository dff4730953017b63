/// End-to-end checks of the decode → normalize → merge → metrics pipeline
/// on raw response bodies, without a network.
use chrono::NaiveDate;
use melanalytics::dashboard::{ActivityPanel, StatsPanel};
use melanalytics::merge::{merge_activity, totals};
use melanalytics::metrics::analysis_rate;
use melanalytics::normalize::{normalize_activity, normalize_stats};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn error_string_counts_default_to_zero() {
    let snapshot = normalize_stats(r#"{"total_images": "Error", "total_analyses": 5}"#).unwrap();
    assert_eq!(snapshot.total_images, 0);
    assert_eq!(snapshot.total_analyses, 5);
    assert_eq!(snapshot.total_users, 0);

    let panel = StatsPanel::from_snapshot(snapshot);
    assert_eq!(panel.analysis_rate, 0.0);
    assert_eq!(panel.analysis_rate_display, "0.0%");
}

#[test]
fn one_sided_activity_fills_zeroes() {
    let series = normalize_activity(
        r#"{"daily_uploads": [{"_id": "2024-01-01", "uploads": 3}], "daily_analyses": []}"#,
    )
    .unwrap();
    let panel = ActivityPanel::from_series(&series, 7);

    assert_eq!(panel.rows.len(), 1);
    assert_eq!(panel.rows[0].date, d(2024, 1, 1));
    assert_eq!(panel.rows[0].uploads, 3);
    assert_eq!(panel.rows[0].analyses, 0);
}

#[test]
fn mixed_date_formats_sort_chronologically() {
    let series = normalize_activity(
        r#"{
            "daily_uploads": [
                {"_id": "2024-10-02", "uploads": 1},
                {"_id": "2024/09/30", "uploads": 2}
            ],
            "daily_analyses": [
                {"_id": "2024-10-01T00:00:00Z", "analyses": 4},
                {"_id": "not a date", "analyses": 9}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(series.skipped, 1);

    let rows = merge_activity(&series.daily_uploads, &series.daily_analyses);
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, [d(2024, 9, 30), d(2024, 10, 1), d(2024, 10, 2)]);
    assert_eq!(totals(&rows), (3, 4));
}

#[test]
fn missing_everything_is_an_empty_snapshot() {
    let snapshot = normalize_stats("{}").unwrap();
    assert_eq!(snapshot.total_users, 0);
    assert!(snapshot.body_part_distribution.is_empty());
    assert!(snapshot.risk_distribution.is_empty());

    let series = normalize_activity(r#"{"daily_uploads": null}"#).unwrap();
    assert!(merge_activity(&series.daily_uploads, &series.daily_analyses).is_empty());
}

#[test]
fn undecodable_body_keeps_raw_text() {
    let err = normalize_stats("<html>502 Bad Gateway</html>").unwrap_err();
    assert_eq!(err.raw_body, "<html>502 Bad Gateway</html>");
    assert!(normalize_activity("[1, 2, 3]").is_err());
}

#[test]
fn huge_distribution_counts_render() {
    let snapshot = normalize_stats(
        r#"{"risk_distribution": [{"_id": "a", "count": 9223372036854775807}, {"_id": "b", "count": 1}]}"#,
    )
    .unwrap();
    assert_eq!(snapshot.risk_distribution[0].count, i64::MAX);

    let panel = StatsPanel::from_snapshot(snapshot);
    let pcts: Vec<f64> = panel.risk_shares.iter().map(|s| s.pct).collect();
    assert_eq!(pcts[0], 100.0);
    assert!(pcts[1] < 1e-9);
}

#[test]
fn analysis_rate_is_guarded() {
    assert_eq!(analysis_rate(5, 0), 0.0);
    assert!((analysis_rate(1, 3) - 33.333).abs() < 0.001);
}
