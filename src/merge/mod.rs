//! Series merger: outer join of the two daily activity series.
//!
//! The service returns uploads and analyses as independently grouped lists,
//! so either may have days the other lacks. The dual-line chart needs one
//! row per day with both counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::normalize::DatedCount;

/// One calendar day of combined activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergedActivityRow {
    pub date: NaiveDate,
    pub uploads: i64,
    pub analyses: i64,
}

/// Merge uploads and analyses on calendar date.
///
/// The result holds exactly one row per date present in either input, sorted
/// ascending. A date missing from one series gets 0 for that series. Repeated
/// dates within one input are summed.
pub fn merge_activity(uploads: &[DatedCount], analyses: &[DatedCount]) -> Vec<MergedActivityRow> {
    let mut days: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();

    for dc in uploads {
        let slot = days.entry(dc.date).or_default();
        slot.0 = slot.0.saturating_add(dc.count);
    }
    for dc in analyses {
        let slot = days.entry(dc.date).or_default();
        slot.1 = slot.1.saturating_add(dc.count);
    }

    days.into_iter()
        .map(|(date, (uploads, analyses))| MergedActivityRow {
            date,
            uploads,
            analyses,
        })
        .collect()
}

/// Column totals over a merged series: `(uploads, analyses)`.
pub fn totals(rows: &[MergedActivityRow]) -> (i64, i64) {
    rows.iter().fold((0, 0), |(u, a), row| {
        (u.saturating_add(row.uploads), a.saturating_add(row.analyses))
    })
}
