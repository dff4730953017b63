//! Derived KPI metrics.

use serde::Serialize;

use crate::normalize::CategoryCount;

/// Percentage of uploaded images that have been analysed.
///
/// Returns `0.0` when there are no images; a zero denominator is a normal
/// state for an empty date range, not an error.
pub fn analysis_rate(total_analyses: i64, total_images: i64) -> f64 {
    if total_images > 0 {
        total_analyses as f64 / total_images as f64 * 100.0
    } else {
        0.0
    }
}

/// Render a percentage with exactly one decimal digit, e.g. `25.0%`.
pub fn format_rate(rate: f64) -> String {
    format!("{rate:.1}%")
}

/// A distribution slice with its share of the distribution total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub label: String,
    pub count: i64,
    pub pct: f64,
}

/// Share of each category in its own distribution.
///
/// Computed against the sum of the listed counts, not `total_analyses`,
/// because the service does not guarantee the two agree. Negative counts
/// do not contribute to the total, and the total saturates at `i64::MAX`.
pub fn distribution_shares(categories: &[CategoryCount]) -> Vec<CategoryShare> {
    let total = categories
        .iter()
        .fold(0i64, |acc, c| acc.saturating_add(c.count.max(0)));

    categories
        .iter()
        .map(|c| CategoryShare {
            label: c.label.clone(),
            count: c.count,
            pct: if total == 0 {
                0.0
            } else {
                c.count.max(0) as f64 / total as f64 * 100.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(label: &str, count: i64) -> CategoryCount {
        CategoryCount {
            label: label.to_string(),
            count,
            unspecified: false,
        }
    }

    #[test]
    fn rate_guards_zero_images() {
        assert_eq!(analysis_rate(0, 0), 0.0);
        assert_eq!(analysis_rate(5, 0), 0.0);
    }

    #[test]
    fn rate_is_a_percentage() {
        assert_eq!(analysis_rate(50, 200), 25.0);
        assert_eq!(analysis_rate(3, 3), 100.0);
    }

    #[test]
    fn format_rate_one_decimal() {
        assert_eq!(format_rate(25.0), "25.0%");
        assert_eq!(format_rate(0.0), "0.0%");
        assert_eq!(format_rate(analysis_rate(1, 3)), "33.3%");
    }

    #[test]
    fn shares_sum_to_hundred() {
        let shares = distribution_shares(&[cat("low", 1), cat("high", 3)]);
        assert_eq!(shares[0].pct, 25.0);
        assert_eq!(shares[1].pct, 75.0);
    }

    #[test]
    fn shares_of_empty_total_are_zero() {
        let shares = distribution_shares(&[cat("low", 0)]);
        assert_eq!(shares[0].pct, 0.0);
        assert!(distribution_shares(&[]).is_empty());
    }

    #[test]
    fn shares_saturate_on_huge_counts() {
        let shares = distribution_shares(&[cat("a", i64::MAX), cat("b", 1), cat("c", -4)]);
        assert_eq!(shares[0].pct, 100.0);
        assert!(shares[1].pct >= 0.0 && shares[1].pct < 1e-9);
        assert_eq!(shares[2].pct, 0.0);
        assert!(shares.iter().all(|s| s.pct.is_finite()));
    }
}
