//! Integration tests for tikboard-common crate.

use chrono::NaiveDate;
use tikboard_common::{
    date_axis, normalize_url, parse_count, rate_percent, AccountId, DashError, DateRange, Metric,
    MetricValues, ReportedDiffs,
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_account_id_display_matches_canonical_form() {
    let id = AccountId::parse("7301234567.0").unwrap();
    assert_eq!(format!("{id}"), "7301234567");
}

#[test]
fn test_metric_columns_line_up() {
    for metric in Metric::ALL {
        let stem = metric.count_column().trim_end_matches("_count");
        assert_eq!(metric.diff_column(), format!("{stem}_diff"));
    }
}

#[test]
fn test_reported_diffs_override_only_present_metrics() {
    let mut reported = ReportedDiffs::default();
    reported.set(Metric::Shares, Some(9));
    let computed = MetricValues { views: 1, likes: 2, comments: 3, shares: 4, posts: 5 };
    let out = reported.or_computed(computed);
    assert_eq!(out.shares, 9);
    assert_eq!(out.views, 1);
    assert_eq!(out.posts, 5);
}

#[test]
fn test_date_axis_respects_range_bounds() {
    let range = DateRange::between(ymd(2024, 1, 1), ymd(2024, 1, 3));
    let days: Vec<_> = date_axis(ymd(2023, 12, 30), ymd(2024, 1, 5))
        .filter(|d| range.contains(*d))
        .collect();
    assert_eq!(days, vec![ymd(2024, 1, 1), ymd(2024, 1, 2), ymd(2024, 1, 3)]);
}

#[test]
fn test_tracking_parameters_do_not_change_identity() {
    assert_eq!(
        normalize_url("https://insnap.ai/videos?utm_campaign=x"),
        normalize_url("http://insnap.ai/videos")
    );
}

#[test]
fn test_zero_denominator_is_not_an_error() {
    let clicks = parse_count("12");
    assert_eq!(clicks, 12);
    assert!(rate_percent(12.0, 0.0).abs() < f64::EPSILON);
}

#[test]
fn test_schema_mismatch_message() {
    let err = DashError::schema_mismatch("user_id", &["id".to_string(), "date".to_string()]);
    assert_eq!(
        err.to_string(),
        "Schema mismatch: expected column \"user_id\", found columns [\"id\", \"date\"]"
    );
}
