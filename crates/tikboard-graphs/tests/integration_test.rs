//! Integration tests for tikboard-graphs.

use tikboard_common::test_utils::{init_test_logging, ymd};
use tikboard_common::{AccountId, Metric, MetricValues, ReportedDiffs};
use tikboard_config::ChartSettings;
use tikboard_data::{IncrementAggregator, IncrementQuery, MergedRow, MergedTable};
use tikboard_graphs::{daily_increment_series, group_increment_series, ChartInputs, ChartRanges, DashboardCharts};

fn merged() -> MergedTable {
    let row = |id: &str, group: &str, day: u32, views: i64| MergedRow {
        account_id: AccountId::parse(id).unwrap(),
        date: ymd(2024, 1, day),
        group: group.to_string(),
        matched: true,
        counts: MetricValues {
            views,
            ..MetricValues::default()
        },
        reported: ReportedDiffs::default(),
    };
    MergedTable::from_rows(vec![
        row("A", "dance", 1, 100),
        row("A", "dance", 4, 160),
        row("B", "music", 2, 10),
        row("B", "music", 3, 30),
    ])
}

#[test]
fn test_series_follow_the_completed_axis() {
    init_test_logging();
    let aggregator = IncrementAggregator::new(&merged());
    let query = IncrementQuery::new();

    let daily = aggregator.daily_increments(&query);
    let series = daily_increment_series(&daily, Metric::Views);
    assert_eq!(series.points.len(), 4);
    assert_eq!(series.points[2].value, 20.0);

    let groups = group_increment_series(&aggregator.group_daily_increments(&query), Metric::Views);
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|s| s.points.len() == 4));

    let ranges = ChartRanges::from_series(&groups).unwrap();
    assert_eq!(ranges.origin, ymd(2024, 1, 1));
    assert!(ranges.y_max > 60.0);
}

#[test]
fn test_plan_from_aggregates() {
    let aggregator = IncrementAggregator::new(&merged());
    let query = IncrementQuery::new();
    let daily = aggregator.daily_increments(&query);
    let groups = aggregator.group_daily_increments(&query);

    let charts = DashboardCharts::new(ChartSettings::default(), "output/charts");
    let jobs = charts.plan(
        &ChartInputs {
            daily: &daily,
            groups: &groups,
            ..ChartInputs::default()
        },
        Metric::Views,
    );
    assert_eq!(jobs.len(), 2);
    assert!(jobs[1].path.ends_with("groups_views.png"));
    assert_eq!(jobs[1].series.len(), 2);
}
