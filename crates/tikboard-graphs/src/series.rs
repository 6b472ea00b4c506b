//! Turn aggregation results into chart series.

#![allow(clippy::cast_precision_loss)]

use crate::types::{DataPoint, Series};
use std::collections::BTreeMap;
use tikboard_common::Metric;
use tikboard_data::{DailyClickMetrics, DailyIncrement, GroupDailyIncrement, LinkConversion, PageTypeDay};

/// One line of summed daily increments for `metric`.
pub fn daily_increment_series(rows: &[DailyIncrement], metric: Metric) -> Series {
    Series::new(
        format!("{} increment", metric.label()),
        rows.iter()
            .map(|r| DataPoint::new(r.date, r.increments.get(metric) as f64))
            .collect(),
    )
}

/// One line per group, ordered by group name.
pub fn group_increment_series(rows: &[GroupDailyIncrement], metric: Metric) -> Vec<Series> {
    let mut by_group: BTreeMap<&str, Vec<DataPoint>> = BTreeMap::new();
    for row in rows {
        by_group
            .entry(row.group.as_str())
            .or_default()
            .push(DataPoint::new(row.date, row.increments.get(metric) as f64));
    }
    by_group
        .into_iter()
        .map(|(group, mut points)| {
            points.sort_by_key(|p| p.date);
            Series::new(group, points)
        })
        .collect()
}

/// PV, UV and view increments of one link.
pub fn conversion_series(conversion: &LinkConversion) -> Vec<Series> {
    let line = |name: &str, value: fn(&tikboard_data::ConversionDay) -> f64| {
        Series::new(
            name,
            conversion
                .daily
                .iter()
                .map(|d| DataPoint::new(d.date, value(d)))
                .collect(),
        )
    };
    vec![
        line("PV", |d| d.pv as f64),
        line("UV", |d| d.uv as f64),
        line("views", |d| d.views as f64),
    ]
}

/// PV and UV conversion rates of one link, in percent.
pub fn conversion_rate_series(conversion: &LinkConversion) -> Vec<Series> {
    vec![
        Series::new(
            "PV rate %",
            conversion
                .daily
                .iter()
                .map(|d| DataPoint::new(d.date, d.pv_rate))
                .collect(),
        ),
        Series::new(
            "UV rate %",
            conversion
                .daily
                .iter()
                .map(|d| DataPoint::new(d.date, d.uv_rate))
                .collect(),
        ),
    ]
}

/// Daily clicks and distinct visitors from the click log.
pub fn click_metric_series(rows: &[DailyClickMetrics]) -> Vec<Series> {
    vec![
        Series::new(
            "clicks",
            rows.iter()
                .map(|r| DataPoint::new(r.date, r.total_clicks as f64))
                .collect(),
        ),
        Series::new(
            "visitors",
            rows.iter()
                .map(|r| DataPoint::new(r.date, r.unique_visitors as f64))
                .collect(),
        ),
    ]
}

/// Clicks against view increments for one page type.
pub fn page_type_series(page_type: &str, rows: &[PageTypeDay]) -> Vec<Series> {
    vec![
        Series::new(
            format!("{page_type} clicks"),
            rows.iter()
                .map(|r| DataPoint::new(r.date, r.clicks as f64))
                .collect(),
        ),
        Series::new(
            format!("{page_type} views"),
            rows.iter()
                .map(|r| DataPoint::new(r.date, r.views as f64))
                .collect(),
        ),
    ]
}
