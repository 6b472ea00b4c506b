//! Click-to-view conversion and click-log metrics.
//!
//! PV is the number of distinct sessions and UV the number of distinct
//! visitors. Conversion rates are `PV / views * 100` and `UV / views * 100`,
//! rounded to two decimals, and are `0.0` whenever views are not positive.

use crate::increments::IncrementAggregator;
use crate::records::{ClickRecord, ClickTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tikboard_common::{
    date_axis, mean, normalize_url, rate_percent, round2, saturating_sum, DateRange,
};
use tikboard_config::{GroupMappingTable, LinkGroupRule, MappingStatistics};
use tracing::{debug, instrument};

/// One day of a link's conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionDay {
    /// Day
    pub date: NaiveDate,
    /// Distinct sessions on the link
    pub pv: u64,
    /// Distinct visitors on the link
    pub uv: u64,
    /// Summed view increments of the target group
    pub views: i64,
    /// `pv / views * 100`
    pub pv_rate: f64,
    /// `uv / views * 100`
    pub uv_rate: f64,
}

impl ConversionDay {
    /// Build a day, computing both rates.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(date: NaiveDate, pv: u64, uv: u64, views: i64) -> Self {
        Self {
            date,
            pv,
            uv,
            views,
            pv_rate: rate_percent(pv as f64, views as f64),
            uv_rate: rate_percent(uv as f64, views as f64),
        }
    }
}

/// Conversion analysis for one tracked link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConversion {
    /// Tracked link as configured
    pub link: String,
    /// Target group
    pub group: String,
    /// Distinct sessions over the range
    pub total_pv: u64,
    /// Distinct visitors over the range
    pub total_uv: u64,
    /// Sum of the target group's cumulative `view_count` over the range
    pub total_views: i64,
    /// Mean of the daily PV rates
    pub avg_pv_rate: f64,
    /// Mean of the daily UV rates
    pub avg_uv_rate: f64,
    /// Axis-completed daily table
    pub daily: Vec<ConversionDay>,
    /// Last day of `daily`
    pub today: Option<ConversionDay>,
}

/// PV and UV on one link for the last click day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkClickSummary {
    /// Tracked link as configured
    pub link: String,
    /// Target group
    pub group: String,
    /// Last click day in range
    pub date: NaiveDate,
    /// Distinct sessions
    pub pv: u64,
    /// Distinct visitors
    pub uv: u64,
}

/// Click-log metrics for one day with the previous day's comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClickMetrics {
    /// Day
    pub date: NaiveDate,
    /// Click rows
    pub total_clicks: u64,
    /// Distinct visitors
    pub unique_visitors: u64,
    /// Distinct sessions
    pub page_visits: u64,
    /// Distinct page types
    pub unique_page_types: u64,
    /// `total_clicks / unique_visitors`
    pub clicks_per_visitor: f64,
    /// `total_clicks / page_visits`
    pub clicks_per_session: f64,
    /// Change in clicks vs the previous day, percent
    pub total_clicks_pct: Option<f64>,
    /// Change in visitors vs the previous day, percent
    pub unique_visitors_pct: Option<f64>,
    /// Change in sessions vs the previous day, percent
    pub page_visits_pct: Option<f64>,
    /// Change in clicks per visitor vs the previous day, percent
    pub clicks_per_visitor_pct: Option<f64>,
}

/// Per-page-type click statistics for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageStats {
    /// Page type
    pub page_type: String,
    /// Distinct sessions
    pub unique_sessions: u64,
    /// Distinct visitors
    pub unique_visitors: u64,
    /// Click rows
    pub total_clicks: u64,
    /// `total_clicks / unique_sessions`
    pub clicks_per_session: f64,
    /// `total_clicks / unique_visitors`
    pub clicks_per_visitor: f64,
}

/// Clicks on a page type against view increments of the groups mapped to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTypeDay {
    /// Day
    pub date: NaiveDate,
    /// Click rows with this page type
    pub clicks: u64,
    /// Summed view increments of groups mapped to this page type
    pub views: i64,
}

/// One group's footprint and page type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMappingRow {
    /// Group label
    pub group: String,
    /// Distinct accounts
    pub accounts: usize,
    /// Summed view increments
    pub view_increments: i64,
    /// Page type the mapping assigns
    pub page_type: String,
}

/// Mapping rules and how the merged groups fall under them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMappingSummary {
    /// Rule counts
    pub statistics: MappingStatistics,
    /// Per-group rows
    pub groups: Vec<GroupMappingRow>,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    numerator as f64 / denominator.max(1) as f64
}

/// `(current - previous) / previous * 100`, a zero previous treated as one.
fn change_pct(current: f64, previous: f64) -> f64 {
    let denominator = if previous == 0.0 { 1.0 } else { previous };
    round2((current - previous) / denominator * 100.0)
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> u64 {
    values.collect::<HashSet<_>>().len() as u64
}

fn clicks_on_day(clicks: &ClickTable, date: NaiveDate) -> Vec<&ClickRecord> {
    clicks.records().iter().filter(|c| c.date == date).collect()
}

/// Per-day click metrics with percentage change against the previous
/// observed day. The first day has no comparison.
#[allow(clippy::cast_precision_loss)]
pub fn daily_click_metrics(clicks: &ClickTable) -> Vec<DailyClickMetrics> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&ClickRecord>> = BTreeMap::new();
    for click in clicks.records() {
        by_date.entry(click.date).or_default().push(click);
    }

    let mut out: Vec<DailyClickMetrics> = Vec::with_capacity(by_date.len());
    for (date, rows) in by_date {
        let total_clicks = rows.len() as u64;
        let unique_visitors = distinct(rows.iter().map(|c| c.visitor_id.as_str()));
        let page_visits = distinct(rows.iter().map(|c| c.session_id.as_str()));
        let clicks_per_visitor = ratio(total_clicks, unique_visitors);

        let pct = |pick: fn(&DailyClickMetrics) -> f64, current: f64| {
            out.last().map(|prev| change_pct(current, pick(prev)))
        };
        let metrics = DailyClickMetrics {
            date,
            total_clicks,
            unique_visitors,
            page_visits,
            unique_page_types: distinct(rows.iter().map(|c| c.page_type.as_str())),
            clicks_per_visitor,
            clicks_per_session: ratio(total_clicks, page_visits),
            total_clicks_pct: pct(|m| m.total_clicks as f64, total_clicks as f64),
            unique_visitors_pct: pct(|m| m.unique_visitors as f64, unique_visitors as f64),
            page_visits_pct: pct(|m| m.page_visits as f64, page_visits as f64),
            clicks_per_visitor_pct: pct(|m| m.clicks_per_visitor, clicks_per_visitor),
        };
        out.push(metrics);
    }
    out
}

/// Metrics for `date`, or for the latest click day when `date` is `None`.
pub fn clicks_key_metrics(clicks: &ClickTable, date: Option<NaiveDate>) -> Option<DailyClickMetrics> {
    let date = date.or_else(|| clicks.date_bounds().map(|(_, last)| last))?;
    daily_click_metrics(clicks)
        .into_iter()
        .find(|m| m.date == date)
}

/// Page types ranked by clicks on `date` (latest click day when `None`).
pub fn top_pages(clicks: &ClickTable, date: Option<NaiveDate>, n: usize) -> Vec<PageStats> {
    let Some(date) = date.or_else(|| clicks.date_bounds().map(|(_, last)| last)) else {
        return Vec::new();
    };

    let mut by_type: BTreeMap<&str, Vec<&ClickRecord>> = BTreeMap::new();
    for click in clicks_on_day(clicks, date) {
        by_type.entry(click.page_type.as_str()).or_default().push(click);
    }

    let mut stats: Vec<PageStats> = by_type
        .into_iter()
        .map(|(page_type, rows)| {
            let total_clicks = rows.len() as u64;
            let unique_sessions = distinct(rows.iter().map(|c| c.session_id.as_str()));
            let unique_visitors = distinct(rows.iter().map(|c| c.visitor_id.as_str()));
            PageStats {
                page_type: page_type.to_string(),
                unique_sessions,
                unique_visitors,
                total_clicks,
                clicks_per_session: ratio(total_clicks, unique_sessions),
                clicks_per_visitor: ratio(total_clicks, unique_visitors),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.total_clicks.cmp(&a.total_clicks));
    stats.truncate(n);
    stats
}

/// Pearson correlation; `None` below two points or with zero variance.
#[allow(clippy::cast_precision_loss)]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Joins the click log with the view increments of mapped groups.
#[derive(Debug, Clone, Copy)]
pub struct ClickConversionAnalyzer<'a> {
    mapping: &'a GroupMappingTable,
    increments: &'a IncrementAggregator,
    clicks: &'a ClickTable,
}

impl<'a> ClickConversionAnalyzer<'a> {
    /// Analyzer over one session's tables.
    pub fn new(
        mapping: &'a GroupMappingTable,
        increments: &'a IncrementAggregator,
        clicks: &'a ClickTable,
    ) -> Self {
        Self {
            mapping,
            increments,
            clicks,
        }
    }

    fn link_clicks<'s>(
        &'s self,
        rule: &'s LinkGroupRule,
        range: DateRange,
    ) -> impl Iterator<Item = &'a ClickRecord> + 's {
        let wanted = rule.normalized_link();
        self.clicks
            .records()
            .iter()
            .filter(move |c| range.contains(c.date) && normalize_url(&c.page_url) == wanted)
    }

    /// Daily view increments for rows whose group contains `group`, case-insensitively.
    pub fn group_daily_views(&self, group: &str, range: DateRange) -> BTreeMap<NaiveDate, i64> {
        let needle = group.to_lowercase();
        let mut views: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for row in self
            .increments
            .rows()
            .iter()
            .filter(|r| range.contains(r.date) && r.group.to_lowercase().contains(&needle))
        {
            let day = views.entry(row.date).or_default();
            *day = day.saturating_add(row.view_increment());
        }
        views
    }

    /// Conversion table for one link over `range`.
    #[instrument(skip(self), fields(link = %rule.link, group = %rule.group))]
    pub fn link_conversion(&self, rule: &LinkGroupRule, range: DateRange) -> LinkConversion {
        let mut sessions: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
        let mut visitors: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
        let mut all_sessions: HashSet<&str> = HashSet::new();
        let mut all_visitors: HashSet<&str> = HashSet::new();
        for click in self.link_clicks(rule, range) {
            sessions.entry(click.date).or_default().insert(&click.session_id);
            visitors.entry(click.date).or_default().insert(&click.visitor_id);
            all_sessions.insert(&click.session_id);
            all_visitors.insert(&click.visitor_id);
        }

        let views = self.group_daily_views(&rule.group, range);
        let needle = rule.group.to_lowercase();
        let total_views = saturating_sum(
            self.increments
                .rows()
                .iter()
                .filter(|r| range.contains(r.date) && r.group.to_lowercase().contains(&needle))
                .map(|r| r.counts.views),
        );

        let dates: BTreeSet<NaiveDate> = sessions.keys().chain(views.keys()).copied().collect();
        let daily: Vec<ConversionDay> = match (dates.first(), dates.last()) {
            (Some(&first), Some(&last)) => date_axis(first, last)
                .map(|date| {
                    ConversionDay::new(
                        date,
                        sessions.get(&date).map_or(0, |s| s.len() as u64),
                        visitors.get(&date).map_or(0, |v| v.len() as u64),
                        views.get(&date).copied().unwrap_or(0),
                    )
                })
                .collect(),
            _ => Vec::new(),
        };

        let pv_rates: Vec<f64> = daily.iter().map(|d| d.pv_rate).collect();
        let uv_rates: Vec<f64> = daily.iter().map(|d| d.uv_rate).collect();
        debug!(days = daily.len(), pv = all_sessions.len(), uv = all_visitors.len(), "Computed link conversion");

        LinkConversion {
            link: rule.link.clone(),
            group: rule.group.clone(),
            total_pv: all_sessions.len() as u64,
            total_uv: all_visitors.len() as u64,
            total_views,
            avg_pv_rate: mean(&pv_rates),
            avg_uv_rate: mean(&uv_rates),
            today: daily.last().copied(),
            daily,
        }
    }

    /// Conversion for every configured link, in rule order.
    pub fn link_conversions(&self, range: DateRange) -> Vec<LinkConversion> {
        self.mapping
            .links()
            .iter()
            .map(|rule| self.link_conversion(rule, range))
            .collect()
    }

    /// PV/UV per tracked link on the last click day in `range`.
    pub fn last_day_clicks_summary(&self, range: DateRange) -> Vec<LinkClickSummary> {
        let Some(last_day) = self
            .clicks
            .records()
            .iter()
            .filter(|c| range.contains(c.date))
            .map(|c| c.date)
            .max()
        else {
            return Vec::new();
        };

        let day = DateRange::between(last_day, last_day);
        self.mapping
            .links()
            .iter()
            .map(|rule| {
                let clicks: Vec<&ClickRecord> = self.link_clicks(rule, day).collect();
                LinkClickSummary {
                    link: rule.link.clone(),
                    group: rule.group.clone(),
                    date: last_day,
                    pv: distinct(clicks.iter().map(|c| c.session_id.as_str())),
                    uv: distinct(clicks.iter().map(|c| c.visitor_id.as_str())),
                }
            })
            .collect()
    }

    /// Clicks on `page_type` against view increments of the groups the
    /// mapping assigns to it, union-joined by day and zero-filled.
    pub fn page_type_comparison(&self, page_type: &str, range: DateRange) -> Vec<PageTypeDay> {
        let mut days: BTreeMap<NaiveDate, PageTypeDay> = BTreeMap::new();
        let blank = |date| PageTypeDay {
            date,
            clicks: 0,
            views: 0,
        };

        for click in self
            .clicks
            .records()
            .iter()
            .filter(|c| range.contains(c.date) && c.page_type == page_type)
        {
            days.entry(click.date).or_insert_with(|| blank(click.date)).clicks += 1;
        }
        for row in self
            .increments
            .rows()
            .iter()
            .filter(|r| range.contains(r.date))
            .filter(|r| self.mapping.page_type_for_group(&r.group) == page_type)
        {
            let day = days.entry(row.date).or_insert_with(|| blank(row.date));
            day.views = day.views.saturating_add(row.view_increment());
        }
        days.into_values().collect()
    }

    /// Pearson correlation between daily clicks and views for `page_type`.
    #[allow(clippy::cast_precision_loss)]
    pub fn correlation(&self, page_type: &str, range: DateRange) -> Option<f64> {
        let days = self.page_type_comparison(page_type, range);
        let clicks: Vec<f64> = days.iter().map(|d| d.clicks as f64).collect();
        let views: Vec<f64> = days.iter().map(|d| d.views as f64).collect();
        pearson(&clicks, &views)
    }

    /// Accounts, view increments and page type per merged group.
    pub fn group_mapping_summary(&self) -> GroupMappingSummary {
        let mut groups: BTreeMap<&str, (BTreeSet<&str>, i64)> = BTreeMap::new();
        for row in self.increments.rows() {
            let entry = groups.entry(row.group.as_str()).or_default();
            entry.0.insert(row.account_id.as_str());
            entry.1 = entry.1.saturating_add(row.view_increment());
        }
        GroupMappingSummary {
            statistics: self.mapping.statistics(),
            groups: groups
                .into_iter()
                .map(|(group, (accounts, views))| GroupMappingRow {
                    group: group.to_string(),
                    accounts: accounts.len(),
                    view_increments: views,
                    page_type: self.mapping.page_type_for_group(group).to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{MergedRow, MergedTable};
    use crate::records::RawTable;
    use chrono::NaiveDateTime;
    use tikboard_common::test_utils::{assert_approx_eq, fixtures, ymd};
    use tikboard_common::{AccountId, MetricValues, ReportedDiffs};
    use tikboard_config::GroupPageRule;

    fn click(day: u32, session: &str, visitor: &str, url: &str, page_type: &str) -> ClickRecord {
        let timestamp: NaiveDateTime = ymd(2024, 1, day).and_hms_opt(12, 0, 0).unwrap();
        ClickRecord {
            timestamp,
            date: timestamp.date(),
            session_id: session.to_string(),
            visitor_id: visitor.to_string(),
            page_url: url.to_string(),
            page_type: page_type.to_string(),
        }
    }

    fn merged_row(id: &str, day: u32, group: &str, views: i64, view_diff: Option<i64>) -> MergedRow {
        MergedRow {
            account_id: AccountId::parse(id).unwrap(),
            date: ymd(2024, 1, day),
            group: group.to_string(),
            matched: true,
            counts: MetricValues {
                views,
                ..MetricValues::default()
            },
            reported: ReportedDiffs {
                views: view_diff,
                ..ReportedDiffs::default()
            },
        }
    }

    fn mapping() -> GroupMappingTable {
        GroupMappingTable::new(
            vec![LinkGroupRule::new("https://x.com/videos", "grpx")],
            vec![GroupPageRule::new("grpx", "videos")],
        )
    }

    #[test]
    fn test_rates_with_views() {
        let day = ConversionDay::new(ymd(2024, 1, 1), 3, 2, 50);
        assert_approx_eq(day.pv_rate, 6.0, 1e-9);
        assert_approx_eq(day.uv_rate, 4.0, 1e-9);
    }

    #[test]
    fn test_rates_without_views_are_zero() {
        let day = ConversionDay::new(ymd(2024, 1, 1), 3, 2, 0);
        assert_eq!(day.pv_rate, 0.0);
        assert_eq!(day.uv_rate, 0.0);
        assert!(!day.pv_rate.is_nan());
    }

    #[test]
    fn test_link_conversion_matches_normalized_urls() {
        let clicks = ClickTable::from_records(vec![
            click(1, "s1", "v1", "https://x.com/videos", "videos"),
            click(1, "s2", "v1", "http://x.com/videos?utm=tt", "videos"),
            click(1, "s3", "v2", "https://x.com/videos/", "videos"),
            click(1, "s9", "v9", "https://x.com/other", "other"),
        ]);
        let increments = IncrementAggregator::new(&MergedTable::from_rows(vec![
            merged_row("a", 1, "GrpX_main", 500, Some(30)),
            merged_row("b", 1, "grpx", 800, Some(20)),
            merged_row("c", 1, "misc", 900, Some(1000)),
        ]));
        let mapping = mapping();
        let analyzer = ClickConversionAnalyzer::new(&mapping, &increments, &clicks);

        let conversion = analyzer.link_conversion(&mapping.links()[0], DateRange::all());
        assert_eq!(conversion.total_pv, 3);
        assert_eq!(conversion.total_uv, 2);
        assert_eq!(conversion.total_views, 1300);
        let today = conversion.today.unwrap();
        assert_eq!(today.views, 50);
        assert_approx_eq(today.pv_rate, 6.0, 1e-9);
        assert_approx_eq(conversion.avg_uv_rate, 4.0, 1e-9);
    }

    #[test]
    fn test_conversion_table_completes_axis() {
        let clicks = ClickTable::from_records(vec![click(4, "s1", "v1", "https://x.com/videos", "videos")]);
        let increments = IncrementAggregator::new(&MergedTable::from_rows(vec![
            merged_row("a", 1, "grpx", 10, None),
            merged_row("a", 2, "grpx", 30, None),
        ]));
        let mapping = mapping();
        let analyzer = ClickConversionAnalyzer::new(&mapping, &increments, &clicks);
        let conversion = analyzer.link_conversion(&mapping.links()[0], DateRange::all());

        let dates: Vec<_> = conversion.daily.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![ymd(2024, 1, 1), ymd(2024, 1, 2), ymd(2024, 1, 3), ymd(2024, 1, 4)]);
        assert_eq!(conversion.daily[1].views, 20);
        assert_eq!(conversion.daily[3].pv, 1);
        assert_eq!(conversion.daily[3].pv_rate, 0.0);
    }

    #[test]
    fn test_last_day_summary_per_link() {
        let clicks = ClickTable::from_raw(&RawTable::from_csv_bytes(fixtures::clicks_csv().as_bytes()).unwrap()).unwrap();
        let increments = IncrementAggregator::default();
        let mapping = GroupMappingTable::new(
            vec![
                LinkGroupRule::new("https://insnap.ai/videos", "yujie_main_avatar"),
                LinkGroupRule::new("https://insnap.ai/zh/download", "wan_produce101"),
            ],
            vec![],
        );
        let analyzer = ClickConversionAnalyzer::new(&mapping, &increments, &clicks);

        let summary = analyzer.last_day_clicks_summary(DateRange::all());
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].date, ymd(2024, 1, 2));
        assert_eq!((summary[0].pv, summary[0].uv), (0, 0));
        assert_eq!((summary[1].pv, summary[1].uv), (1, 1));

        let first_day = analyzer.last_day_clicks_summary(DateRange::between(ymd(2024, 1, 1), ymd(2024, 1, 1)));
        assert_eq!((first_day[0].pv, first_day[0].uv), (3, 2));
    }

    #[test]
    fn test_daily_click_metrics_compare_previous_day() {
        let clicks = ClickTable::from_records(vec![
            click(1, "s1", "v1", "u", "videos"),
            click(1, "s1", "v1", "u", "videos"),
            click(2, "s2", "v2", "u", "videos"),
            click(2, "s3", "v3", "u", "download"),
            click(2, "s3", "v3", "u", "download"),
            click(2, "s4", "v3", "u", "download"),
        ]);
        let metrics = daily_click_metrics(&clicks);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].total_clicks_pct, None);
        assert_approx_eq(metrics[0].clicks_per_visitor, 2.0, 1e-9);

        assert_eq!(metrics[1].total_clicks, 4);
        assert_eq!(metrics[1].unique_visitors, 2);
        assert_eq!(metrics[1].page_visits, 3);
        assert_eq!(metrics[1].unique_page_types, 2);
        assert_approx_eq(metrics[1].total_clicks_pct.unwrap(), 100.0, 1e-9);
        assert_approx_eq(metrics[1].page_visits_pct.unwrap(), 200.0, 1e-9);

        let key = clicks_key_metrics(&clicks, None).unwrap();
        assert_eq!(key.date, ymd(2024, 1, 2));
        assert!(clicks_key_metrics(&clicks, Some(ymd(2024, 3, 1))).is_none());
    }

    #[test]
    fn test_top_pages_ranked_by_clicks() {
        let clicks = ClickTable::from_records(vec![
            click(1, "s1", "v1", "u", "videos"),
            click(1, "s2", "v2", "u", "download"),
            click(1, "s2", "v2", "u", "download"),
            click(1, "s3", "v2", "u", "other"),
        ]);
        let pages = top_pages(&clicks, None, 2);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_type, "download");
        assert_eq!(pages[0].total_clicks, 2);
        assert_approx_eq(pages[0].clicks_per_session, 2.0, 1e-9);
        assert!(top_pages(&ClickTable::default(), None, 3).is_empty());
    }

    #[test]
    fn test_page_type_comparison_and_correlation() {
        let clicks = ClickTable::from_records(vec![
            click(1, "s1", "v1", "u", "videos"),
            click(2, "s2", "v2", "u", "videos"),
            click(2, "s3", "v3", "u", "videos"),
            click(3, "s4", "v4", "u", "download"),
        ]);
        let increments = IncrementAggregator::new(&MergedTable::from_rows(vec![
            merged_row("a", 1, "grpx", 10, Some(10)),
            merged_row("a", 2, "grpx", 30, Some(20)),
            merged_row("a", 3, "grpx", 60, Some(30)),
            merged_row("b", 3, "misc", 5, Some(99)),
        ]));
        let mapping = mapping();
        let analyzer = ClickConversionAnalyzer::new(&mapping, &increments, &clicks);

        let days = analyzer.page_type_comparison("videos", DateRange::all());
        assert_eq!(days.len(), 3);
        assert_eq!((days[0].clicks, days[0].views), (1, 10));
        assert_eq!((days[2].clicks, days[2].views), (0, 30));

        assert!(analyzer.correlation("videos", DateRange::all()).is_some());
        assert!(analyzer.correlation("download", DateRange::all()).is_none());
    }

    #[test]
    fn test_pearson() {
        assert_approx_eq(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap(), 1.0, 1e-9);
        assert_approx_eq(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap(), -1.0, 1e-9);
        assert!(pearson(&[1.0], &[1.0]).is_none());
        assert!(pearson(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_group_mapping_summary() {
        let increments = IncrementAggregator::new(&MergedTable::from_rows(vec![
            merged_row("a", 1, "grpx", 10, Some(10)),
            merged_row("b", 1, "grpx", 10, Some(5)),
            merged_row("c", 1, "misc", 10, None),
        ]));
        let clicks = ClickTable::default();
        let mapping = mapping();
        let analyzer = ClickConversionAnalyzer::new(&mapping, &increments, &clicks);
        let summary = analyzer.group_mapping_summary();
        assert_eq!(summary.statistics.link_rules, 1);
        assert_eq!(summary.groups.len(), 2);
        assert_eq!(summary.groups[0].group, "grpx");
        assert_eq!(summary.groups[0].accounts, 2);
        assert_eq!(summary.groups[0].view_increments, 15);
        assert_eq!(summary.groups[0].page_type, "videos");
        assert_eq!(summary.groups[1].page_type, "other");
    }
}
