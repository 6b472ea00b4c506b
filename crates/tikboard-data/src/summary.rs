//! Headline numbers for the dashboard cards.

use crate::classify::MatchMode;
use crate::increments::{IncrementAggregator, IncrementQuery};
use crate::merge::MergedTable;
use crate::records::{ClickTable, RosterTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tikboard_common::{pct_change, saturating_sum, AccountId, DateRange, Metric, MetricValues};

/// Base URL of account profile pages.
pub const PROFILE_URL_BASE: &str = "https://www.tiktok.com/@";

/// Click-log footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickDataSummary {
    /// Click rows
    pub total_clicks: usize,
    /// Distinct click days
    pub unique_dates: usize,
    /// First and last click day
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Merged-table footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Merged rows
    pub total_records: usize,
    /// Distinct accounts
    pub unique_accounts: usize,
    /// Sum of cumulative `view_count` over every row
    pub total_views: i64,
    /// First and last day
    pub date_range: (NaiveDate, NaiveDate),
    /// Rows matched to the roster
    pub matched_records: usize,
    /// Rows left as `"Unknown"`
    pub unmatched_records: usize,
    /// `matched / total * 100`
    pub match_rate: f64,
    /// Present when a click log is loaded
    pub clicks: Option<ClickDataSummary>,
}

/// Summarise the merged table; `None` when nothing is merged.
#[allow(clippy::cast_precision_loss)]
pub fn data_summary(merged: &MergedTable, clicks: Option<&ClickTable>) -> Option<DataSummary> {
    let date_range = merged.date_bounds()?;
    let matched = merged.matched_rows();
    Some(DataSummary {
        total_records: merged.len(),
        unique_accounts: merged.accounts().len(),
        total_views: saturating_sum(merged.rows().iter().map(|r| r.counts.views)),
        date_range,
        matched_records: matched,
        unmatched_records: merged.unmatched_rows(),
        match_rate: matched as f64 / merged.len() as f64 * 100.0,
        clicks: clicks.map(|clicks| ClickDataSummary {
            total_clicks: clicks.len(),
            unique_dates: clicks
                .records()
                .iter()
                .map(|c| c.date)
                .collect::<BTreeSet<_>>()
                .len(),
            date_range: clicks.date_bounds(),
        }),
    })
}

/// A value on the latest day against the day before.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueComparison {
    /// Latest day
    pub current: i64,
    /// Previous day
    pub previous: i64,
    /// `current - previous`
    pub diff: i64,
    /// Percentage change; zero when `previous` is zero
    pub pct: f64,
}

impl ValueComparison {
    /// Compare two values.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(current: i64, previous: i64) -> Self {
        Self {
            current,
            previous,
            diff: current.saturating_sub(previous),
            pct: pct_change(current as f64, previous as f64),
        }
    }
}

/// Latest day against the calendar day before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YesterdayComparison {
    /// Latest merged day
    pub latest_date: NaiveDate,
    /// The calendar day before
    pub previous_date: NaiveDate,
    /// Merged rows per day
    pub total_records: ValueComparison,
    /// Distinct accounts per day
    pub unique_accounts: ValueComparison,
    /// Summed cumulative views per day
    pub total_views: ValueComparison,
    /// Click rows per day, when a click log is loaded
    pub total_clicks: Option<ValueComparison>,
    /// Daily increments of each metric
    pub increments: BTreeMap<Metric, ValueComparison>,
}

/// Compare the latest merged day with the day before it.
pub fn yesterday_comparison(
    merged: &MergedTable,
    increments: &IncrementAggregator,
    clicks: Option<&ClickTable>,
) -> Option<YesterdayComparison> {
    let (_, latest) = merged.date_bounds()?;
    let previous = latest.pred_opt()?;

    let day_stats = |day: NaiveDate| {
        let rows: Vec<_> = merged.rows().iter().filter(|r| r.date == day).collect();
        let accounts: HashSet<&AccountId> = rows.iter().map(|r| &r.account_id).collect();
        let views = saturating_sum(rows.iter().map(|r| r.counts.views));
        (rows.len() as i64, accounts.len() as i64, views)
    };
    let (records_now, accounts_now, views_now) = day_stats(latest);
    let (records_prev, accounts_prev, views_prev) = day_stats(previous);

    let click_count =
        |clicks: &ClickTable, day| clicks.records().iter().filter(|c| c.date == day).count() as i64;

    let daily = increments.daily_increments(&IncrementQuery::new());
    let (now, before) = match daily.as_slice() {
        [] => (MetricValues::default(), MetricValues::default()),
        [only] => (only.increments, only.increments),
        [.., before, now] => (now.increments, before.increments),
    };

    Some(YesterdayComparison {
        latest_date: latest,
        previous_date: previous,
        total_records: ValueComparison::new(records_now, records_prev),
        unique_accounts: ValueComparison::new(accounts_now, accounts_prev),
        total_views: ValueComparison::new(views_now, views_prev),
        total_clicks: clicks.map(|clicks| {
            ValueComparison::new(click_count(clicks, latest), click_count(clicks, previous))
        }),
        increments: Metric::ALL
            .into_iter()
            .map(|m| (m, ValueComparison::new(now.get(m), before.get(m))))
            .collect(),
    })
}

/// Increments and clicks on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestDayIncrements {
    /// Day
    pub date: NaiveDate,
    /// Summed increments, reported differences preferred
    pub increments: MetricValues,
    /// Click rows that day
    pub clicks: u64,
}

/// Increments on `date`, or on the latest merged day.
pub fn latest_day_increments(
    increments: &IncrementAggregator,
    clicks: Option<&ClickTable>,
    date: Option<NaiveDate>,
) -> Option<LatestDayIncrements> {
    let date = date.or_else(|| increments.latest_date(DateRange::all()))?;
    let rows: Vec<_> = increments.rows().iter().filter(|r| r.date == date).collect();
    if rows.is_empty() {
        return None;
    }
    Some(LatestDayIncrements {
        date,
        increments: rows
            .iter()
            .fold(MetricValues::default(), |acc, r| acc + r.effective()),
        clicks: clicks.map_or(0, |c| {
            c.records().iter().filter(|r| r.date == date).count() as u64
        }),
    })
}

/// One row of the top-accounts table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopAccount {
    /// Profile page, when the username is known
    pub profile_url: Option<String>,
    /// Canonical account id
    pub account_id: AccountId,
    /// Display handle
    pub username: Option<String>,
    /// View increment on the last day of the range
    pub last_day_view_increment: i64,
    /// Roster follower count
    pub followers: i64,
    /// Roster like count
    pub likes: i64,
}

/// Accounts ranked by view increment on the last day of `range`.
pub fn top_accounts(
    increments: &IncrementAggregator,
    roster: &RosterTable,
    range: DateRange,
    n: usize,
) -> Vec<TopAccount> {
    let Some(last_day) = increments.latest_date(range) else {
        return Vec::new();
    };

    let mut per_account: BTreeMap<&AccountId, i64> = BTreeMap::new();
    for row in increments.rows().iter().filter(|r| r.date == last_day) {
        let total = per_account.entry(&row.account_id).or_default();
        *total = total.saturating_add(row.view_increment());
    }

    let mut ranked: Vec<(&AccountId, i64)> = per_account.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(n);

    ranked
        .into_iter()
        .map(|(account_id, views)| {
            let entry = roster.get(account_id);
            let username = entry.and_then(|e| e.username.clone());
            TopAccount {
                profile_url: username.as_ref().map(|u| format!("{PROFILE_URL_BASE}{u}")),
                account_id: account_id.clone(),
                username,
                last_day_view_increment: views,
                followers: entry.map_or(0, |e| e.followers),
                likes: entry.map_or(0, |e| e.total_likes),
            }
        })
        .collect()
}

/// Increments of one selected group keyword on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLatestIncrements {
    /// Keyword as selected
    pub keyword: String,
    /// Day
    pub date: NaiveDate,
    /// Summed increments of rows whose group contains the keyword
    pub increments: MetricValues,
}

/// Per-keyword increments on `date` (latest merged day when `None`).
/// Keywords match case-insensitively and may overlap.
pub fn selected_groups_latest_increments<S: AsRef<str>>(
    increments: &IncrementAggregator,
    keywords: &[S],
    date: Option<NaiveDate>,
) -> Vec<GroupLatestIncrements> {
    let Some(date) = date.or_else(|| increments.latest_date(DateRange::all())) else {
        return Vec::new();
    };
    let day_rows: Vec<_> = increments.rows().iter().filter(|r| r.date == date).collect();
    if day_rows.is_empty() {
        return Vec::new();
    }

    keywords
        .iter()
        .map(|keyword| {
            let keyword = keyword.as_ref();
            GroupLatestIncrements {
                keyword: keyword.to_string(),
                date,
                increments: day_rows
                    .iter()
                    .filter(|r| MatchMode::CaseInsensitive.contains(&r.group, keyword))
                    .fold(MetricValues::default(), |acc, r| acc + r.effective()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeEngine;
    use crate::records::{CounterTable, RawTable};
    use tikboard_common::test_utils::{assert_approx_eq, fixtures, ymd};

    fn load() -> (RosterTable, MergedTable, IncrementAggregator, ClickTable) {
        let roster = RosterTable::from_raw(&RawTable::from_csv_bytes(fixtures::roster_csv().as_bytes()).unwrap()).unwrap();
        let counters = CounterTable::from_raw(&RawTable::from_csv_bytes(fixtures::counters_csv().as_bytes()).unwrap()).unwrap();
        let clicks = ClickTable::from_raw(&RawTable::from_csv_bytes(fixtures::clicks_csv().as_bytes()).unwrap()).unwrap();
        let merged = MergeEngine::merge(&counters, &roster).unwrap();
        let increments = IncrementAggregator::new(&merged);
        (roster, merged, increments, clicks)
    }

    #[test]
    fn test_data_summary() {
        let (_, merged, _, clicks) = load();
        let summary = data_summary(&merged, Some(&clicks)).unwrap();
        assert_eq!(summary.total_records, 5);
        assert_eq!(summary.unique_accounts, 3);
        assert_eq!(summary.total_views, 760);
        assert_eq!(summary.matched_records, 4);
        assert_approx_eq(summary.match_rate, 80.0, 1e-9);
        let clicks = summary.clicks.unwrap();
        assert_eq!(clicks.total_clicks, 4);
        assert_eq!(clicks.unique_dates, 2);
        assert!(data_summary(&MergedTable::default(), None).is_none());
    }

    #[test]
    fn test_yesterday_comparison() {
        let (_, merged, increments, clicks) = load();
        let cmp = yesterday_comparison(&merged, &increments, Some(&clicks)).unwrap();
        assert_eq!(cmp.latest_date, ymd(2024, 1, 2));
        assert_eq!(cmp.total_records.current, 3);
        assert_eq!(cmp.total_records.previous, 2);
        assert_approx_eq(cmp.total_records.pct, 50.0, 1e-9);
        assert_eq!(cmp.total_views.current, 460);
        assert_eq!(cmp.total_views.previous, 300);
        assert_eq!(cmp.total_clicks.unwrap().current, 1);

        let views = cmp.increments[&Metric::Views];
        assert_eq!(views.current, 110);
        assert_eq!(views.previous, 0);
        assert_eq!(views.pct, 0.0);
    }

    #[test]
    fn test_latest_day_increments() {
        let (_, _, increments, clicks) = load();
        let latest = latest_day_increments(&increments, Some(&clicks), None).unwrap();
        assert_eq!(latest.date, ymd(2024, 1, 2));
        assert_eq!(latest.increments.views, 110);
        assert_eq!(latest.increments.likes, 7);
        assert_eq!(latest.clicks, 1);
        assert!(latest_day_increments(&increments, None, Some(ymd(2023, 1, 1))).is_none());
    }

    #[test]
    fn test_top_accounts() {
        let (roster, _, increments, _) = load();
        let top = top_accounts(&increments, &roster, DateRange::all(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].account_id.as_str(), "B");
        assert_eq!(top[0].last_day_view_increment, 60);
        assert_eq!(top[0].profile_url.as_deref(), Some("https://www.tiktok.com/@bob_tt"));
        assert_eq!(top[0].followers, 800);
        assert_eq!(top[1].account_id.as_str(), "A");

        let all = top_accounts(&increments, &roster, DateRange::all(), 10);
        let z = all.iter().find(|a| a.account_id.as_str() == "Z").unwrap();
        assert!(z.profile_url.is_none());
        assert_eq!(z.followers, 0);
    }

    #[test]
    fn test_selected_groups_latest_increments() {
        let (_, _, increments, _) = load();
        let groups = selected_groups_latest_increments(&increments, &["MAIN_AVATAR", "dance", "nothing"], None);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].increments.views, 50);
        assert_eq!(groups[1].increments.views, 60);
        assert_eq!(groups[2].increments, MetricValues::default());
    }
}
