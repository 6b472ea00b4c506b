//! Day-over-day increments and their date/group rollups.
//!
//! Deltas are always taken over each account's full history before any
//! date filter is applied, so the first day inside a range still carries
//! its real change. The first observation of an account has a zero delta.
//! Rollups are completed over the contiguous calendar range between the
//! earliest and latest selected day, with zero rows for missing days.

use crate::classify::{GroupClassifier, MatchMode};
use crate::merge::MergedTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tikboard_common::{date_axis, AccountId, DateRange, MetricValues, ReportedDiffs};
use tracing::{debug, instrument};

/// One merged row with its computed day-over-day change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementRow {
    /// Canonical account id
    pub account_id: AccountId,
    /// Snapshot day
    pub date: NaiveDate,
    /// Group label from the merge
    pub group: String,
    /// Cumulative counters on this day
    pub counts: MetricValues,
    /// Change since the account's previous observation; zero on the first
    pub deltas: MetricValues,
    /// Differences supplied by the export
    pub reported: ReportedDiffs,
}

impl IncrementRow {
    /// Reported differences where present, computed deltas otherwise.
    pub fn effective(&self) -> MetricValues {
        self.reported.or_computed(self.deltas)
    }

    /// Daily view change used for conversion: `view_diff` when reported.
    pub fn view_increment(&self) -> i64 {
        self.reported.views.unwrap_or(self.deltas.views)
    }
}

/// First differences per account over the full merged table.
///
/// Negative differences are kept as they are.
pub fn compute_increments(merged: &MergedTable) -> Vec<IncrementRow> {
    let mut out = Vec::with_capacity(merged.len());
    let mut previous: Option<(&AccountId, MetricValues)> = None;

    for row in merged.rows() {
        let deltas = match previous {
            Some((account, prev)) if *account == row.account_id => row.counts - prev,
            _ => MetricValues::default(),
        };
        previous = Some((&row.account_id, row.counts));
        out.push(IncrementRow {
            account_id: row.account_id.clone(),
            date: row.date,
            group: row.group.clone(),
            counts: row.counts,
            deltas,
            reported: row.reported,
        });
    }
    out
}

/// Filter for increment rollups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementQuery {
    /// Days to keep
    pub range: DateRange,
    /// Ordered group keywords; empty keeps every group under its own label
    pub keywords: Vec<String>,
    /// Keep accounts matching no keyword under their original label
    pub keep_unmatched: bool,
}

impl IncrementQuery {
    /// Every day, every group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to `range`.
    #[must_use]
    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    /// Relabel groups by the first matching keyword.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Whether accounts matching no keyword stay in the result.
    #[must_use]
    pub fn keep_unmatched(mut self, keep: bool) -> Self {
        self.keep_unmatched = keep;
        self
    }
}

/// Summed increments for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyIncrement {
    /// Day
    pub date: NaiveDate,
    /// Summed deltas
    pub increments: MetricValues,
}

/// Summed increments for one day and group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDailyIncrement {
    /// Day
    pub date: NaiveDate,
    /// Group label after keyword normalisation
    pub group: String,
    /// Summed deltas
    pub increments: MetricValues,
}

/// Summed cumulative counters for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    /// Day
    pub date: NaiveDate,
    /// Summed cumulative counters
    pub totals: MetricValues,
    /// Accounts reporting that day
    pub accounts: usize,
}

/// Summed cumulative counters for one day and group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDailyTotal {
    /// Day
    pub date: NaiveDate,
    /// Group label after keyword normalisation
    pub group: String,
    /// Summed cumulative counters
    pub totals: MetricValues,
}

/// Rollups over a merged table's increments.
#[derive(Debug, Clone, Default)]
pub struct IncrementAggregator {
    rows: Vec<IncrementRow>,
}

impl IncrementAggregator {
    /// Compute increments for `merged`.
    #[instrument(skip_all, fields(rows = merged.len()))]
    pub fn new(merged: &MergedTable) -> Self {
        let rows = compute_increments(merged);
        debug!(rows = rows.len(), "Computed increments");
        Self { rows }
    }

    /// All increment rows, sorted by (account, date).
    pub fn rows(&self) -> &[IncrementRow] {
        &self.rows
    }

    /// Rows in range with their (possibly relabelled) group, unmatched rows
    /// dropped unless the query keeps them.
    pub fn select<'a>(
        &'a self,
        query: &'a IncrementQuery,
    ) -> impl Iterator<Item = (&'a str, &'a IncrementRow)> + 'a {
        let classifier = (!query.keywords.is_empty())
            .then(|| GroupClassifier::from_keywords(&query.keywords, MatchMode::CaseSensitive));

        self.rows
            .iter()
            .filter(move |row| query.range.contains(row.date))
            .filter_map(move |row| match &classifier {
                None => Some((row.group.as_str(), row)),
                Some(classifier) => match classifier.classify(&row.group) {
                    Some(label) => Some((keyword_label(&query.keywords, label), row)),
                    None if query.keep_unmatched => Some((row.group.as_str(), row)),
                    None => None,
                },
            })
    }

    /// Deltas summed per day over the completed date axis.
    pub fn daily_increments(&self, query: &IncrementQuery) -> Vec<DailyIncrement> {
        let mut by_date: BTreeMap<NaiveDate, MetricValues> = BTreeMap::new();
        for (_, row) in self.select(query) {
            *by_date.entry(row.date).or_default() += row.deltas;
        }

        let (Some(&first), Some(&last)) = (by_date.keys().next(), by_date.keys().next_back())
        else {
            return Vec::new();
        };
        date_axis(first, last)
            .map(|date| DailyIncrement {
                date,
                increments: by_date.get(&date).copied().unwrap_or_default(),
            })
            .collect()
    }

    /// Deltas summed per day and group; every (day, group) pair over the
    /// completed axis appears once.
    pub fn group_daily_increments(&self, query: &IncrementQuery) -> Vec<GroupDailyIncrement> {
        let mut sums: BTreeMap<(NaiveDate, &str), MetricValues> = BTreeMap::new();
        let mut groups: BTreeSet<&str> = BTreeSet::new();
        for (group, row) in self.select(query) {
            *sums.entry((row.date, group)).or_default() += row.deltas;
            groups.insert(group);
        }

        let dates: BTreeSet<NaiveDate> = sums.keys().map(|(d, _)| *d).collect();
        let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
            return Vec::new();
        };
        date_axis(first, last)
            .flat_map(|date| {
                groups.iter().map(move |group| (date, *group))
            })
            .map(|(date, group)| GroupDailyIncrement {
                date,
                group: group.to_string(),
                increments: sums.get(&(date, group)).copied().unwrap_or_default(),
            })
            .collect()
    }

    /// Cumulative counters summed per observed day.
    pub fn daily_totals(&self, range: DateRange) -> Vec<DailyTotal> {
        let mut by_date: BTreeMap<NaiveDate, (MetricValues, usize)> = BTreeMap::new();
        for row in self.rows.iter().filter(|r| range.contains(r.date)) {
            let entry = by_date.entry(row.date).or_default();
            entry.0 += row.counts;
            entry.1 += 1;
        }
        by_date
            .into_iter()
            .map(|(date, (totals, accounts))| DailyTotal {
                date,
                totals,
                accounts,
            })
            .collect()
    }

    /// Cumulative counters summed per observed day and group.
    pub fn group_daily_totals(&self, query: &IncrementQuery) -> Vec<GroupDailyTotal> {
        let mut sums: BTreeMap<(NaiveDate, &str), MetricValues> = BTreeMap::new();
        for (group, row) in self.select(query) {
            *sums.entry((row.date, group)).or_default() += row.counts;
        }
        sums.into_iter()
            .map(|((date, group), totals)| GroupDailyTotal {
                date,
                group: group.to_string(),
                totals,
            })
            .collect()
    }

    /// One account's rows in range, oldest first.
    pub fn account_history(&self, account: &AccountId, range: DateRange) -> Vec<IncrementRow> {
        self.rows
            .iter()
            .filter(|r| &r.account_id == account && range.contains(r.date))
            .cloned()
            .collect()
    }

    /// Latest day with any row in range.
    pub fn latest_date(&self, range: DateRange) -> Option<NaiveDate> {
        self.rows
            .iter()
            .filter(|r| range.contains(r.date))
            .map(|r| r.date)
            .max()
    }
}

/// The query keyword equal to a classifier label.
fn keyword_label<'a>(keywords: &'a [String], label: &str) -> &'a str {
    keywords
        .iter()
        .map(|k| k.trim())
        .find(|k| *k == label)
        .unwrap_or_default()
}
