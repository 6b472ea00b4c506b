//! Left join of the counter export onto the roster.

use crate::records::{CounterTable, RosterTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tikboard_common::{
    AccountId, DashError, DateRange, MetricValues, ReportedDiffs, Result, UNKNOWN_GROUP,
};
use tracing::{info, instrument};

/// A counter row with its resolved group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRow {
    /// Canonical account id
    pub account_id: AccountId,
    /// Snapshot day
    pub date: NaiveDate,
    /// Roster group label, `"Unknown"` when the account is not in the roster
    pub group: String,
    /// Whether the account id was found in the roster
    pub matched: bool,
    /// Cumulative counters
    pub counts: MetricValues,
    /// Differences supplied by the export
    pub reported: ReportedDiffs,
}

/// Immutable merge result, sorted by account then date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedTable {
    rows: Vec<MergedRow>,
}

impl MergedTable {
    /// Build from rows in any order.
    pub fn from_rows(mut rows: Vec<MergedRow>) -> Self {
        rows.sort_by(|a, b| (&a.account_id, a.date).cmp(&(&b.account_id, b.date)));
        Self { rows }
    }

    /// All rows, sorted by (account, date).
    pub fn rows(&self) -> &[MergedRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest date present.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Distinct account ids in order.
    pub fn accounts(&self) -> BTreeSet<&AccountId> {
        self.rows.iter().map(|r| &r.account_id).collect()
    }

    /// Rows whose date lies in `range`.
    pub fn rows_in(&self, range: DateRange) -> impl Iterator<Item = &MergedRow> {
        self.rows.iter().filter(move |r| range.contains(r.date))
    }

    /// Rows whose account was found in the roster.
    pub fn matched_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.matched).count()
    }

    /// Rows whose account was not found in the roster.
    pub fn unmatched_rows(&self) -> usize {
        self.len() - self.matched_rows()
    }
}

/// Result of a load-and-merge attempt, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Whether a new merged table is available
    pub success: bool,
    /// Human-readable status
    pub message: String,
    /// Rows in the merged table
    pub rows: usize,
    /// Rows matched to the roster
    pub matched: usize,
    /// Rows left as `"Unknown"`
    pub unmatched: usize,
}

impl MergeOutcome {
    /// Outcome for a successful merge.
    pub fn merged(table: &MergedTable) -> Self {
        let matched = table.matched_rows();
        Self {
            success: true,
            message: format!(
                "Merged {} rows ({matched} matched, {} unmatched)",
                table.len(),
                table.len() - matched
            ),
            rows: table.len(),
            matched,
            unmatched: table.len() - matched,
        }
    }

    /// Outcome for a failed merge.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            rows: 0,
            matched: 0,
            unmatched: 0,
        }
    }
}

/// Stateless join of counters onto the roster.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine;

impl MergeEngine {
    /// Left join: every counter row yields exactly one merged row.
    ///
    /// Fails with `MissingSource` when either table is empty.
    #[instrument(skip_all, fields(counters = counters.len(), roster = roster.len()))]
    pub fn merge(counters: &CounterTable, roster: &RosterTable) -> Result<MergedTable> {
        if counters.is_empty() {
            return Err(DashError::missing_source(
                "counters",
                "counter table is empty",
            ));
        }
        if roster.is_empty() {
            return Err(DashError::missing_source("roster", "roster table is empty"));
        }

        let rows = counters
            .records()
            .iter()
            .map(|record| {
                let entry = roster.get(&record.account_id);
                MergedRow {
                    account_id: record.account_id.clone(),
                    date: record.date,
                    group: entry
                        .and_then(|e| e.group.clone())
                        .unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
                    matched: entry.is_some(),
                    counts: record.counts,
                    reported: record.reported,
                }
            })
            .collect();

        let table = MergedTable::from_rows(rows);
        info!(
            rows = table.len(),
            matched = table.matched_rows(),
            unmatched = table.unmatched_rows(),
            "Merged counters onto roster"
        );
        Ok(table)
    }
}
