//! CSV exports and the JSON warm-start snapshot.

use crate::conversion::{DailyClickMetrics, LinkConversion};
use crate::increments::{DailyIncrement, GroupDailyIncrement};
use crate::merge::MergedTable;
use crate::records::{ClickRecord, ClickTable, RosterEntry, RosterTable};
use crate::session::SessionState;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tikboard_common::{DashError, MetricValues, Result};
use tracing::{debug, info, instrument};

/// Snapshot layout version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized session state used to start without re-reading sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Layout version
    pub version: u32,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Roster entries the merge was made against
    pub roster: Vec<RosterEntry>,
    /// Merge result
    pub merged: MergedTable,
    /// Click records, when a click log was loaded
    pub clicks: Option<Vec<ClickRecord>>,
}

impl Snapshot {
    /// Capture a session state.
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            roster: state.roster.entries().to_vec(),
            merged: state.merged.clone(),
            clicks: state.clicks.as_ref().map(|c| c.records().to_vec()),
        }
    }

    /// Rebuild the typed tables.
    pub fn into_tables(self) -> (RosterTable, MergedTable, Option<ClickTable>) {
        (
            RosterTable::from_entries(self.roster),
            MergedTable::from_rows(self.merged.rows().to_vec()),
            self.clicks.map(ClickTable::from_records),
        )
    }

    /// Write as pretty JSON, creating parent directories.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, body).await?;
        info!(rows = self.merged.len(), "Saved snapshot");
        Ok(())
    }

    /// Read a snapshot written by [`Snapshot::save`].
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let body = tokio::fs::read(path.as_ref()).await?;
        let snapshot: Snapshot = serde_json::from_slice(&body)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DashError::parse(format!(
                "snapshot version {} is not supported (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        debug!(rows = snapshot.merged.len(), "Loaded snapshot");
        Ok(snapshot)
    }
}

#[derive(Serialize)]
struct MergedCsvRow<'a> {
    account_id: &'a str,
    date: NaiveDate,
    group: &'a str,
    matched: bool,
    view_count: i64,
    like_count: i64,
    comment_count: i64,
    share_count: i64,
    post_count: i64,
}

#[derive(Serialize)]
struct IncrementCsvRow<'a> {
    date: NaiveDate,
    group: Option<&'a str>,
    view_increment: i64,
    like_increment: i64,
    comment_increment: i64,
    share_increment: i64,
    post_increment: i64,
}

impl<'a> IncrementCsvRow<'a> {
    fn new(date: NaiveDate, group: Option<&'a str>, values: MetricValues) -> Self {
        Self {
            date,
            group,
            view_increment: values.views,
            like_increment: values.likes,
            comment_increment: values.comments,
            share_increment: values.shares,
            post_increment: values.posts,
        }
    }
}

#[derive(Serialize)]
struct ConversionCsvRow<'a> {
    link: &'a str,
    group: &'a str,
    date: NaiveDate,
    pv: u64,
    uv: u64,
    views: i64,
    pv_rate: f64,
    uv_rate: f64,
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    let mut written = 0;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = written, "Exported CSV");
    Ok(written)
}

/// Merged rows with their cumulative counters.
pub fn export_merged(path: impl AsRef<Path>, merged: &MergedTable) -> Result<usize> {
    write_csv(
        path.as_ref(),
        merged.rows().iter().map(|row| MergedCsvRow {
            account_id: row.account_id.as_str(),
            date: row.date,
            group: &row.group,
            matched: row.matched,
            view_count: row.counts.views,
            like_count: row.counts.likes,
            comment_count: row.counts.comments,
            share_count: row.counts.shares,
            post_count: row.counts.posts,
        }),
    )
}

/// Summed daily increments.
pub fn export_daily_increments(path: impl AsRef<Path>, rows: &[DailyIncrement]) -> Result<usize> {
    write_csv(
        path.as_ref(),
        rows.iter()
            .map(|r| IncrementCsvRow::new(r.date, None, r.increments)),
    )
}

/// Daily increments per group.
pub fn export_group_increments(
    path: impl AsRef<Path>,
    rows: &[GroupDailyIncrement],
) -> Result<usize> {
    write_csv(
        path.as_ref(),
        rows.iter()
            .map(|r| IncrementCsvRow::new(r.date, Some(&r.group), r.increments)),
    )
}

/// One row per link and day.
pub fn export_conversions(path: impl AsRef<Path>, conversions: &[LinkConversion]) -> Result<usize> {
    write_csv(
        path.as_ref(),
        conversions.iter().flat_map(|c| {
            c.daily.iter().map(move |day| ConversionCsvRow {
                link: &c.link,
                group: &c.group,
                date: day.date,
                pv: day.pv,
                uv: day.uv,
                views: day.views,
                pv_rate: day.pv_rate,
                uv_rate: day.uv_rate,
            })
        }),
    )
}

/// Per-day click metrics.
pub fn export_click_metrics(path: impl AsRef<Path>, rows: &[DailyClickMetrics]) -> Result<usize> {
    write_csv(path.as_ref(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::increments::IncrementAggregator;
    use crate::merge::MergedRow;
    use tikboard_common::test_utils::{create_temp_dir, ymd};
    use tikboard_common::{AccountId, ReportedDiffs};

    fn merged() -> MergedTable {
        let row = |day: u32, views: i64| MergedRow {
            account_id: AccountId::parse("A").unwrap(),
            date: ymd(2024, 1, day),
            group: "dance".to_string(),
            matched: true,
            counts: MetricValues {
                views,
                ..MetricValues::default()
            },
            reported: ReportedDiffs::default(),
        };
        MergedTable::from_rows(vec![row(1, 100), row(2, 160)])
    }

    #[test]
    fn test_export_merged_and_increments() {
        let dir = create_temp_dir();
        let table = merged();

        let path = dir.path().join("out/merged.csv");
        assert_eq!(export_merged(&path, &table).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("account_id,date,group,matched,view_count"));
        assert!(text.contains("A,2024-01-02,dance,true,160"));

        let daily = IncrementAggregator::new(&table)
            .daily_increments(&crate::increments::IncrementQuery::new());
        let path = dir.path().join("daily.csv");
        assert_eq!(export_daily_increments(&path, &daily).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("2024-01-02,,60,"));
    }

    #[tokio::test]
    async fn test_snapshot_save_and_load() {
        let dir = create_temp_dir();
        let state = SessionState::new(RosterTable::default(), merged(), None);
        let snapshot = Snapshot::from_state(&state);

        let path = dir.path().join("cache/snapshot.json");
        snapshot.save(&path).await.unwrap();
        let loaded = Snapshot::load(&path).await.unwrap();
        assert_eq!(loaded, snapshot);

        let (_, table, clicks) = loaded.into_tables();
        assert_eq!(table, merged());
        assert!(clicks.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_rejects_other_versions() {
        let dir = create_temp_dir();
        let state = SessionState::new(RosterTable::default(), merged(), None);
        let mut snapshot = Snapshot::from_state(&state);
        snapshot.version = 99;
        let path = dir.path().join("snapshot.json");
        snapshot.save(&path).await.unwrap();

        let err = Snapshot::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }
}
