//! Session-scoped dashboard context.
//!
//! A [`DashboardSession`] owns everything one dashboard user works with: the
//! configuration, the mapping table, a memo of decoded sources and the
//! current merged snapshot. Nothing here is process-global; two sessions
//! never share state.

use crate::classify::available_groups;
use crate::conversion::{
    self, ClickConversionAnalyzer, DailyClickMetrics, GroupMappingSummary, LinkClickSummary,
    LinkConversion, PageStats, PageTypeDay,
};
use crate::export::Snapshot;
use crate::increments::{
    DailyIncrement, DailyTotal, GroupDailyIncrement, GroupDailyTotal, IncrementAggregator,
    IncrementQuery, IncrementRow,
};
use crate::merge::{MergeEngine, MergeOutcome, MergedTable};
use crate::records::{ClickTable, CounterTable, RawTable, RosterTable};
use crate::sources::{SourceKind, SourceLoader, SourceSignature};
use crate::summary::{
    self, DataSummary, GroupLatestIncrements, LatestDayIncrements, TopAccount,
    YesterdayComparison,
};
use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, NaiveDate, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tikboard_common::{AccountId, DateRange, Result};
use tikboard_config::{Config, GroupMappingTable, GroupPageRule, SourceConfig};
use tracing::{debug, info, instrument, warn};

/// One immutable load: the typed inputs, the merge and its increments.
#[derive(Debug)]
pub struct SessionState {
    /// Roster the merge was made against
    pub roster: RosterTable,
    /// Click log, when one could be loaded
    pub clicks: Option<ClickTable>,
    /// Merge result
    pub merged: MergedTable,
    /// Increments of `merged`
    pub increments: IncrementAggregator,
    /// When this state was built
    pub loaded_at: DateTime<Utc>,
}

impl SessionState {
    /// Build a state, computing increments.
    pub fn new(roster: RosterTable, merged: MergedTable, clicks: Option<ClickTable>) -> Self {
        let increments = IncrementAggregator::new(&merged);
        Self {
            roster,
            clicks,
            merged,
            increments,
            loaded_at: Utc::now(),
        }
    }
}

/// Memo and state statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Decoded sources held in the memo
    pub memo_entries: u64,
    /// Whether a merged snapshot is available
    pub merged: bool,
}

/// Explicit per-session context passed to every query.
pub struct DashboardSession {
    config: Config,
    loader: SourceLoader,
    memo: Cache<SourceSignature, Arc<RawTable>>,
    mapping: ArcSwap<GroupMappingTable>,
    state: ArcSwapOption<SessionState>,
}

impl std::fmt::Debug for DashboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSession")
            .field("memo_entries", &self.memo.entry_count())
            .field("merged", &self.state.load().is_some())
            .finish_non_exhaustive()
    }
}

impl DashboardSession {
    /// Session fetching remote sources over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let loader = SourceLoader::http(Duration::from_secs(config.http.timeout_seconds))?;
        Ok(Self::with_loader(config, loader))
    }

    /// Session using the given loader.
    pub fn with_loader(config: Config, loader: SourceLoader) -> Self {
        let memo = Cache::builder()
            .max_capacity(config.cache.memo_capacity)
            .build();
        let mapping = ArcSwap::from_pointee(config.mapping_table());
        Self {
            config,
            loader,
            memo,
            mapping,
            state: ArcSwapOption::empty(),
        }
    }

    /// Configuration the session was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current mapping table.
    pub fn mapping(&self) -> Arc<GroupMappingTable> {
        self.mapping.load_full()
    }

    /// Replace the mapping table for this session only.
    pub fn set_mapping(&self, mapping: GroupMappingTable) {
        self.mapping.store(Arc::new(mapping));
    }

    /// Add or replace a group-to-page rule for this session only.
    pub fn add_page_rule(&self, rule: GroupPageRule) -> Result<()> {
        let mut mapping = (*self.mapping()).clone();
        mapping.add_page_rule(rule)?;
        self.set_mapping(mapping);
        Ok(())
    }

    /// Current merged state, if any.
    pub fn state(&self) -> Option<Arc<SessionState>> {
        self.state.load_full()
    }

    /// Memo and state statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            memo_entries: self.memo.entry_count(),
            merged: self.state.load().is_some(),
        }
    }

    /// Drop every memoised source.
    pub fn clear_memo(&self) {
        self.memo.invalidate_all();
    }

    /// Decode a source, reusing the memo when its signature is unchanged.
    #[instrument(skip(self, spec), fields(kind = %kind))]
    pub async fn load_source(&self, kind: SourceKind, spec: &SourceConfig) -> Result<Arc<RawTable>> {
        let signature = self.loader.resolve(kind, spec)?;
        if let Some(hit) = self.memo.get(&signature).await {
            debug!(location = %signature.location, "Memo hit");
            return Ok(hit);
        }
        let raw = Arc::new(self.loader.read(&signature).await?);
        self.memo.insert(signature, Arc::clone(&raw)).await;
        Ok(raw)
    }

    async fn load_tables(&self) -> Result<(RosterTable, CounterTable, Option<ClickTable>)> {
        let sources = &self.config.sources;
        let roster = RosterTable::from_raw(&*self.load_source(SourceKind::Roster, &sources.roster).await?)?;
        let counters =
            CounterTable::from_raw(&*self.load_source(SourceKind::Counters, &sources.counters).await?)?;

        let clicks = if sources.clicks.is_configured() {
            match self.load_source(SourceKind::Clicks, &sources.clicks).await {
                Ok(raw) => Some(ClickTable::from_raw(&raw)?),
                Err(err) if err.is_missing_source() => {
                    warn!(error = %err, "Click log unavailable, continuing without it");
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };
        Ok((roster, counters, clicks))
    }

    /// Load every source and merge.
    ///
    /// On failure the previous merged state is kept and the outcome carries
    /// the reason; callers check `success` before querying.
    #[instrument(skip(self))]
    pub async fn load_and_merge(&self) -> MergeOutcome {
        let result = match self.load_tables().await {
            Ok((roster, counters, clicks)) => {
                MergeEngine::merge(&counters, &roster).map(|merged| (roster, merged, clicks))
            }
            Err(err) => Err(err),
        };

        match result {
            Ok((roster, merged, clicks)) => {
                let outcome = MergeOutcome::merged(&merged);
                self.state
                    .store(Some(Arc::new(SessionState::new(roster, merged, clicks))));
                info!(message = %outcome.message, "Session state replaced");
                outcome
            }
            Err(err) => {
                warn!(error = %err, "Load and merge failed; keeping previous state");
                MergeOutcome::failed(err.to_string())
            }
        }
    }

    /// Install a state built from a snapshot.
    pub fn restore(&self, snapshot: Snapshot) -> MergeOutcome {
        let (roster, merged, clicks) = snapshot.into_tables();
        if merged.is_empty() {
            return MergeOutcome::failed("snapshot contains no merged rows");
        }
        let outcome = MergeOutcome::merged(&merged);
        self.state
            .store(Some(Arc::new(SessionState::new(roster, merged, clicks))));
        info!(rows = outcome.rows, "Restored session from snapshot");
        outcome
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.state().map(|state| Snapshot::from_state(&state))
    }

    /// Sorted distinct group tokens.
    pub fn available_groups(&self) -> Vec<String> {
        self.state()
            .map(|s| available_groups(&s.merged))
            .unwrap_or_default()
    }

    /// Headline numbers.
    pub fn data_summary(&self) -> Option<DataSummary> {
        let state = self.state()?;
        summary::data_summary(&state.merged, state.clicks.as_ref())
    }

    /// Latest day against the day before.
    pub fn yesterday_comparison(&self) -> Option<YesterdayComparison> {
        let state = self.state()?;
        summary::yesterday_comparison(&state.merged, &state.increments, state.clicks.as_ref())
    }

    /// Increments on `date` or the latest day.
    pub fn latest_day_increments(&self, date: Option<NaiveDate>) -> Option<LatestDayIncrements> {
        let state = self.state()?;
        summary::latest_day_increments(&state.increments, state.clicks.as_ref(), date)
    }

    /// Accounts ranked by last-day view increment.
    pub fn top_accounts(&self, range: DateRange, n: usize) -> Vec<TopAccount> {
        self.state()
            .map(|s| summary::top_accounts(&s.increments, &s.roster, range, n))
            .unwrap_or_default()
    }

    /// Per-keyword increments on `date` or the latest day.
    pub fn selected_groups_latest_increments(
        &self,
        keywords: &[String],
        date: Option<NaiveDate>,
    ) -> Vec<GroupLatestIncrements> {
        self.state()
            .map(|s| summary::selected_groups_latest_increments(&s.increments, keywords, date))
            .unwrap_or_default()
    }

    /// Daily increments over the completed axis.
    pub fn daily_increments(&self, query: &IncrementQuery) -> Vec<DailyIncrement> {
        self.state()
            .map(|s| s.increments.daily_increments(query))
            .unwrap_or_default()
    }

    /// Daily increments per group over the completed axis.
    pub fn group_daily_increments(&self, query: &IncrementQuery) -> Vec<GroupDailyIncrement> {
        self.state()
            .map(|s| s.increments.group_daily_increments(query))
            .unwrap_or_default()
    }

    /// Cumulative counters per day.
    pub fn daily_totals(&self, range: DateRange) -> Vec<DailyTotal> {
        self.state()
            .map(|s| s.increments.daily_totals(range))
            .unwrap_or_default()
    }

    /// Cumulative counters per day and group.
    pub fn group_daily_totals(&self, query: &IncrementQuery) -> Vec<GroupDailyTotal> {
        self.state()
            .map(|s| s.increments.group_daily_totals(query))
            .unwrap_or_default()
    }

    /// One account's history.
    pub fn account_history(&self, account: &AccountId, range: DateRange) -> Vec<IncrementRow> {
        self.state()
            .map(|s| s.increments.account_history(account, range))
            .unwrap_or_default()
    }

    fn with_analyzer<T: Default>(&self, f: impl FnOnce(&ClickConversionAnalyzer<'_>) -> T) -> T {
        let Some(state) = self.state() else {
            return T::default();
        };
        let Some(clicks) = state.clicks.as_ref() else {
            return T::default();
        };
        let mapping = self.mapping();
        let analyzer = ClickConversionAnalyzer::new(&mapping, &state.increments, clicks);
        f(&analyzer)
    }

    /// Conversion for every tracked link.
    pub fn link_conversions(&self, range: DateRange) -> Vec<LinkConversion> {
        self.with_analyzer(|a| a.link_conversions(range))
    }

    /// PV/UV per tracked link on the last click day.
    pub fn last_day_clicks_summary(&self, range: DateRange) -> Vec<LinkClickSummary> {
        self.with_analyzer(|a| a.last_day_clicks_summary(range))
    }

    /// Clicks against view increments for a page type.
    pub fn page_type_comparison(&self, page_type: &str, range: DateRange) -> Vec<PageTypeDay> {
        self.with_analyzer(|a| a.page_type_comparison(page_type, range))
    }

    /// Correlation of clicks and view increments for a page type.
    pub fn correlation(&self, page_type: &str, range: DateRange) -> Option<f64> {
        self.with_analyzer(|a| a.correlation(page_type, range))
    }

    /// Groups and the page types they map to.
    pub fn group_mapping_summary(&self) -> Option<GroupMappingSummary> {
        let state = self.state()?;
        let clicks = ClickTable::default();
        let mapping = self.mapping();
        let analyzer = ClickConversionAnalyzer::new(
            &mapping,
            &state.increments,
            state.clicks.as_ref().unwrap_or(&clicks),
        );
        Some(analyzer.group_mapping_summary())
    }

    /// Per-day click metrics.
    pub fn daily_click_metrics(&self) -> Vec<DailyClickMetrics> {
        self.state()
            .and_then(|s| s.clicks.as_ref().map(conversion::daily_click_metrics))
            .unwrap_or_default()
    }

    /// Click metrics for `date` or the latest click day.
    pub fn clicks_key_metrics(&self, date: Option<NaiveDate>) -> Option<DailyClickMetrics> {
        let state = self.state()?;
        conversion::clicks_key_metrics(state.clicks.as_ref()?, date)
    }

    /// Page types ranked by clicks.
    pub fn top_pages(&self, date: Option<NaiveDate>, n: usize) -> Vec<PageStats> {
        self.state()
            .and_then(|s| s.clicks.as_ref().map(|c| conversion::top_pages(c, date, n)))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::RemoteFetcher;
    use async_trait::async_trait;
    use tikboard_common::test_utils::{create_temp_dir, fixtures, write_fixture};
    use tikboard_common::DashError;

    struct NoNetwork;

    #[async_trait]
    impl RemoteFetcher for NoNetwork {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(DashError::network(format!("offline: {url}")))
        }
    }

    fn session_for(dir: &std::path::Path) -> DashboardSession {
        let roster = write_fixture(dir, "accounts.csv", fixtures::roster_csv());
        write_fixture(dir, "redash_data_1.csv", fixtures::counters_csv());
        let clicks = write_fixture(dir, "clicks.csv", fixtures::clicks_csv());

        let mut config = Config::default();
        config.sources.roster = SourceConfig::file(roster.to_string_lossy());
        config.sources.counters = SourceConfig::directory(dir.to_string_lossy(), "redash_data_");
        config.sources.clicks = SourceConfig::file(clicks.to_string_lossy());
        DashboardSession::with_loader(config, SourceLoader::new(Arc::new(NoNetwork)))
    }

    #[tokio::test]
    async fn test_queries_before_merge_are_empty() {
        let dir = create_temp_dir();
        let session = session_for(dir.path());
        assert!(session.state().is_none());
        assert!(session.daily_increments(&IncrementQuery::new()).is_empty());
        assert!(session.data_summary().is_none());
        assert!(session.link_conversions(DateRange::all()).is_empty());
    }

    #[tokio::test]
    async fn test_load_and_merge() {
        let dir = create_temp_dir();
        let session = session_for(dir.path());
        let outcome = session.load_and_merge().await;
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.rows, 5);
        assert_eq!(outcome.unmatched, 1);
        session.memo.run_pending_tasks().await;
        assert_eq!(session.stats().memo_entries, 3);

        let daily = session.daily_increments(&IncrementQuery::new());
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[1].increments.views, 110);
        assert_eq!(session.link_conversions(DateRange::all()).len(), 2);
        assert!(session.available_groups().contains(&"dance".to_string()));
    }

    #[tokio::test]
    async fn test_failed_merge_keeps_previous_state() {
        let dir = create_temp_dir();
        let session = session_for(dir.path());
        assert!(session.load_and_merge().await.success);
        let before = session.state().unwrap();

        std::fs::remove_file(dir.path().join("accounts.csv")).unwrap();
        let outcome = session.load_and_merge().await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("roster"));
        let after = session.state().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let dir = create_temp_dir();
        let session = session_for(dir.path());
        session.load_and_merge().await;
        let first = session.state().unwrap().merged.clone();
        session.clear_memo();
        session.load_and_merge().await;
        assert_eq!(session.state().unwrap().merged, first);
    }

    #[tokio::test]
    async fn test_missing_click_log_is_optional() {
        let dir = create_temp_dir();
        let session = session_for(dir.path());
        std::fs::remove_file(dir.path().join("clicks.csv")).unwrap();
        let outcome = session.load_and_merge().await;
        assert!(outcome.success);
        assert!(session.state().unwrap().clicks.is_none());
        assert!(session.daily_click_metrics().is_empty());
    }

    #[tokio::test]
    async fn test_mapping_changes_stay_in_session() {
        let dir = create_temp_dir();
        let a = session_for(dir.path());
        let b = session_for(dir.path());
        a.add_page_rule(GroupPageRule::new("dance", "videos")).unwrap();
        assert_eq!(a.mapping().page_type_for_group("dance"), "videos");
        assert_eq!(b.mapping().page_type_for_group("dance"), "other");
    }
}
