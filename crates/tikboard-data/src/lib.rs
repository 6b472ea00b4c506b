//! # tikboard data
//!
//! Loads the account roster, the daily counter export and the click log,
//! merges counters onto the roster and derives daily increments, per-group
//! breakdowns and click-to-view conversion.
//!
//! Loading is async; everything after the merge is plain synchronous
//! aggregation over immutable tables. A [`DashboardSession`] ties the two
//! together for one user.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod classify;
pub mod conversion;
pub mod export;
pub mod increments;
pub mod merge;
pub mod records;
pub mod session;
pub mod sources;
pub mod summary;

pub use classify::{available_groups, split_group_label, GroupClassifier, MatchMode};
pub use conversion::{
    clicks_key_metrics, daily_click_metrics, pearson, top_pages, ClickConversionAnalyzer,
    ConversionDay, DailyClickMetrics, GroupMappingRow, GroupMappingSummary, LinkClickSummary,
    LinkConversion, PageStats, PageTypeDay,
};
pub use export::{
    export_click_metrics, export_conversions, export_daily_increments, export_group_increments,
    export_merged, Snapshot, SNAPSHOT_VERSION,
};
pub use increments::{
    compute_increments, DailyIncrement, DailyTotal, GroupDailyIncrement, GroupDailyTotal,
    IncrementAggregator, IncrementQuery, IncrementRow,
};
pub use merge::{MergeEngine, MergeOutcome, MergedRow, MergedTable};
pub use records::{
    ClickRecord, ClickTable, CounterRecord, CounterTable, RawTable, RosterEntry, RosterTable,
};
pub use session::{DashboardSession, SessionState, SessionStats};
pub use sources::{
    latest_file, HttpFetcher, RemoteFetcher, SourceKind, SourceLoader, SourceLocation,
    SourceSignature,
};
pub use summary::{
    data_summary, latest_day_increments, selected_groups_latest_increments, top_accounts,
    yesterday_comparison, ClickDataSummary, DataSummary, GroupLatestIncrements,
    LatestDayIncrements, TopAccount, ValueComparison, YesterdayComparison,
};
