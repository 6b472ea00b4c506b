//! Command execution over one dashboard session.

use crate::cli::{Command, SnapshotAction};
use crate::error::{AppError, AppResult};
use crate::report;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tikboard_common::{DateRange, Metric};
use tikboard_config::Config;
use tikboard_data::{
    export_click_metrics, export_conversions, export_daily_increments, export_group_increments,
    export_merged, DashboardSession, IncrementQuery, MergeOutcome, Snapshot,
};
use tikboard_graphs::{ChartInputs, DashboardCharts};
use tracing::{info, instrument};

/// Snapshot file name used when no path is configured.
pub const DEFAULT_SNAPSHOT_FILE: &str = "snapshot.json";

/// A command's result in both output forms.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// Structured result, printed with `--json`
    pub json: Value,
    /// Human-readable report
    pub text: String,
}

impl Rendered {
    fn new(value: &impl Serialize, text: String) -> AppResult<Self> {
        Ok(Self {
            json: serde_json::to_value(value)?,
            text,
        })
    }
}

/// The command-line application.
#[derive(Debug)]
pub struct App {
    session: DashboardSession,
}

impl App {
    /// Application over a fresh session with the HTTP fetcher.
    pub fn new(config: Config) -> AppResult<Self> {
        Ok(Self::with_session(DashboardSession::new(config)?))
    }

    /// Application over an existing session.
    pub fn with_session(session: DashboardSession) -> Self {
        Self { session }
    }

    /// The underlying session.
    pub fn session(&self) -> &DashboardSession {
        &self.session
    }

    fn config(&self) -> &Config {
        self.session.config()
    }

    /// Snapshot location: explicit, configured, or inside the output directory.
    pub fn snapshot_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit.map(Path::to_path_buf).unwrap_or_else(|| {
            self.config().cache.snapshot_path.as_ref().map_or_else(
                || self.config().output_path().join(DEFAULT_SNAPSHOT_FILE),
                PathBuf::from,
            )
        })
    }

    /// Populate the session from sources or from the snapshot.
    #[instrument(skip(self))]
    pub async fn prepare(&self, from_snapshot: bool) -> AppResult<MergeOutcome> {
        let outcome = if from_snapshot {
            let snapshot = Snapshot::load(self.snapshot_path(None)).await?;
            self.session.restore(snapshot)
        } else {
            self.session.load_and_merge().await
        };
        if outcome.success {
            info!(message = %outcome.message, "Session ready");
            Ok(outcome)
        } else {
            Err(AppError::Load(outcome.message))
        }
    }

    /// Run one command.
    pub async fn execute(&self, command: &Command, from_snapshot: bool) -> AppResult<Rendered> {
        if let Command::Snapshot {
            action: SnapshotAction::Show { path },
        } = command
        {
            return self.show_snapshot(path.as_deref()).await;
        }
        self.prepare(from_snapshot).await?;
        self.run(command).await
    }

    async fn run(&self, command: &Command) -> AppResult<Rendered> {
        let session = &self.session;
        match command {
            Command::Summary => {
                let data = session
                    .data_summary()
                    .ok_or_else(|| AppError::NoData("nothing merged".to_string()))?;
                let yesterday = session.yesterday_comparison();
                let latest = session.latest_day_increments(None);
                let text = report::summary(&data, yesterday.as_ref(), latest.as_ref());
                Rendered::new(
                    &json!({ "summary": data, "yesterday": yesterday, "latest": latest }),
                    text,
                )
            }
            Command::Groups => {
                let tokens = session.available_groups();
                let mapping = session.group_mapping_summary();
                let text = report::groups(&tokens, mapping.as_ref());
                Rendered::new(&json!({ "groups": tokens, "mapping": mapping }), text)
            }
            Command::Increments {
                range,
                keywords,
                keep_unmatched,
                by_group,
            } => {
                let query = IncrementQuery::new()
                    .with_range(range.range())
                    .with_keywords(keywords.iter().cloned())
                    .keep_unmatched(*keep_unmatched);
                if *by_group {
                    let rows = session.group_daily_increments(&query);
                    Rendered::new(&rows, report::group_increments(&rows))
                } else {
                    let rows = session.daily_increments(&query);
                    Rendered::new(&rows, report::daily_increments(&rows))
                }
            }
            Command::Latest { keywords, date } => {
                let rows = session.selected_groups_latest_increments(keywords, *date);
                Rendered::new(&rows, report::latest_groups(&rows))
            }
            Command::Conversion { range } => {
                let rows = session.link_conversions(range.range());
                let last_day = session.last_day_clicks_summary(range.range());
                let text = report::conversions(&rows, &last_day);
                Rendered::new(&json!({ "links": rows, "last_day": last_day }), text)
            }
            Command::Clicks { date, top } => {
                let key = session.clicks_key_metrics(*date);
                let pages = session.top_pages(*date, *top);
                let text = report::clicks(key.as_ref(), &pages);
                Rendered::new(
                    &json!({ "metrics": key, "daily": session.daily_click_metrics(), "top_pages": pages }),
                    text,
                )
            }
            Command::Compare { page_type, range } => {
                let rows = session.page_type_comparison(page_type, range.range());
                let correlation = session.correlation(page_type, range.range());
                let text = report::compare(page_type, &rows, correlation);
                Rendered::new(&json!({ "days": rows, "correlation": correlation }), text)
            }
            Command::TopAccounts { range, limit } => {
                let rows = session.top_accounts(range.range(), *limit);
                Rendered::new(&rows, report::top_accounts(&rows))
            }
            Command::Export { dir } => {
                let written = self.export(dir.as_deref())?;
                let text = written
                    .iter()
                    .map(|(p, rows)| format!("{} ({rows} rows)", p.display()))
                    .collect::<Vec<_>>()
                    .join("\n");
                Rendered::new(&json!({ "files": written }), text)
            }
            Command::Render {
                metric,
                keywords,
                dir,
            } => {
                let written = self
                    .render(Metric::from(*metric), keywords, dir.as_deref())
                    .await?;
                let text = written
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                Rendered::new(&json!({ "charts": written }), text)
            }
            Command::Snapshot { action } => match action {
                SnapshotAction::Save { path } => {
                    let target = self.snapshot_path(path.as_deref());
                    let snapshot = session
                        .snapshot()
                        .ok_or_else(|| AppError::NoData("nothing merged".to_string()))?;
                    snapshot.save(&target).await?;
                    Rendered::new(
                        &json!({ "path": target, "rows": snapshot.merged.len() }),
                        format!("Saved {} rows to {}", snapshot.merged.len(), target.display()),
                    )
                }
                SnapshotAction::Show { path } => self.show_snapshot(path.as_deref()).await,
            },
        }
    }

    async fn show_snapshot(&self, path: Option<&Path>) -> AppResult<Rendered> {
        let target = self.snapshot_path(path);
        let snapshot = Snapshot::load(&target).await?;
        let bounds = snapshot.merged.date_bounds();
        let text = format!(
            "{}: {} rows, {} roster entries, {} clicks, taken {}{}",
            target.display(),
            snapshot.merged.len(),
            snapshot.roster.len(),
            snapshot.clicks.as_ref().map_or(0, Vec::len),
            snapshot.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            bounds.map_or_else(String::new, |(a, b)| format!(", covering {a} .. {b}")),
        );
        Rendered::new(
            &json!({
                "path": target,
                "version": snapshot.version,
                "created_at": snapshot.created_at,
                "rows": snapshot.merged.len(),
                "date_range": bounds,
            }),
            text,
        )
    }

    /// Write the CSV exports; returns each file with its row count.
    pub fn export(&self, dir: Option<&Path>) -> AppResult<Vec<(PathBuf, usize)>> {
        let dir = dir.map_or_else(|| self.config().output_path(), Path::to_path_buf);
        let state = self
            .session
            .state()
            .ok_or_else(|| AppError::NoData("nothing merged".to_string()))?;
        let query = IncrementQuery::new();

        let mut written = Vec::new();
        let path = dir.join("merged.csv");
        written.push((path.clone(), export_merged(&path, &state.merged)?));
        let path = dir.join("daily_increments.csv");
        let rows = export_daily_increments(&path, &self.session.daily_increments(&query))?;
        written.push((path, rows));
        let path = dir.join("group_increments.csv");
        let rows = export_group_increments(&path, &self.session.group_daily_increments(&query))?;
        written.push((path, rows));

        if state.clicks.is_some() {
            let path = dir.join("conversion.csv");
            let rows = export_conversions(&path, &self.session.link_conversions(DateRange::all()))?;
            written.push((path, rows));
            let path = dir.join("click_metrics.csv");
            let rows = export_click_metrics(&path, &self.session.daily_click_metrics())?;
            written.push((path, rows));
        }
        Ok(written)
    }

    /// Render the chart set; returns the written files.
    pub async fn render(
        &self,
        metric: Metric,
        keywords: &[String],
        dir: Option<&Path>,
    ) -> AppResult<Vec<PathBuf>> {
        let dir = dir.map_or_else(|| self.config().output_path(), Path::to_path_buf);
        let daily = self.session.daily_increments(&IncrementQuery::new());
        let groups = self.session.group_daily_increments(
            &IncrementQuery::new()
                .with_keywords(keywords.iter().cloned())
                .keep_unmatched(keywords.is_empty()),
        );
        let conversions = self.session.link_conversions(DateRange::all());
        let clicks = self.session.daily_click_metrics();

        let charts = DashboardCharts::new(self.config().charts.clone(), dir);
        let inputs = ChartInputs {
            daily: &daily,
            groups: &groups,
            conversions: &conversions,
            clicks: &clicks,
        };
        Ok(charts.render_all(&inputs, metric).await?)
    }
}
