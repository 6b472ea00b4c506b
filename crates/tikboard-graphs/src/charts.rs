//! The standard dashboard chart set.

use crate::renderer::{ChartRenderer, TrendChartRenderer};
use crate::series::{
    click_metric_series, conversion_rate_series, conversion_series, daily_increment_series,
    group_increment_series,
};
use crate::types::{ChartSpec, Series};
use std::path::{Path, PathBuf};
use tikboard_common::{Metric, Result};
use tikboard_config::ChartSettings;
use tikboard_data::{DailyClickMetrics, DailyIncrement, GroupDailyIncrement, LinkConversion};
use tracing::{debug, info, instrument};

/// Aggregates the chart set is drawn from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartInputs<'a> {
    /// Summed daily increments
    pub daily: &'a [DailyIncrement],
    /// Daily increments per group
    pub groups: &'a [GroupDailyIncrement],
    /// Per-link conversion tables
    pub conversions: &'a [LinkConversion],
    /// Per-day click metrics
    pub clicks: &'a [DailyClickMetrics],
}

/// One chart to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartJob {
    /// Title, size and style
    pub spec: ChartSpec,
    /// Lines
    pub series: Vec<Series>,
    /// Output file
    pub path: PathBuf,
}

/// File-name-safe form of a label.
pub fn file_slug(label: &str) -> String {
    let slug: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "chart".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Renders the dashboard chart set into an output directory.
#[derive(Debug, Clone)]
pub struct DashboardCharts<R = TrendChartRenderer> {
    renderer: R,
    settings: ChartSettings,
    output_dir: PathBuf,
}

impl DashboardCharts<TrendChartRenderer> {
    /// Charts drawn to PNG files under `output_dir`.
    pub fn new(settings: ChartSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self::with_renderer(TrendChartRenderer::new(), settings, output_dir)
    }
}

impl<R: ChartRenderer> DashboardCharts<R> {
    /// Charts drawn by a custom renderer.
    pub fn with_renderer(renderer: R, settings: ChartSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            settings,
            output_dir: output_dir.into(),
        }
    }

    /// Where chart files are written.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn job(&self, title: String, y_label: &str, series: Vec<Series>, file: String) -> ChartJob {
        ChartJob {
            spec: ChartSpec::from_settings(title, &self.settings).with_y_label(y_label),
            series,
            path: self.output_dir.join(file),
        }
    }

    /// Charts that have data to show, in drawing order.
    pub fn plan(&self, inputs: &ChartInputs<'_>, metric: Metric) -> Vec<ChartJob> {
        let label = metric.label();
        let mut jobs = vec![
            self.job(
                format!("Daily {label} increment"),
                label,
                vec![daily_increment_series(inputs.daily, metric)],
                format!("daily_{label}.png"),
            ),
            self.job(
                format!("Daily {label} increment by group"),
                label,
                group_increment_series(inputs.groups, metric),
                format!("groups_{label}.png"),
            ),
        ];

        for conversion in inputs.conversions {
            let slug = file_slug(&conversion.group);
            jobs.push(self.job(
                format!("Clicks and views: {}", conversion.group),
                "count",
                conversion_series(conversion),
                format!("conversion_{slug}.png"),
            ));
            jobs.push(self.job(
                format!("Conversion rate: {}", conversion.group),
                "percent",
                conversion_rate_series(conversion),
                format!("conversion_rate_{slug}.png"),
            ));
        }

        jobs.push(self.job(
            "Daily clicks".to_string(),
            "count",
            click_metric_series(inputs.clicks),
            "clicks.png".to_string(),
        ));

        jobs.retain(|job| {
            let keep = job.series.iter().any(|s| !s.is_empty());
            if !keep {
                debug!(title = %job.spec.title, "Skipping chart without data");
            }
            keep
        });
        jobs
    }

    /// Render every planned chart; returns the written paths.
    #[instrument(skip(self, inputs), fields(renderer = self.renderer.name()))]
    pub async fn render_all(&self, inputs: &ChartInputs<'_>, metric: Metric) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for job in self.plan(inputs, metric) {
            self.renderer
                .render_to_file(&job.spec, &job.series, &job.path)
                .await?;
            written.push(job.path);
        }
        info!(charts = written.len(), dir = %self.output_dir.display(), "Rendered dashboard charts");
        Ok(written)
    }
}
