//! Chart rendering trait and the line-chart implementation

use crate::types::{ChartSpec, Series};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::path::Path;
use tikboard_common::{DashError, Result};
use tracing::{debug, info, instrument};

/// Trait for renderers that draw series into an image file
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// Render `series` to `path`
    async fn render_to_file(&self, spec: &ChartSpec, series: &[Series], path: &Path) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Parse a `#RRGGBB` colour; anything else is black
pub fn parse_color(color: &str) -> RGBColor {
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() == 6 && hex.is_ascii() {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return RGBColor(r, g, b);
            }
        }
    }
    RGBColor(0, 0, 0)
}

/// Axis bounds with x measured in days since `origin`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartRanges {
    /// Day mapped to x = 0
    pub origin: NaiveDate,
    /// Left edge in days
    pub x_min: f64,
    /// Right edge in days
    pub x_max: f64,
    /// Bottom edge
    pub y_min: f64,
    /// Top edge
    pub y_max: f64,
}

impl ChartRanges {
    /// Bounds covering every point, padded by 5%.
    ///
    /// A single day or a flat line still gets a non-empty range.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_series(series: &[Series]) -> Option<Self> {
        let points = series.iter().flat_map(|s| s.points.iter());
        let origin = points.clone().map(|p| p.date).min()?;

        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for point in points {
            let x = (point.date - origin).num_days() as f64;
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(point.value);
            y_max = y_max.max(point.value);
        }

        let x_padding = ((x_max - x_min) * 0.05).max(0.5);
        let y_padding = if y_max > y_min {
            (y_max - y_min) * 0.05
        } else {
            y_max.abs().max(1.0) * 0.1
        };

        Some(Self {
            origin,
            x_min: x_min - x_padding,
            x_max: x_max + x_padding,
            y_min: y_min - y_padding,
            y_max: y_max + y_padding,
        })
    }

    /// Position of `date` on the x axis.
    #[allow(clippy::cast_precision_loss)]
    pub fn x_of(&self, date: NaiveDate) -> f64 {
        (date - self.origin).num_days() as f64
    }

    /// Calendar label for an x position.
    #[allow(clippy::cast_possible_truncation)]
    pub fn label_for(&self, x: f64) -> String {
        (self.origin + Duration::days(x.round() as i64))
            .format("%m-%d")
            .to_string()
    }
}

fn size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Draw a line chart synchronously.
#[instrument(skip(spec, series), fields(title = %spec.title, series = series.len()))]
pub fn draw_line_chart(spec: &ChartSpec, series: &[Series], path: &Path) -> Result<()> {
    let ranges = ChartRanges::from_series(series)
        .ok_or_else(|| DashError::chart(format!("nothing to plot for '{}'", spec.title)))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let style = &spec.style;
    let root = BitMapBackend::new(path, (spec.width, spec.height)).into_drawing_area();
    root.fill(&parse_color(&style.background_color))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            &spec.title,
            (style.font_family.as_str(), f64::from(style.title_font_size)),
        )
        .margin(size(style.margin))
        .x_label_area_size(size(style.x_label_area))
        .y_label_area_size(size(style.y_label_area))
        .build_cartesian_2d(ranges.x_min..ranges.x_max, ranges.y_min..ranges.y_max)?;

    let x_labels = |x: &f64| ranges.label_for(*x);
    {
        let mut mesh = chart.configure_mesh();
        if !style.show_grid {
            mesh.disable_mesh();
        }
        mesh.x_label_formatter(&x_labels)
            .y_desc(spec.y_label.as_deref().unwrap_or(""))
            .draw()?;
    }

    for (i, line) in series.iter().enumerate().filter(|(_, s)| !s.is_empty()) {
        let color = match (&line.color, style.palette.is_empty()) {
            (Some(custom), _) => parse_color(custom),
            (None, false) => parse_color(&style.palette[i % style.palette.len()]),
            (None, true) => BLACK,
        };
        let points: Vec<(f64, f64)> = line
            .points
            .iter()
            .map(|p| (ranges.x_of(p.date), p.value))
            .collect();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(line.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
        debug!(series = %line.name, points = line.points.len(), "Drew series");
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    info!(path = %path.display(), "Rendered chart");
    Ok(())
}

/// Line chart with a calendar x axis
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendChartRenderer;

impl TrendChartRenderer {
    /// Renderer with the default look.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChartRenderer for TrendChartRenderer {
    async fn render_to_file(&self, spec: &ChartSpec, series: &[Series], path: &Path) -> Result<()> {
        let spec = spec.clone();
        let series = series.to_vec();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || draw_line_chart(&spec, &series, &path))
            .await
            .map_err(|e| DashError::chart_with_source("Chart task failed", e))?
    }

    fn name(&self) -> &'static str {
        "trend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataPoint;
    use tikboard_common::test_utils::ymd;

    #[test]
    fn test_color_parsing() {
        assert_eq!(parse_color("#1F77B4"), RGBColor(31, 119, 180));
        assert_eq!(parse_color("#ff0000"), RGBColor(255, 0, 0));
        assert_eq!(parse_color("red"), RGBColor(0, 0, 0));
        assert_eq!(parse_color("#ZZ0000"), RGBColor(0, 0, 0));
    }

    #[test]
    fn test_ranges_are_padded() {
        let series = vec![Series::new(
            "views",
            vec![
                DataPoint::new(ymd(2024, 1, 1), 10.0),
                DataPoint::new(ymd(2024, 1, 11), 110.0),
            ],
        )];
        let ranges = ChartRanges::from_series(&series).unwrap();
        assert_eq!(ranges.origin, ymd(2024, 1, 1));
        assert!(ranges.x_min < 0.0 && ranges.x_max > 10.0);
        assert!(ranges.y_min < 10.0 && ranges.y_max > 110.0);
        assert_eq!(ranges.x_of(ymd(2024, 1, 6)), 5.0);
        assert_eq!(ranges.label_for(5.2), "01-06");
    }

    #[test]
    fn test_degenerate_ranges() {
        let series = vec![Series::new("flat", vec![DataPoint::new(ymd(2024, 1, 1), 0.0)])];
        let ranges = ChartRanges::from_series(&series).unwrap();
        assert!(ranges.x_max > ranges.x_min);
        assert!(ranges.y_max > ranges.y_min);

        assert!(ChartRanges::from_series(&[]).is_none());
        assert!(ChartRanges::from_series(&[Series::new("empty", vec![])]).is_none());
    }

    #[tokio::test]
    async fn test_empty_chart_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrendChartRenderer::new()
            .render_to_file(&ChartSpec::default(), &[], &dir.path().join("x.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to plot"));
    }
}
