//! Chart data and styling types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tikboard_config::ChartSettings;

/// One value on one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Day on the x axis
    pub date: NaiveDate,
    /// Value on the y axis
    pub value: f64,
}

impl DataPoint {
    /// Point for `date`.
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A named line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Legend label
    pub name: String,
    /// Points in date order
    pub points: Vec<DataPoint>,
    /// Overrides the palette colour when set
    pub color: Option<String>,
}

impl Series {
    /// Series drawn in the next palette colour.
    pub fn new(name: impl Into<String>, points: Vec<DataPoint>) -> Self {
        Self {
            name: name.into(),
            points,
            color: None,
        }
    }

    /// Fix the line colour.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Visual styling shared by every chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    /// Fill behind the plot, `#RRGGBB`
    pub background_color: String,
    /// Line colours cycled per series
    pub palette: Vec<String>,
    /// Draw mesh lines
    pub show_grid: bool,
    /// Caption size in points
    pub title_font_size: u32,
    /// Font for captions and labels
    pub font_family: String,
    /// Outer margin in pixels
    pub margin: u32,
    /// Height of the x label area
    pub x_label_area: u32,
    /// Width of the y label area
    pub y_label_area: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::from(&ChartSettings::default())
    }
}

impl From<&ChartSettings> for ChartStyle {
    fn from(settings: &ChartSettings) -> Self {
        Self {
            background_color: settings.background_color.clone(),
            palette: settings.palette.clone(),
            show_grid: settings.show_grid,
            title_font_size: settings.title_font_size,
            font_family: "sans-serif".to_string(),
            margin: 20,
            x_label_area: 40,
            y_label_area: 70,
        }
    }
}

/// What to draw and how large
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Caption
    pub title: String,
    /// Y axis description
    pub y_label: Option<String>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Colours and layout
    pub style: ChartStyle,
}

impl ChartSpec {
    /// A chart sized and styled from the configured chart settings.
    pub fn from_settings(title: impl Into<String>, settings: &ChartSettings) -> Self {
        Self {
            title: title.into(),
            y_label: None,
            width: settings.width,
            height: settings.height,
            style: ChartStyle::from(settings),
        }
    }

    /// Set the y axis description.
    #[must_use]
    pub fn with_y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = Some(label.into());
        self
    }
}

impl Default for ChartSpec {
    fn default() -> Self {
        Self::from_settings("Chart", &ChartSettings::default())
    }
}
