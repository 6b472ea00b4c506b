//! # tikboard graphs
//!
//! Line charts for daily increments, group breakdowns and click conversion,
//! rendered to PNG with plotters.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod charts;
pub mod renderer;
pub mod series;
pub mod types;

pub use charts::{file_slug, ChartInputs, ChartJob, DashboardCharts};
pub use renderer::{draw_line_chart, parse_color, ChartRanges, ChartRenderer, TrendChartRenderer};
pub use series::*;
pub use types::{ChartSpec, ChartStyle, DataPoint, Series};
