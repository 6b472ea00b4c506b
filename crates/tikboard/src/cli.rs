//! Command-line arguments.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tikboard_common::{parse_date, DateRange, Metric};

/// Daily growth and click-conversion analytics for a TikTok account roster
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Start from the configured snapshot instead of reading sources
    #[arg(long, global = true)]
    pub from_snapshot: bool,

    /// What to run
    #[command(subcommand)]
    pub command: Command,
}

/// Inclusive date filter shared by several commands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct RangeArgs {
    /// First day included (YYYY-MM-DD)
    #[arg(long, value_parser = parse_cli_date)]
    pub from: Option<NaiveDate>,

    /// Last day included (YYYY-MM-DD)
    #[arg(long, value_parser = parse_cli_date)]
    pub to: Option<NaiveDate>,
}

impl RangeArgs {
    /// Open-ended range from the two bounds.
    pub fn range(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }
}

/// Counter selected for increments and charts
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricArg {
    #[default]
    Views,
    Likes,
    Comments,
    Shares,
    Posts,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Views => Metric::Views,
            MetricArg::Likes => Metric::Likes,
            MetricArg::Comments => Metric::Comments,
            MetricArg::Shares => Metric::Shares,
            MetricArg::Posts => Metric::Posts,
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Headline numbers and the latest day against the day before
    Summary,

    /// Group tokens and the page types they map to
    Groups,

    /// Daily increments, optionally relabelled by keyword
    Increments {
        #[command(flatten)]
        range: RangeArgs,

        /// Keyword relabelling groups; the first matching keyword wins
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Keep accounts that match no keyword under their own group
        #[arg(long)]
        keep_unmatched: bool,

        /// One row per day and group
        #[arg(long)]
        by_group: bool,
    },

    /// Increments on the latest day for each keyword
    Latest {
        /// Keywords matched case-insensitively against group labels
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Day to report instead of the latest
        #[arg(long, value_parser = parse_cli_date)]
        date: Option<NaiveDate>,
    },

    /// Click-to-view conversion per tracked link
    Conversion {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Click-log metrics
    Clicks {
        /// Day to report instead of the latest
        #[arg(long, value_parser = parse_cli_date)]
        date: Option<NaiveDate>,

        /// Number of page types to list
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Clicks against view increments for one page type
    Compare {
        /// Page type (videos, download, other)
        #[arg(long, default_value = "videos")]
        page_type: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Accounts ranked by last-day view increment
    TopAccounts {
        #[command(flatten)]
        range: RangeArgs,

        /// Number of accounts
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Write CSV exports to the output directory
    Export {
        /// Directory instead of the configured output directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Render charts to the output directory
    Render {
        /// Counter to chart
        #[arg(long, value_enum, default_value_t = MetricArg::Views)]
        metric: MetricArg,

        /// Keyword relabelling groups in the group chart
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Directory instead of the configured output directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Save or inspect the warm-start snapshot
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

/// Snapshot subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SnapshotAction {
    /// Load sources and write the snapshot
    Save {
        /// Path instead of the configured snapshot path
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Read a snapshot and report what it holds
    Show {
        /// Path instead of the configured snapshot path
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("'{raw}' is not a date (expected YYYY-MM-DD)"))
}
