//! Common type definitions and newtype wrappers for domain modeling.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Group label given to counter rows whose account has no roster match.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Page type used when no group-to-page rule matches.
pub const OTHER_PAGE_TYPE: &str = "other";

/// Page type assigned to click rows without one.
pub const UNKNOWN_PAGE_TYPE: &str = "unknown";

/// Group returned for links with no link-to-group rule.
pub const UNKNOWN_LINK_GROUP: &str = "unknown";

/// Canonical account identifier shared by the roster and the counter export.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Canonicalise a raw cell value.
    ///
    /// Whitespace is trimmed and spreadsheet float renderings of integral ids
    /// (`"7123.0"`) lose their fractional part. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let canonical = match trimmed.split_once('.') {
            Some((int, frac))
                if !int.is_empty()
                    && int.chars().all(|c| c.is_ascii_digit())
                    && frac.chars().all(|c| c == '0') =>
            {
                int
            }
            _ => trimmed,
        };
        Some(Self(canonical.to_string()))
    }

    /// Borrow the canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the five engagement counters tracked per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Video views
    Views,
    /// Likes
    Likes,
    /// Comments
    Comments,
    /// Shares
    Shares,
    /// Published posts
    Posts,
}

impl Metric {
    /// All metrics in display order.
    pub const ALL: [Metric; 5] = [
        Metric::Views,
        Metric::Likes,
        Metric::Comments,
        Metric::Shares,
        Metric::Posts,
    ];

    /// Column holding the cumulative counter in the export.
    pub fn count_column(self) -> &'static str {
        match self {
            Metric::Views => "view_count",
            Metric::Likes => "like_count",
            Metric::Comments => "comment_count",
            Metric::Shares => "share_count",
            Metric::Posts => "post_count",
        }
    }

    /// Column holding the export's own daily difference, when supplied.
    pub fn diff_column(self) -> &'static str {
        match self {
            Metric::Views => "view_diff",
            Metric::Likes => "like_diff",
            Metric::Comments => "comment_diff",
            Metric::Shares => "share_diff",
            Metric::Posts => "post_diff",
        }
    }

    /// Short human label.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Views => "views",
            Metric::Likes => "likes",
            Metric::Comments => "comments",
            Metric::Shares => "shares",
            Metric::Posts => "posts",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| {
                m.label() == lowered
                    || m.count_column() == lowered
                    || m.label().trim_end_matches('s') == lowered
            })
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// A value for each of the five metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricValues {
    /// Views
    pub views: i64,
    /// Likes
    pub likes: i64,
    /// Comments
    pub comments: i64,
    /// Shares
    pub shares: i64,
    /// Posts
    pub posts: i64,
}

impl MetricValues {
    /// Read one metric.
    pub fn get(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Views => self.views,
            Metric::Likes => self.likes,
            Metric::Comments => self.comments,
            Metric::Shares => self.shares,
            Metric::Posts => self.posts,
        }
    }

    /// Write one metric.
    pub fn set(&mut self, metric: Metric, value: i64) {
        match metric {
            Metric::Views => self.views = value,
            Metric::Likes => self.likes = value,
            Metric::Comments => self.comments = value,
            Metric::Shares => self.shares = value,
            Metric::Posts => self.posts = value,
        }
    }
}

// Counters saturate at the i64 bounds instead of overflowing.
impl Add for MetricValues {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            views: self.views.saturating_add(rhs.views),
            likes: self.likes.saturating_add(rhs.likes),
            comments: self.comments.saturating_add(rhs.comments),
            shares: self.shares.saturating_add(rhs.shares),
            posts: self.posts.saturating_add(rhs.posts),
        }
    }
}

impl AddAssign for MetricValues {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for MetricValues {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            views: self.views.saturating_sub(rhs.views),
            likes: self.likes.saturating_sub(rhs.likes),
            comments: self.comments.saturating_sub(rhs.comments),
            shares: self.shares.saturating_sub(rhs.shares),
            posts: self.posts.saturating_sub(rhs.posts),
        }
    }
}

/// Daily differences reported by the export itself; `None` when the column was absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedDiffs {
    /// `view_diff`
    pub views: Option<i64>,
    /// `like_diff`
    pub likes: Option<i64>,
    /// `comment_diff`
    pub comments: Option<i64>,
    /// `share_diff`
    pub shares: Option<i64>,
    /// `post_diff`
    pub posts: Option<i64>,
}

impl ReportedDiffs {
    /// Read one reported difference.
    pub fn get(&self, metric: Metric) -> Option<i64> {
        match metric {
            Metric::Views => self.views,
            Metric::Likes => self.likes,
            Metric::Comments => self.comments,
            Metric::Shares => self.shares,
            Metric::Posts => self.posts,
        }
    }

    /// Write one reported difference.
    pub fn set(&mut self, metric: Metric, value: Option<i64>) {
        match metric {
            Metric::Views => self.views = value,
            Metric::Likes => self.likes = value,
            Metric::Comments => self.comments = value,
            Metric::Shares => self.shares = value,
            Metric::Posts => self.posts = value,
        }
    }

    /// Prefer the reported value, falling back to the supplied computed values.
    pub fn or_computed(&self, computed: MetricValues) -> MetricValues {
        let mut out = computed;
        for metric in Metric::ALL {
            if let Some(v) = self.get(metric) {
                out.set(metric, v);
            }
        }
        out
    }
}

/// Inclusive, optionally open-ended calendar range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included
    pub start: Option<NaiveDate>,
    /// Last day included
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    /// Range with both ends set.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Range with optional ends.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Whether `date` lies within the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |d: Option<NaiveDate>| d.map_or_else(|| "*".to_string(), |d| d.to_string());
        write!(f, "{}..={}", show(self.start), show(self.end))
    }
}
