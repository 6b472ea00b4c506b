//! Typed tables built from raw CSV or spreadsheet payloads.
//!
//! Every source is first decoded into a [`RawTable`] (header row plus string
//! cells) and then projected into a typed table by column name. Column
//! lookup accepts a few aliases per field because the exports have used
//! different headers over time.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use tikboard_common::{
    parse_count, parse_date, parse_day_first_date, parse_timestamp, AccountId, DashError, Metric,
    MetricValues, ReportedDiffs, Result, UNKNOWN_PAGE_TYPE,
};
use tracing::{debug, warn};

/// Roster account-id column and its aliases.
pub const ROSTER_ID_COLUMNS: [&str; 3] = ["Tiktok ID", "account_id", "user_id"];
/// Roster group column and its aliases.
pub const ROSTER_GROUP_COLUMNS: [&str; 3] = ["Groups", "group_label", "group"];
/// Roster username column and its aliases.
pub const ROSTER_USERNAME_COLUMNS: [&str; 2] = ["Tiktok Username", "username"];
/// Roster follower column and its aliases.
pub const ROSTER_FOLLOWERS_COLUMNS: [&str; 2] = ["Total Followers", "follower_count"];
/// Roster like column and its aliases.
pub const ROSTER_LIKES_COLUMNS: [&str; 2] = ["Total Like", "total_like_count"];

/// Counter account-id column and its aliases.
pub const COUNTER_ID_COLUMNS: [&str; 3] = ["user_id", "account_id", "Tiktok ID"];
/// Counter ISO date column.
pub const COUNTER_DATE_COLUMN: &str = "date";
/// Counter day-first date column used by some exports.
pub const COUNTER_ALT_DATE_COLUMN: &str = "YMDdate";

/// Click timestamp column and its aliases.
pub const CLICK_TIME_COLUMNS: [&str; 2] = ["timestamp", "date"];

/// A decoded but untyped table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build from a header row and data rows. Header whitespace and a UTF-8 BOM are stripped.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self { headers, rows }
    }

    /// Decode delimited text. Short or long records are tolerated.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(headers, rows))
    }

    /// Decode the first worksheet of a workbook; its first row is the header.
    pub fn from_workbook_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| DashError::parse("workbook has no worksheets"))??;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| row.iter().map(cell_to_string).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .collect();
        Ok(Self::new(headers, rows))
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Data rows.
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Index of the first alias present. Exact matches win over case-insensitive ones.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
            .or_else(|| {
                aliases.iter().find_map(|alias| {
                    self.headers
                        .iter()
                        .position(|h| h.eq_ignore_ascii_case(alias))
                })
            })
    }

    /// Like [`RawTable::column`] but a missing column is a schema mismatch.
    pub fn require(&self, aliases: &[&str]) -> Result<usize> {
        self.column(aliases)
            .ok_or_else(|| DashError::schema_mismatch(aliases.join(" | "), &self.headers))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map_or("", String::as_str)
}

/// One roster account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Canonical account id
    pub account_id: AccountId,
    /// Free-form group label; `None` when the cell was blank
    pub group: Option<String>,
    /// Display handle
    pub username: Option<String>,
    /// Follower count at roster export time
    pub followers: i64,
    /// Lifetime likes at roster export time
    pub total_likes: i64,
}

/// Roster indexed by account id. The first row for an id wins.
#[derive(Debug, Clone, Default)]
pub struct RosterTable {
    entries: Vec<RosterEntry>,
    index: HashMap<AccountId, usize>,
    duplicates: usize,
}

impl RosterTable {
    /// Build from entries, keeping the first occurrence of each id.
    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            if table.index.contains_key(&entry.account_id) {
                table.duplicates += 1;
                continue;
            }
            table.index.insert(entry.account_id.clone(), table.entries.len());
            table.entries.push(entry);
        }
        table
    }

    /// Project a raw table. The id and group columns are required.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let id_col = raw.require(&ROSTER_ID_COLUMNS)?;
        let group_col = raw.require(&ROSTER_GROUP_COLUMNS)?;
        let username_col = raw.column(&ROSTER_USERNAME_COLUMNS);
        let followers_col = raw.column(&ROSTER_FOLLOWERS_COLUMNS);
        let likes_col = raw.column(&ROSTER_LIKES_COLUMNS);

        let mut skipped = 0usize;
        let entries: Vec<RosterEntry> = raw
            .rows()
            .filter_map(|row| {
                let Some(account_id) = AccountId::parse(cell(row, Some(id_col))) else {
                    skipped += 1;
                    return None;
                };
                let non_blank = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
                Some(RosterEntry {
                    account_id,
                    group: non_blank(cell(row, Some(group_col))),
                    username: non_blank(cell(row, username_col)),
                    followers: parse_count(cell(row, followers_col)),
                    total_likes: parse_count(cell(row, likes_col)),
                })
            })
            .collect();

        let table = Self::from_entries(entries);
        if skipped > 0 {
            warn!(skipped, "Dropped roster rows without an account id");
        }
        if table.duplicates > 0 {
            warn!(duplicates = table.duplicates, "Roster lists some accounts more than once; keeping the first row");
        }
        debug!(accounts = table.len(), "Parsed roster");
        Ok(table)
    }

    /// Look up an account.
    pub fn get(&self, account_id: &AccountId) -> Option<&RosterEntry> {
        self.index.get(account_id).map(|&i| &self.entries[i])
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Number of distinct accounts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows ignored because their id was already present.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// One account's cumulative counters on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Canonical account id
    pub account_id: AccountId,
    /// Snapshot day
    pub date: NaiveDate,
    /// Cumulative counters
    pub counts: MetricValues,
    /// Differences supplied by the export, if any
    pub reported: ReportedDiffs,
}

/// Daily counter export.
#[derive(Debug, Clone, Default)]
pub struct CounterTable {
    records: Vec<CounterRecord>,
    dropped: usize,
}

impl CounterTable {
    /// Build from already typed records.
    pub fn from_records(records: Vec<CounterRecord>) -> Self {
        Self { records, dropped: 0 }
    }

    /// Project a raw table.
    ///
    /// Requires an account-id column and either `date` or the day-first
    /// `YMDdate`. Missing counter columns read as zero; rows whose date does
    /// not parse are dropped.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let id_col = raw.require(&COUNTER_ID_COLUMNS)?;
        let (date_col, day_first) = match raw.column(&[COUNTER_DATE_COLUMN]) {
            Some(idx) => (idx, false),
            None => (
                raw.require(&[COUNTER_DATE_COLUMN, COUNTER_ALT_DATE_COLUMN])?,
                true,
            ),
        };
        let count_cols: Vec<(Metric, Option<usize>)> = Metric::ALL
            .into_iter()
            .map(|m| (m, raw.column(&[m.count_column()])))
            .collect();
        let diff_cols: Vec<(Metric, Option<usize>)> = Metric::ALL
            .into_iter()
            .map(|m| (m, raw.column(&[m.diff_column()])))
            .collect();

        let mut dropped = 0usize;
        let mut records = Vec::with_capacity(raw.len());
        for row in raw.rows() {
            let date_cell = cell(row, Some(date_col));
            let date = if day_first {
                parse_day_first_date(date_cell)
            } else {
                parse_date(date_cell)
            };
            let (Some(account_id), Some(date)) = (AccountId::parse(cell(row, Some(id_col))), date)
            else {
                dropped += 1;
                continue;
            };

            let mut counts = MetricValues::default();
            for &(metric, col) in &count_cols {
                counts.set(metric, parse_count(cell(row, col)));
            }
            let mut reported = ReportedDiffs::default();
            for &(metric, col) in &diff_cols {
                reported.set(metric, col.map(|c| parse_count(cell(row, Some(c)))));
            }

            records.push(CounterRecord {
                account_id,
                date,
                counts,
                reported,
            });
        }

        if dropped > 0 {
            warn!(dropped, "Dropped counter rows with unparseable date or blank account id");
        }
        debug!(rows = records.len(), "Parsed counter export");
        Ok(Self { records, dropped })
    }

    /// Records in file order.
    pub fn records(&self) -> &[CounterRecord] {
        &self.records
    }

    /// Number of usable rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no usable rows were found.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped while parsing.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// One landing-page click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickRecord {
    /// When the click happened
    pub timestamp: NaiveDateTime,
    /// `timestamp` truncated to the day
    pub date: NaiveDate,
    /// Browsing session
    pub session_id: String,
    /// Visitor
    pub visitor_id: String,
    /// Landing page as clicked (query string included)
    pub page_url: String,
    /// Page category
    pub page_type: String,
}

/// Click log.
#[derive(Debug, Clone, Default)]
pub struct ClickTable {
    records: Vec<ClickRecord>,
    dropped: usize,
}

impl ClickTable {
    /// Build from already typed records.
    pub fn from_records(records: Vec<ClickRecord>) -> Self {
        Self { records, dropped: 0 }
    }

    /// Project a raw table. Timestamp, session and visitor columns are required.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let time_col = raw.require(&CLICK_TIME_COLUMNS)?;
        let session_col = raw.require(&["session_id"])?;
        let visitor_col = raw.require(&["visitor_id"])?;
        let url_col = raw.column(&["page_url"]);
        let type_col = raw.column(&["page_type"]);

        let mut dropped = 0usize;
        let mut records = Vec::with_capacity(raw.len());
        for row in raw.rows() {
            let Some(timestamp) = parse_timestamp(cell(row, Some(time_col))) else {
                dropped += 1;
                continue;
            };
            let page_type = cell(row, type_col);
            records.push(ClickRecord {
                timestamp,
                date: timestamp.date(),
                session_id: cell(row, Some(session_col)).to_string(),
                visitor_id: cell(row, Some(visitor_col)).to_string(),
                page_url: cell(row, url_col).to_string(),
                page_type: if page_type.is_empty() {
                    UNKNOWN_PAGE_TYPE.to_string()
                } else {
                    page_type.to_string()
                },
            });
        }

        if dropped > 0 {
            warn!(dropped, "Dropped click rows with unparseable timestamp");
        }
        debug!(rows = records.len(), "Parsed click log");
        Ok(Self { records, dropped })
    }

    /// Records in file order.
    pub fn records(&self) -> &[ClickRecord] {
        &self.records
    }

    /// Number of usable rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no usable rows were found.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped while parsing.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// First and last click day.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tikboard_common::test_utils::{fixtures, ymd};

    #[test]
    fn test_csv_decoding_trims_and_skips_blank_rows() {
        let raw = RawTable::from_csv_bytes(b"\xEF\xBB\xBF a , b \n1, 2\n,\n3,4,5\n").unwrap();
        assert_eq!(raw.headers(), ["a", "b"]);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.column(&["B"]), Some(1));
        assert_eq!(raw.column(&["missing", "a"]), Some(0));
    }

    #[test]
    fn test_roster_parsing() {
        let raw = RawTable::from_csv_bytes(fixtures::roster_csv().as_bytes()).unwrap();
        let roster = RosterTable::from_raw(&raw).unwrap();
        assert_eq!(roster.len(), 2);

        let b = roster.get(&AccountId::parse("B").unwrap()).unwrap();
        assert_eq!(b.group.as_deref(), Some("wan_produce101, dance"));
        assert_eq!(b.username.as_deref(), Some("bob_tt"));
        assert_eq!(b.followers, 800);
    }

    #[test]
    fn test_roster_missing_id_column_names_present_columns() {
        let raw = RawTable::from_csv_bytes(b"name,Groups\nx,g\n").unwrap();
        let err = RosterTable::from_raw(&raw).unwrap_err();
        match err {
            DashError::SchemaMismatch { expected, present } => {
                assert!(expected.contains("Tiktok ID"));
                assert_eq!(present, vec!["name".to_string(), "Groups".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_roster_duplicates_keep_first() {
        let raw =
            RawTable::from_csv_bytes(b"Tiktok ID,Groups\n7.0,first\n7,second\n,blank\n").unwrap();
        let roster = RosterTable::from_raw(&raw).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.duplicates(), 1);
        let entry = roster.get(&AccountId::parse("7").unwrap()).unwrap();
        assert_eq!(entry.group.as_deref(), Some("first"));
    }

    #[test]
    fn test_counter_parsing() {
        let raw = RawTable::from_csv_bytes(fixtures::counters_csv().as_bytes()).unwrap();
        let counters = CounterTable::from_raw(&raw).unwrap();
        assert_eq!(counters.len(), 5);
        let first = &counters.records()[0];
        assert_eq!(first.date, ymd(2024, 1, 1));
        assert_eq!(first.counts.views, 100);
        assert_eq!(first.reported.views, None);
    }

    #[test]
    fn test_counter_alternate_date_and_coercion() {
        let raw = RawTable::from_csv_bytes(
            b"user_id,YMDdate,view_count,view_diff\n1,05/01/24,abc,7\n1,bad,10,1\n2,06/01/24,12,\n",
        )
        .unwrap();
        let counters = CounterTable::from_raw(&raw).unwrap();
        assert_eq!(counters.len(), 2);
        assert_eq!(counters.dropped(), 1);

        let first = &counters.records()[0];
        assert_eq!(first.date, ymd(2024, 1, 5));
        assert_eq!(first.counts.views, 0);
        assert_eq!(first.counts.likes, 0);
        assert_eq!(first.reported.views, Some(7));
        assert_eq!(counters.records()[1].reported.views, Some(0));
    }

    #[test]
    fn test_counter_without_date_column() {
        let raw = RawTable::from_csv_bytes(b"user_id,view_count\n1,2\n").unwrap();
        assert!(matches!(
            CounterTable::from_raw(&raw),
            Err(DashError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_click_parsing() {
        let raw = RawTable::from_csv_bytes(fixtures::clicks_csv().as_bytes()).unwrap();
        let clicks = ClickTable::from_raw(&raw).unwrap();
        assert_eq!(clicks.len(), 4);
        assert_eq!(clicks.records()[0].date, ymd(2024, 1, 1));
        assert_eq!(clicks.date_bounds(), Some((ymd(2024, 1, 1), ymd(2024, 1, 2))));
    }

    #[test]
    fn test_click_offset_keeps_wall_clock_day() {
        let raw = RawTable::from_csv_bytes(
            b"timestamp,session_id,visitor_id\n2024-01-05T03:00:00+08:00,s,v\n",
        )
        .unwrap();
        let clicks = ClickTable::from_raw(&raw).unwrap();
        assert_eq!(clicks.records()[0].date, ymd(2024, 1, 5));
    }

    #[test]
    fn test_click_defaults_and_drops() {
        let raw = RawTable::from_csv_bytes(
            b"timestamp,session_id,visitor_id\n2024-02-01 10:00:00,s,v\nlater,s2,v2\n",
        )
        .unwrap();
        let clicks = ClickTable::from_raw(&raw).unwrap();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks.dropped(), 1);
        assert_eq!(clicks.records()[0].page_type, "unknown");
        assert_eq!(clicks.records()[0].page_url, "");
    }
}
