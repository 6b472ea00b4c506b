//! Plain-text rendering of command results.

use tikboard_common::{Metric, MetricValues};
use tikboard_data::{
    DailyClickMetrics, DailyIncrement, DataSummary, GroupDailyIncrement, GroupLatestIncrements,
    GroupMappingSummary, LatestDayIncrements, LinkClickSummary, LinkConversion, PageStats,
    PageTypeDay, TopAccount, ValueComparison, YesterdayComparison,
};

fn values_line(values: &MetricValues) -> String {
    Metric::ALL
        .iter()
        .map(|m| format!("{} {:+}", m.label(), values.get(*m)))
        .collect::<Vec<_>>()
        .join("  ")
}

fn comparison(label: &str, value: &ValueComparison) -> String {
    format!(
        "  {label:<18} {:>12} (prev {}, {:+}, {:+.2}%)",
        value.current, value.previous, value.diff, value.pct
    )
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:+.2}%"))
}

/// Headline numbers, the yesterday comparison and the latest day.
pub fn summary(
    data: &DataSummary,
    yesterday: Option<&YesterdayComparison>,
    latest: Option<&LatestDayIncrements>,
) -> String {
    let mut lines = vec![
        format!("Records:       {}", data.total_records),
        format!("Accounts:      {}", data.unique_accounts),
        format!("Total views:   {}", data.total_views),
        format!("Date range:    {} .. {}", data.date_range.0, data.date_range.1),
        format!(
            "Matched:       {} of {} ({:.2}%), unmatched {}",
            data.matched_records, data.total_records, data.match_rate, data.unmatched_records
        ),
    ];
    if let Some(clicks) = &data.clicks {
        let span = clicks
            .date_range
            .map_or_else(String::new, |(a, b)| format!(" ({a} .. {b})"));
        lines.push(format!(
            "Clicks:        {} over {} days{span}",
            clicks.total_clicks, clicks.unique_dates
        ));
    }

    if let Some(y) = yesterday {
        lines.push(String::new());
        lines.push(format!("{} vs {}", y.latest_date, y.previous_date));
        lines.push(comparison("records", &y.total_records));
        lines.push(comparison("accounts", &y.unique_accounts));
        lines.push(comparison("total views", &y.total_views));
        if let Some(clicks) = &y.total_clicks {
            lines.push(comparison("clicks", clicks));
        }
        for (metric, value) in &y.increments {
            lines.push(comparison(&format!("{} increment", metric.label()), value));
        }
    }

    if let Some(latest) = latest {
        lines.push(String::new());
        lines.push(format!(
            "Latest day {}: {}  clicks {}",
            latest.date,
            values_line(&latest.increments),
            latest.clicks
        ));
    }
    lines.join("\n")
}

/// Group tokens and the mapping summary table.
pub fn groups(tokens: &[String], mapping: Option<&GroupMappingSummary>) -> String {
    let mut lines = vec![format!("Groups ({}): {}", tokens.len(), tokens.join(", "))];
    if let Some(mapping) = mapping {
        let stats = &mapping.statistics;
        lines.push(format!(
            "Rules: {} links, {} page rules; page types {}",
            stats.link_rules,
            stats.page_rules,
            stats.page_types.join(", ")
        ));
        lines.push(format!(
            "{:<32} {:>8} {:>14}  {}",
            "group", "accounts", "view incr", "page type"
        ));
        for row in &mapping.groups {
            lines.push(format!(
                "{:<32} {:>8} {:>14}  {}",
                row.group, row.accounts, row.view_increments, row.page_type
            ));
        }
    }
    lines.join("\n")
}

/// One line per day.
pub fn daily_increments(rows: &[DailyIncrement]) -> String {
    if rows.is_empty() {
        return "No increments in range".to_string();
    }
    rows.iter()
        .map(|r| format!("{}  {}", r.date, values_line(&r.increments)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per day and group.
pub fn group_increments(rows: &[GroupDailyIncrement]) -> String {
    if rows.is_empty() {
        return "No increments in range".to_string();
    }
    rows.iter()
        .map(|r| format!("{}  {:<24} {}", r.date, r.group, values_line(&r.increments)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Latest-day increments per keyword.
pub fn latest_groups(rows: &[GroupLatestIncrements]) -> String {
    if rows.is_empty() {
        return "No keywords selected".to_string();
    }
    rows.iter()
        .map(|r| format!("{}  {:<24} {}", r.date, r.keyword, values_line(&r.increments)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-link conversion tables followed by the last click day.
pub fn conversions(rows: &[LinkConversion], last_day: &[LinkClickSummary]) -> String {
    if rows.is_empty() {
        return "No click log loaded or no links configured".to_string();
    }
    let mut lines = Vec::new();
    for conversion in rows {
        lines.push(format!("{} -> {}", conversion.link, conversion.group));
        lines.push(format!(
            "  PV {}  UV {}  views {}  avg PV rate {:.2}%  avg UV rate {:.2}%",
            conversion.total_pv,
            conversion.total_uv,
            conversion.total_views,
            conversion.avg_pv_rate,
            conversion.avg_uv_rate
        ));
        for day in &conversion.daily {
            lines.push(format!(
                "  {}  pv {:>5}  uv {:>5}  views {:>8}  pv rate {:>7.2}%  uv rate {:>7.2}%",
                day.date, day.pv, day.uv, day.views, day.pv_rate, day.uv_rate
            ));
        }
    }
    if !last_day.is_empty() {
        lines.push(String::new());
        for summary in last_day {
            lines.push(format!(
                "{}  {} -> {}: PV {}  UV {}",
                summary.date, summary.link, summary.group, summary.pv, summary.uv
            ));
        }
    }
    lines.join("\n")
}

/// Key click metrics and the busiest page types.
pub fn clicks(key: Option<&DailyClickMetrics>, pages: &[PageStats]) -> String {
    let Some(key) = key else {
        return "No click log loaded".to_string();
    };
    let mut lines = vec![
        format!("Clicks on {}", key.date),
        format!("  total clicks       {:>8} ({})", key.total_clicks, pct(key.total_clicks_pct)),
        format!("  unique visitors    {:>8} ({})", key.unique_visitors, pct(key.unique_visitors_pct)),
        format!("  page visits        {:>8} ({})", key.page_visits, pct(key.page_visits_pct)),
        format!(
            "  clicks per visitor {:>8.2} ({})",
            key.clicks_per_visitor,
            pct(key.clicks_per_visitor_pct)
        ),
        format!("  clicks per session {:>8.2}", key.clicks_per_session),
    ];
    if !pages.is_empty() {
        lines.push("Top pages".to_string());
        for page in pages {
            lines.push(format!(
                "  {:<12} clicks {:>6}  sessions {:>6}  visitors {:>6}",
                page.page_type, page.total_clicks, page.unique_sessions, page.unique_visitors
            ));
        }
    }
    lines.join("\n")
}

/// Clicks against view increments with the correlation.
pub fn compare(page_type: &str, rows: &[PageTypeDay], correlation: Option<f64>) -> String {
    let mut lines = vec![format!("{page_type}: clicks against view increments")];
    lines.extend(
        rows.iter()
            .map(|r| format!("  {}  clicks {:>6}  views {:>8}", r.date, r.clicks, r.views)),
    );
    lines.push(match correlation {
        Some(r) => format!("Correlation: {r:.3}"),
        None => "Correlation: not enough data".to_string(),
    });
    lines.join("\n")
}

/// Ranked account list.
pub fn top_accounts(rows: &[TopAccount]) -> String {
    if rows.is_empty() {
        return "No accounts in range".to_string();
    }
    rows.iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{:>3}. {:<20} {:>10}  followers {:>8}  likes {:>10}  {}",
                i + 1,
                a.username.as_deref().unwrap_or(a.account_id.as_str()),
                a.last_day_view_increment,
                a.followers,
                a.likes,
                a.profile_url.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
