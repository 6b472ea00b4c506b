//! Default values for configuration fields.

use crate::mapping::{GroupPageRule, LinkGroupRule};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "TIKBOARD_CONFIG_PATH";

/// Config files probed in the working directory, in order.
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["tikboard.yaml", "tikboard.yml"];

/// Roster workbook location.
pub const ROSTER_PATH: &str = "data/postingManager_data/accounts_detail.xlsx";

/// Directory holding dated counter exports.
pub const COUNTERS_DIR: &str = "data/redash_data";

/// File-name prefix of counter exports.
pub const COUNTERS_PREFIX: &str = "redash_data_";

/// Directory holding click logs.
pub const CLICKS_DIR: &str = "data/clicks";

/// Directory for exports and charts.
pub const OUTPUT_DIR: &str = "output";

/// Remote fetch timeout.
pub const HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Entries kept in the load memo.
pub const MEMO_CAPACITY: u64 = 64;

/// Page types a click can be attributed to.
pub const VALID_PAGE_TYPES: [&str; 3] = ["videos", "download", "other"];

/// Tracked landing links and the account group each one converts for.
pub fn link_rules() -> Vec<LinkGroupRule> {
    vec![
        LinkGroupRule::new("https://insnap.ai/videos", "yujie_main_avatar"),
        LinkGroupRule::new("https://insnap.ai/zh/download", "wan_produce101"),
    ]
}

/// Group-name fragments and the page type their traffic lands on.
pub fn page_rules() -> Vec<GroupPageRule> {
    vec![
        GroupPageRule::new("main_avatar", "videos"),
        GroupPageRule::new("wan_produce101", "download"),
    ]
}

/// Line colours for multi-series charts.
pub fn chart_palette() -> Vec<String> {
    ["#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B"]
        .iter()
        .map(|c| (*c).to_string())
        .collect()
}
