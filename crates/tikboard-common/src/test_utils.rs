//! Test utilities and shared fixtures for the tikboard workspace.
//!
//! Enabled with the `testing` feature so integration tests in the other
//! crates can reuse the same CSV fixtures and strategies.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests once per process.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(filter)
            .try_init();
    });
}

/// Shorthand for a calendar day.
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Assert that two floating point numbers are approximately equal within a tolerance.
pub fn assert_approx_eq(left: f64, right: f64, tolerance: f64) {
    let diff = (left - right).abs();
    assert!(
        diff <= tolerance,
        "assertion failed: `{left}` is not approximately equal to `{right}` (tolerance: {tolerance}, diff: {diff})"
    );
}

/// Create a temporary directory for tests that automatically cleans up.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

/// CSV fixtures shaped like the real exports.
pub mod fixtures {
    /// Roster with two grouped accounts.
    pub fn roster_csv() -> &'static str {
        "Tiktok ID,Groups,Tiktok Username,Total Followers,Total Like\n\
         A,yujie_main_avatar,alice_tt,1200,5400\n\
         B,\"wan_produce101, dance\",bob_tt,800,2100\n"
    }

    /// Counter export covering two days for two accounts plus an unmatched one.
    pub fn counters_csv() -> &'static str {
        "user_id,date,view_count,like_count,comment_count,share_count,post_count\n\
         A,2024-01-01,100,10,1,0,3\n\
         A,2024-01-02,150,12,1,1,4\n\
         B,2024-01-01,200,20,2,1,5\n\
         B,2024-01-02,260,25,2,1,5\n\
         Z,2024-01-02,50,5,0,0,1\n"
    }

    /// Counter export with the export's own daily differences.
    pub fn counters_with_diffs_csv() -> &'static str {
        "user_id,date,view_count,like_count,comment_count,share_count,post_count,view_diff,like_diff,comment_diff,share_diff,post_diff\n\
         A,2024-01-01,100,10,1,0,3,50,2,0,0,1\n\
         A,2024-01-02,150,12,1,1,4,50,2,0,1,1\n"
    }

    /// Click log for the videos landing page.
    pub fn clicks_csv() -> &'static str {
        "timestamp,session_id,visitor_id,page_url,page_type\n\
         2024-01-01 09:00:00,s1,v1,https://insnap.ai/videos,videos\n\
         2024-01-01 10:00:00,s2,v1,https://insnap.ai/videos?utm=tt,videos\n\
         2024-01-01 11:00:00,s3,v2,https://insnap.ai/videos,videos\n\
         2024-01-02 12:00:00,s4,v3,https://insnap.ai/zh/download,download\n"
    }
}

/// Property-based testing strategies.
pub mod property_testing {
    use proptest::prelude::*;

    /// Account ids drawn from a small alphabet so accounts repeat.
    pub fn account_id_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["A", "B", "C", "D"]).prop_map(str::to_string)
    }

    /// Group labels, some sharing keywords.
    pub fn group_label_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "yujie_main_avatar",
            "wan_produce101",
            "main_avatar, dance",
            "misc",
        ])
        .prop_map(str::to_string)
    }

    /// A cumulative counter series: running sum of small (possibly negative) steps.
    pub fn cumulative_series_strategy(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
        prop::collection::vec(-20i64..200, 1..=max_len).prop_map(|steps| {
            steps
                .into_iter()
                .scan(0i64, |acc, step| {
                    *acc += step;
                    Some(*acc)
                })
                .collect()
        })
    }
}
