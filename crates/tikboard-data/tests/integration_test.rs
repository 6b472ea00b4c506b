//! Integration tests for tikboard-data.
//!
//! These tests drive the loader, merge, aggregation and conversion through
//! the public API using CSV fixtures written to temporary directories.

use async_trait::async_trait;
use mockall::mock;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tikboard_common::test_utils::{assert_approx_eq, create_temp_dir, init_test_logging, write_fixture, ymd};
use tikboard_common::{AccountId, DashError, DateRange, Result, UNKNOWN_GROUP};
use tikboard_config::{Config, GroupPageRule, LinkGroupRule, MappingConfig, SourceConfig};
use tikboard_data::{
    DashboardSession, IncrementQuery, MergeEngine, RemoteFetcher, SourceKind, SourceLoader,
    Snapshot,
};

mock! {
    pub Fetcher {}

    #[async_trait]
    impl RemoteFetcher for Fetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
    }
}

fn offline_loader() -> SourceLoader {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_fetch()
        .returning(|url| Err(DashError::network(format!("offline: {url}"))));
    SourceLoader::new(Arc::new(fetcher))
}

fn config_for(dir: &Path, roster: &str, counters: &str, clicks: Option<&str>) -> Config {
    let mut config = Config::default();
    config.sources.roster = SourceConfig::file(write_fixture(dir, "roster.csv", roster).to_string_lossy());
    config.sources.counters = SourceConfig::file(write_fixture(dir, "counters.csv", counters).to_string_lossy());
    config.sources.clicks = match clicks {
        Some(body) => SourceConfig::file(write_fixture(dir, "clicks.csv", body).to_string_lossy()),
        None => SourceConfig::default(),
    };
    config.mapping = MappingConfig {
        links: vec![LinkGroupRule::new("https://x.com/videos", "grpX")],
        pages: vec![GroupPageRule::new("grpX", "videos")],
    };
    config
}

#[tokio::test]
async fn test_scenario_unmatched_account_and_first_day_deltas() {
    init_test_logging();
    let dir = create_temp_dir();
    let config = config_for(
        dir.path(),
        "Tiktok ID,Groups\nacc1,grpX\nacc2,grpY\n",
        "user_id,date,view_count\nacc1,2024-01-01,10\nacc1,2024-01-02,25\nacc3,2024-01-01,5\n",
        None,
    );
    let loader = offline_loader();
    let roster = loader.load_roster(&config.sources.roster).await.unwrap();
    let counters = loader.load_counters(&config.sources.counters).await.unwrap();

    let merged = MergeEngine::merge(&counters, &roster).unwrap();
    assert_eq!(merged.len(), 3);
    let acc3 = AccountId::parse("acc3").unwrap();
    let row = merged.rows().iter().find(|r| r.account_id == acc3).unwrap();
    assert_eq!(row.group, UNKNOWN_GROUP);
    assert!(!row.matched);

    let increments = tikboard_data::compute_increments(&merged);
    let views: Vec<(&str, i64)> = increments
        .iter()
        .map(|r| (r.account_id.as_str(), r.deltas.views))
        .collect();
    assert_eq!(views, vec![("acc1", 0), ("acc1", 15), ("acc3", 0)]);
}

#[tokio::test]
async fn test_out_of_range_counts_saturate() {
    let dir = create_temp_dir();
    let config = config_for(
        dir.path(),
        "Tiktok ID,Groups\na,grpX\nb,grpX\n",
        "user_id,date,view_count\na,2024-01-01,1e19\nb,2024-01-01,1e19\na,2024-01-02,-1e19\n",
        None,
    );
    let session = DashboardSession::with_loader(config, offline_loader());
    assert!(session.load_and_merge().await.success);

    let daily = session.daily_increments(&IncrementQuery::new());
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0].increments.views, 0);
    assert_eq!(daily[1].increments.views, i64::MIN);

    let summary = session.data_summary().unwrap();
    assert_eq!(summary.total_views, i64::MAX - 1);
    assert!(session.yesterday_comparison().is_some());
}

#[tokio::test]
async fn test_scenario_conversion_rates_from_reported_diffs() {
    let dir = create_temp_dir();
    let config = config_for(
        dir.path(),
        "Tiktok ID,Groups\nacc1,grpX\n",
        "user_id,date,view_count,view_diff\nacc1,2024-01-01,100,50\n",
        Some(
            "timestamp,session_id,visitor_id,page_url,page_type\n\
             2024-01-01 09:00:00,s1,v1,https://x.com/videos,videos\n\
             2024-01-01 10:00:00,s2,v1,https://x.com/videos,videos\n\
             2024-01-01 11:00:00,s3,v2,https://x.com/videos?ref=bio,videos\n",
        ),
    );
    let session = DashboardSession::with_loader(config, offline_loader());
    assert!(session.load_and_merge().await.success);

    let conversions = session.link_conversions(DateRange::all());
    assert_eq!(conversions.len(), 1);
    let day = conversions[0].daily[0];
    assert_eq!(day.date, ymd(2024, 1, 1));
    assert_eq!((day.pv, day.uv, day.views), (3, 2, 50));
    assert_approx_eq(day.pv_rate, 6.0, 1e-9);
    assert_approx_eq(day.uv_rate, 4.0, 1e-9);
}

#[tokio::test]
async fn test_scenario_disjoint_click_and_view_days() {
    let dir = create_temp_dir();
    let config = config_for(
        dir.path(),
        "Tiktok ID,Groups\nacc1,grpX\n",
        "user_id,date,view_count,view_diff\nacc1,2024-01-01,100,40\n",
        Some(
            "timestamp,session_id,visitor_id,page_url,page_type\n\
             2024-01-02 09:00:00,s1,v1,https://x.com/videos,videos\n",
        ),
    );
    let session = DashboardSession::with_loader(config, offline_loader());
    assert!(session.load_and_merge().await.success);

    let daily = &session.link_conversions(DateRange::all())[0].daily;
    assert_eq!(daily.len(), 2);
    assert_eq!((daily[0].date, daily[0].pv, daily[0].views), (ymd(2024, 1, 1), 0, 40));
    assert_eq!((daily[1].date, daily[1].pv, daily[1].views), (ymd(2024, 1, 2), 1, 0));
    assert_eq!(daily[1].pv_rate, 0.0);
    assert_eq!(daily[1].uv_rate, 0.0);
}

#[tokio::test]
async fn test_remote_fallback_when_local_file_is_missing() {
    let dir = create_temp_dir();
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url == "https://files.example.com/roster.csv")
        .times(1)
        .returning(|_| Ok(b"Tiktok ID,Groups\nacc1,grpX\n".to_vec()));
    let loader = SourceLoader::new(Arc::new(fetcher));

    let spec = SourceConfig {
        path: Some(dir.path().join("absent.xlsx").to_string_lossy().into_owned()),
        url: Some("https://files.example.com/roster.csv".to_string()),
        ..SourceConfig::default()
    };
    let roster = loader.load_roster(&spec).await.unwrap();
    assert_eq!(roster.len(), 1);
}

#[tokio::test]
async fn test_missing_source_is_reported() {
    let dir = create_temp_dir();
    let spec = SourceConfig::file(dir.path().join("nothing.csv").to_string_lossy());
    let err = offline_loader()
        .load_raw(SourceKind::Counters, &spec)
        .await
        .unwrap_err();
    assert!(err.is_missing_source());
    assert!(err.to_string().contains("counters"));
}

#[tokio::test]
async fn test_directory_source_uses_newest_export() {
    let dir = create_temp_dir();
    let old = write_fixture(dir.path(), "redash_data_old.csv", "user_id,date,view_count\nacc1,2024-01-01,1\n");
    write_fixture(dir.path(), "redash_data_new.csv", "user_id,date,view_count\nacc1,2024-01-01,2\nacc1,2024-01-02,3\n");
    let past = SystemTime::now() - Duration::from_secs(3600);
    std::fs::File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(past)
        .unwrap();

    let spec = SourceConfig::directory(dir.path().to_string_lossy(), "redash_data_");
    let counters = offline_loader().load_counters(&spec).await.unwrap();
    assert_eq!(counters.len(), 2);
}

#[tokio::test]
async fn test_group_queries_and_snapshot_round_trip() {
    let dir = create_temp_dir();
    let config = config_for(
        dir.path(),
        "Tiktok ID,Groups\nacc1,grpX\nacc2,\"grpY, dance\"\n",
        "user_id,date,view_count\n\
         acc1,2024-01-01,10\nacc1,2024-01-03,30\n\
         acc2,2024-01-01,5\nacc2,2024-01-02,9\n",
        None,
    );
    let session = DashboardSession::with_loader(config, offline_loader());
    assert!(session.load_and_merge().await.success);
    assert_eq!(session.available_groups(), vec!["dance", "grpX", "grpY"]);

    let query = IncrementQuery::new().with_keywords(["dance", "grpX"]);
    let grouped = session.group_daily_increments(&query);
    // two groups over three days
    assert_eq!(grouped.len(), 6);
    let dance_day2 = grouped
        .iter()
        .find(|g| g.group == "dance" && g.date == ymd(2024, 1, 2))
        .unwrap();
    assert_eq!(dance_day2.increments.views, 4);
    let grp_x_day2 = grouped
        .iter()
        .find(|g| g.group == "grpX" && g.date == ymd(2024, 1, 2))
        .unwrap();
    assert_eq!(grp_x_day2.increments.views, 0);

    let path = dir.path().join("snapshot.json");
    session.snapshot().unwrap().save(&path).await.unwrap();

    let restored = DashboardSession::with_loader(Config::default(), offline_loader());
    let outcome = restored.restore(Snapshot::load(&path).await.unwrap());
    assert!(outcome.success);
    assert_eq!(restored.group_daily_increments(&query), grouped);
}
