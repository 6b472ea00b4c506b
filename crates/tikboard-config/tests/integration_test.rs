//! Integration tests for tikboard-config crate.

use tikboard_common::test_utils::{create_temp_dir, write_fixture};
use tikboard_config::{Config, ConfigLoader, GroupPageRule, SourceFormat};

#[test]
fn test_yaml_file_drives_mapping_table() {
    let dir = create_temp_dir();
    let path = write_fixture(
        dir.path(),
        "tikboard.yaml",
        r#"
mapping:
  links:
    - link: "https://insnap.ai/influencers"
      group: "influencer_group"
  pages:
    - group: "influencer"
      page_type: "videos"
sources:
  roster:
    path: "roster.csv"
    format: "csv"
"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let table = config.mapping_table();

    assert_eq!(
        table.group_for_link("https://insnap.ai/influencers?ref=bio"),
        "influencer_group"
    );
    assert_eq!(table.page_type_for_group("Influencer_EU"), "videos");
    assert_eq!(table.page_type_for_group("yujie_main_avatar"), "other");
    assert_eq!(config.sources.roster.format, Some(SourceFormat::Csv));
}

#[test]
fn test_runtime_rule_changes_stay_local_to_the_table() {
    let config = Config::default();
    let mut table = config.mapping_table();
    table
        .add_page_rule(GroupPageRule::new("dance", "download"))
        .unwrap();

    assert_eq!(table.page_type_for_group("dance"), "download");
    assert_eq!(config.mapping_table().page_type_for_group("dance"), "other");
}

#[test]
fn test_config_round_trips_through_yaml() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let reloaded = ConfigLoader::from_yaml_with(&yaml, |_| None).unwrap();
    assert_eq!(reloaded.mapping_table(), config.mapping_table());
    assert_eq!(reloaded.output_dir, config.output_dir);
}
