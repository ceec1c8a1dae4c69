//! Configuration file and resolution tests

use std::io::Write;
use timeline_copy::config::{ConfigError, CopierConfig, RawSettings, StoreTarget, TimelinesConfig};

fn source_only() -> RawSettings {
  RawSettings {
    source_host: Some("127.0.0.1".into()),
    source_port: Some("6379".into()),
    key_prefix: Some("misskey:".into()),
    ..Default::default()
  }
}

#[test]
fn test_from_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(
    file,
    r#"
timelines:
  list:
    - "antennaTimeline:*"
    - "homeTimeline:9abc"
  notifications: false
dry_run: false
logging:
  level: debug
"#
  )
  .unwrap();

  let config = TimelinesConfig::from_file(file.path()).unwrap();
  assert_eq!(
    config.timelines.list,
    vec!["antennaTimeline:*", "homeTimeline:9abc"]
  );
  assert!(!config.timelines.notifications);
  assert!(!config.dry_run);
  assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_from_file_expands_env() {
  std::env::set_var("TIMELINE_COPY_ANTENNA", "9xyz");
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "timelines:\n  list:\n    - \"antennaTimeline:${{TIMELINE_COPY_ANTENNA}}\"").unwrap();

  let config = TimelinesConfig::from_file(file.path()).unwrap();
  assert_eq!(config.timelines.list, vec!["antennaTimeline:9xyz"]);
}

#[test]
fn test_from_file_with_non_ascii_comments() {
  std::env::set_var("TIMELINE_COPY_HOME", "homeTimeline");
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(
    file,
    r#"
# アンテナのタイムライン ($TIMELINE_COPY_HOME も)
timelines:
  list:
    - "antennaTimeline:*"
    - "${{TIMELINE_COPY_HOME}}:9abc" # ホーム
"#
  )
  .unwrap();

  let config = TimelinesConfig::from_file(file.path()).unwrap();
  assert_eq!(
    config.timelines.list,
    vec!["antennaTimeline:*", "homeTimeline:9abc"]
  );
}

#[test]
fn test_from_file_rejects_bad_yaml() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "dry_run: [not, a, bool]").unwrap();
  assert!(TimelinesConfig::from_file(file.path()).is_err());
}

#[test]
fn test_dry_run_without_destination_is_allowed() {
  let config = CopierConfig::resolve(source_only(), TimelinesConfig::default()).unwrap();
  assert_eq!(config.source, StoreTarget::new("127.0.0.1", 6379));
  assert_eq!(config.destination, None);
  assert_eq!(config.key_prefix, "misskey:");
  assert!(config.dry_run);
  assert!(config.notification_timeline);
  assert_eq!(config.list_timelines, vec!["antennaTimeline:*"]);
}

#[test]
fn test_writes_require_destination() {
  let file = TimelinesConfig {
    dry_run: false,
    ..Default::default()
  };
  assert_eq!(
    CopierConfig::resolve(source_only(), file.clone()),
    Err(ConfigError::MissingDestination)
  );

  let mut raw = source_only();
  raw.dest_host = Some("10.0.0.2".into());
  raw.dest_port = Some("6380".into());
  let config = CopierConfig::resolve(raw, file).unwrap();
  assert_eq!(config.destination, Some(StoreTarget::new("10.0.0.2", 6380)));
  assert!(!config.dry_run);
}

#[test]
fn test_checks_run_in_order() {
  assert_eq!(
    CopierConfig::resolve(RawSettings::default(), TimelinesConfig::default()),
    Err(ConfigError::MissingSource)
  );

  let raw = RawSettings {
    key_prefix: None,
    ..source_only()
  };
  let file = TimelinesConfig {
    dry_run: false,
    ..Default::default()
  };
  assert_eq!(
    CopierConfig::resolve(raw, file),
    Err(ConfigError::MissingKeyPrefix)
  );
}
