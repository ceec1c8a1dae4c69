//! Copier configuration.
//!
//! Connection targets and the key prefix come from the environment
//! (`SOURCE_HOST`, `SOURCE_PORT`, `KEY_PREFIX`, `DEST_HOST`, `DEST_PORT`).
//! Which timelines to copy, and whether to write at all, come from an
//! optional YAML file (`timelines.yaml`) that the CLI can override.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Expand environment variables in a string.
/// Supports $VAR_NAME and ${VAR_NAME} syntax. Substituted values are not
/// expanded again.
fn expand_env_vars(input: &str) -> Result<String, regex::Error> {
  let pattern = regex::Regex::new(r"\$\{([A-Za-z0-9_]+)\}|\$([A-Za-z0-9_]+)")?;
  let expanded = pattern.replace_all(input, |caps: &regex::Captures| {
    caps
      .get(1)
      .or_else(|| caps.get(2))
      .and_then(|name| std::env::var(name.as_str()).ok())
      .unwrap_or_default()
  });
  Ok(expanded.into_owned())
}

/// Configuration errors. Each one is fatal and is raised before any store
/// connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
  #[error("Please set SOURCE_HOST, SOURCE_PORT")]
  MissingSource,
  #[error("Please set KEY_PREFIX")]
  MissingKeyPrefix,
  #[error("Please set DEST_HOST, DEST_PORT")]
  MissingDestination,
  #[error("Invalid port for {var}: {value}")]
  InvalidPort { var: &'static str, value: String },
}

/// Address of a Redis-compatible store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTarget {
  pub host: String,
  pub port: u16,
}

impl StoreTarget {
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self {
      host: host.into(),
      port,
    }
  }

  /// Generate Redis connection URL
  pub fn connection_url(&self) -> String {
    format!("redis://{}:{}/0", self.host, self.port)
  }
}

impl std::fmt::Display for StoreTarget {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.host, self.port)
  }
}

/// Raw values of SOURCE_HOST, SOURCE_PORT, KEY_PREFIX, DEST_HOST and
/// DEST_PORT, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
  pub source_host: Option<String>,
  pub source_port: Option<String>,
  pub key_prefix: Option<String>,
  pub dest_host: Option<String>,
  pub dest_port: Option<String>,
}

/// Which timelines to copy and how. Loaded from `timelines.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinesConfig {
  #[serde(default)]
  pub timelines: TimelinesSection,
  #[serde(default = "default_true")]
  pub dry_run: bool,
  #[serde(default)]
  pub logging: LoggingSection,
}

impl Default for TimelinesConfig {
  fn default() -> Self {
    Self {
      timelines: TimelinesSection::default(),
      dry_run: true,
      logging: LoggingSection::default(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinesSection {
  /// List timeline names under `<prefix>list:`. A `*` makes it a wildcard.
  #[serde(default = "default_list_timelines")]
  pub list: Vec<String>,
  /// Copy `<prefix>notificationTimeline:*` streams into empty destinations
  #[serde(default = "default_true")]
  pub notifications: bool,
}

fn default_list_timelines() -> Vec<String> {
  vec!["antennaTimeline:*".to_string()]
}

fn default_true() -> bool {
  true
}

impl Default for TimelinesSection {
  fn default() -> Self {
    Self {
      list: default_list_timelines(),
      notifications: true,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
  #[serde(default = "default_level")]
  pub level: String,
}

fn default_level() -> String {
  "info".into()
}

impl Default for LoggingSection {
  fn default() -> Self {
    Self {
      level: default_level(),
    }
  }
}

impl TimelinesConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
    let content = std::fs::read_to_string(&path)?;
    let expanded = expand_env_vars(&content)?;
    Ok(serde_yaml::from_str(&expanded)?)
  }

  pub fn find_and_load() -> Result<Option<Self>, anyhow::Error> {
    for p in ["timelines.yaml", "timelines.yml"] {
      if Path::new(p).exists() {
        tracing::info!("Loading config from {}", p);
        return Ok(Some(Self::from_file(p)?));
      }
    }
    Ok(None)
  }
}

/// Fully resolved configuration handed to the copier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopierConfig {
  pub source: StoreTarget,
  /// `None` when either DEST_HOST or DEST_PORT is unset.
  pub destination: Option<StoreTarget>,
  pub key_prefix: String,
  pub list_timelines: Vec<String>,
  pub notification_timeline: bool,
  pub dry_run: bool,
}

impl CopierConfig {
  /// Validate raw settings against the timeline options.
  ///
  /// Checks run in a fixed order: source address, key prefix, then the
  /// destination requirement when writes are enabled.
  pub fn resolve(raw: RawSettings, file: TimelinesConfig) -> Result<Self, ConfigError> {
    let (source_host, source_port) = match (present(raw.source_host), present(raw.source_port)) {
      (Some(host), Some(port)) => (host, port),
      _ => return Err(ConfigError::MissingSource),
    };
    let source = StoreTarget::new(source_host, parse_port("SOURCE_PORT", &source_port)?);

    let key_prefix = present(raw.key_prefix).ok_or(ConfigError::MissingKeyPrefix)?;

    let destination = match (present(raw.dest_host), present(raw.dest_port)) {
      (Some(host), Some(port)) => Some(StoreTarget::new(host, parse_port("DEST_PORT", &port)?)),
      _ => None,
    };

    if !file.dry_run && destination.is_none() {
      return Err(ConfigError::MissingDestination);
    }

    Ok(Self {
      source,
      destination,
      key_prefix,
      list_timelines: file.timelines.list,
      notification_timeline: file.timelines.notifications,
      dry_run: file.dry_run,
    })
  }
}

fn present(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.is_empty())
}

fn parse_port(var: &'static str, value: &str) -> Result<u16, ConfigError> {
  value.trim().parse().map_err(|_| ConfigError::InvalidPort {
    var,
    value: value.to_string(),
  })
}
