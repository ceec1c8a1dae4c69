//! Timeline copier
//!
//! Copies FTT list timelines and notification timeline streams from a
//! source store into a destination store. Each phase copies every resolved
//! key concurrently and records a settled outcome per key, so one failing
//! key never stops its siblings.
//!
//! Destination keys are the source keys unchanged: the key prefix is applied
//! once, when resolving keys on the source.

mod list;
mod notifications;
mod report;

use std::sync::Arc;

use crate::config::CopierConfig;
use crate::store::{StoreError, TimelineStore};

pub use report::{CopyReport, KeyOutcome, KeyReport, Phase, PhaseReport, SkipReason};

/// Where copied timelines go
#[derive(Clone, Default)]
pub enum Destination {
  /// No destination store: reads and logs only
  #[default]
  None,
  Store(Arc<dyn TimelineStore>),
}

impl Destination {
  pub fn is_configured(&self) -> bool {
    matches!(self, Destination::Store(_))
  }
}

/// What to copy and whether to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
  pub key_prefix: String,
  /// List timeline names under `<prefix>list:`, `*` marks a wildcard
  pub list_timelines: Vec<String>,
  pub notification_timeline: bool,
  pub dry_run: bool,
}

impl From<&CopierConfig> for CopyOptions {
  fn from(config: &CopierConfig) -> Self {
    Self {
      key_prefix: config.key_prefix.clone(),
      list_timelines: config.list_timelines.clone(),
      notification_timeline: config.notification_timeline,
      dry_run: config.dry_run,
    }
  }
}

pub struct TimelineCopier {
  source: Arc<dyn TimelineStore>,
  destination: Destination,
  options: CopyOptions,
}

impl TimelineCopier {
  pub fn new(
    options: CopyOptions,
    source: Arc<dyn TimelineStore>,
    destination: Destination,
  ) -> Self {
    Self {
      source,
      destination,
      options,
    }
  }

  /// Run the enabled phases in order: list timelines, then notifications.
  pub async fn run(&self) -> CopyReport {
    if self.options.dry_run {
      tracing::warn!("Dry run: nothing will be written to the destination");
    } else if !self.destination.is_configured() {
      tracing::warn!("No destination configured: timelines will only be read");
    }

    let list = if self.options.list_timelines.is_empty() {
      None
    } else {
      Some(self.copy_list_timelines().await)
    };

    let notifications = if self.options.notification_timeline {
      Some(self.copy_notification_timelines().await)
    } else {
      None
    };

    CopyReport {
      dry_run: self.options.dry_run,
      list,
      notifications,
    }
  }

  /// Disconnect the source, and the destination when there is one.
  pub async fn shutdown(self) {
    self.source.disconnect().await;
    if let Destination::Store(destination) = &self.destination {
      destination.disconnect().await;
    }
  }

  /// Settle a per-key copy result, logging failures against the key
  fn settle(phase: Phase, key: &str, result: Result<KeyOutcome, StoreError>) -> KeyReport {
    let outcome = match result {
      Ok(outcome) => outcome,
      Err(e) => {
        tracing::error!("Failed to copy {} key {}: {}", phase, key, e);
        KeyOutcome::Failed {
          error: e.to_string(),
        }
      }
    };
    KeyReport::new(key, outcome)
  }
}
