//! FTT list timelines
//!
//! Lists can take items at either end, so the copy appends whatever the
//! source holds. Running twice duplicates the items.

use futures_util::future::join_all;
use std::collections::HashSet;

use super::{Destination, KeyOutcome, KeyReport, Phase, PhaseReport, SkipReason, TimelineCopier};
use crate::store::StoreError;

impl TimelineCopier {
  /// Source key for a list timeline name
  pub fn list_key(&self, timeline: &str) -> String {
    format!("{}list:{}", self.options.key_prefix, timeline)
  }

  /// Expand the configured list timelines into concrete source keys.
  ///
  /// Names containing `*` are matched against the source keyspace, others
  /// are taken literally. Keys are deduplicated in first-seen order. A
  /// pattern whose lookup fails is returned as a failed report.
  pub async fn resolve_list_keys(&self) -> (Vec<String>, Vec<KeyReport>) {
    let mut keys = Vec::new();
    let mut failures = Vec::new();
    let mut seen = HashSet::new();

    for timeline in &self.options.list_timelines {
      let pattern = self.list_key(timeline);
      let resolved = if timeline.contains('*') {
        match self.source.keys(&pattern).await {
          Ok(mut matched) => {
            matched.sort();
            matched
          }
          Err(e) => {
            failures.push(Self::settle(Phase::List, &pattern, Err(e)));
            continue;
          }
        }
      } else {
        vec![pattern]
      };

      for key in resolved {
        if seen.insert(key.clone()) {
          keys.push(key);
        }
      }
    }

    (keys, failures)
  }

  pub async fn copy_list_timelines(&self) -> PhaseReport {
    let (keys, mut reports) = self.resolve_list_keys().await;
    tracing::info!("FTT timelines: {:?}", keys);

    let copies = keys.iter().map(|key| async move {
      let result = self.copy_list_key(key).await;
      Self::settle(Phase::List, key, result)
    });
    reports.extend(join_all(copies).await);

    PhaseReport {
      phase: Phase::List,
      keys: reports,
    }
  }

  async fn copy_list_key(&self, key: &str) -> Result<KeyOutcome, StoreError> {
    let values = self.source.list_range(key).await?;
    let items = values.len();
    tracing::info!("Copying {} {} items", key, items);
    tracing::debug!("{} items: {:?}", key, values);

    if values.is_empty() {
      return Ok(KeyOutcome::Skipped {
        reason: SkipReason::SourceEmpty,
      });
    }
    if self.options.dry_run {
      return Ok(KeyOutcome::DryRun { items });
    }

    match &self.destination {
      Destination::None => Ok(KeyOutcome::ReadOnly { items }),
      Destination::Store(destination) => {
        let len = destination.list_push(key, &values).await?;
        tracing::debug!("{} now holds {} items on the destination", key, len);
        Ok(KeyOutcome::Copied { items })
      }
    }
  }
}
