//! Notification timelines
//!
//! Notifications live in streams, which only accept ids above the current
//! top entry. Replaying the source ids into a stream that already has
//! entries would be rejected or interleave, so only empty destinations are
//! written.

use futures_util::future::join_all;

use super::{Destination, KeyOutcome, Phase, PhaseReport, SkipReason, TimelineCopier};
use crate::store::StoreError;

impl TimelineCopier {
  /// Source pattern matching every notification timeline
  pub fn notification_pattern(&self) -> String {
    format!("{}notificationTimeline:*", self.options.key_prefix)
  }

  pub async fn copy_notification_timelines(&self) -> PhaseReport {
    let pattern = self.notification_pattern();
    let keys = match self.source.keys(&pattern).await {
      Ok(mut keys) => {
        keys.sort();
        keys
      }
      Err(e) => {
        return PhaseReport {
          phase: Phase::Notifications,
          keys: vec![Self::settle(Phase::Notifications, &pattern, Err(e))],
        };
      }
    };
    tracing::info!("notification timelines: {:?}", keys);

    let copies = keys.iter().map(|key| async move {
      let result = self.copy_notification_key(key).await;
      Self::settle(Phase::Notifications, key, result)
    });

    PhaseReport {
      phase: Phase::Notifications,
      keys: join_all(copies).await,
    }
  }

  async fn copy_notification_key(&self, key: &str) -> Result<KeyOutcome, StoreError> {
    let entries = self.source.stream_range(key).await?;
    let items = entries.len();
    tracing::info!("Copying {} {} items", key, items);
    tracing::debug!("{} entries: {:?}", key, entries);

    let destination = match &self.destination {
      Destination::None if entries.is_empty() => {
        return Ok(KeyOutcome::Skipped {
          reason: SkipReason::SourceEmpty,
        })
      }
      Destination::None => return Ok(KeyOutcome::ReadOnly { items }),
      Destination::Store(destination) => destination,
    };

    let existing = destination.stream_len(key).await?;
    if existing != 0 {
      tracing::info!("Destination timeline is not empty: {}", key);
      return Ok(KeyOutcome::Skipped {
        reason: SkipReason::DestinationNotEmpty { existing },
      });
    }

    if entries.is_empty() {
      return Ok(KeyOutcome::Skipped {
        reason: SkipReason::SourceEmpty,
      });
    }
    if self.options.dry_run {
      return Ok(KeyOutcome::DryRun { items });
    }

    for (written, entry) in entries.iter().enumerate() {
      if let Err(e) = destination.stream_add(key, entry).await {
        tracing::error!(
          "{} stopped at entry {} after {} of {} entries",
          key,
          entry.id,
          written,
          items
        );
        return Err(e);
      }
    }
    Ok(KeyOutcome::Copied { items })
  }
}
