//! Per-key outcomes and run reports

use serde::Serialize;

/// Copy phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  /// List-shaped FTT timelines
  List,
  /// Stream-shaped notification timelines
  Notifications,
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Phase::List => write!(f, "list timelines"),
      Phase::Notifications => write!(f, "notification timelines"),
    }
  }
}

/// Why a key was left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
  /// The destination stream already holds entries
  DestinationNotEmpty { existing: usize },
  /// Nothing to copy from the source
  SourceEmpty,
}

impl std::fmt::Display for SkipReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SkipReason::DestinationNotEmpty { existing } => {
        write!(f, "destination not empty ({} entries)", existing)
      }
      SkipReason::SourceEmpty => write!(f, "source empty"),
    }
  }
}

/// Settled result of copying one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KeyOutcome {
  /// Items were written to the destination
  Copied { items: usize },
  /// Dry run: items were read and would have been written
  DryRun { items: usize },
  /// No destination configured: items were read and logged only
  ReadOnly { items: usize },
  Skipped { reason: SkipReason },
  Failed { error: String },
}

impl KeyOutcome {
  pub fn is_success(&self) -> bool {
    matches!(
      self,
      KeyOutcome::Copied { .. } | KeyOutcome::DryRun { .. } | KeyOutcome::ReadOnly { .. }
    )
  }

  pub fn is_skipped(&self) -> bool {
    matches!(self, KeyOutcome::Skipped { .. })
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, KeyOutcome::Failed { .. })
  }
}

impl std::fmt::Display for KeyOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      KeyOutcome::Copied { items } => write!(f, "copied {} items", items),
      KeyOutcome::DryRun { items } => write!(f, "dry run, {} items", items),
      KeyOutcome::ReadOnly { items } => write!(f, "read only, {} items", items),
      KeyOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
      KeyOutcome::Failed { error } => write!(f, "failed: {}", error),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReport {
  pub key: String,
  #[serde(flatten)]
  pub outcome: KeyOutcome,
}

impl KeyReport {
  pub fn new(key: impl Into<String>, outcome: KeyOutcome) -> Self {
    Self {
      key: key.into(),
      outcome,
    }
  }
}

/// Outcomes of every key a phase touched, in resolution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
  pub phase: Phase,
  pub keys: Vec<KeyReport>,
}

impl PhaseReport {
  pub fn succeeded(&self) -> usize {
    self.keys.iter().filter(|k| k.outcome.is_success()).count()
  }

  pub fn skipped(&self) -> usize {
    self.keys.iter().filter(|k| k.outcome.is_skipped()).count()
  }

  pub fn failed(&self) -> usize {
    self.keys.iter().filter(|k| k.outcome.is_failed()).count()
  }

  /// Outcome recorded for `key`, if the phase touched it
  pub fn outcome(&self, key: &str) -> Option<&KeyOutcome> {
    self.keys.iter().find(|k| k.key == key).map(|k| &k.outcome)
  }
}

/// Summary of a whole run. A phase that was not enabled is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
  pub dry_run: bool,
  pub list: Option<PhaseReport>,
  pub notifications: Option<PhaseReport>,
}

impl CopyReport {
  pub fn phases(&self) -> impl Iterator<Item = &PhaseReport> {
    self.list.iter().chain(self.notifications.iter())
  }

  pub fn has_failures(&self) -> bool {
    self.phases().any(|p| p.failed() > 0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_phase_counts() {
    let report = PhaseReport {
      phase: Phase::Notifications,
      keys: vec![
        KeyReport::new("a", KeyOutcome::Copied { items: 3 }),
        KeyReport::new(
          "b",
          KeyOutcome::Skipped {
            reason: SkipReason::DestinationNotEmpty { existing: 2 },
          },
        ),
        KeyReport::new(
          "c",
          KeyOutcome::Failed {
            error: "connection closed".into(),
          },
        ),
        KeyReport::new("d", KeyOutcome::DryRun { items: 1 }),
      ],
    };
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.outcome("a"), Some(&KeyOutcome::Copied { items: 3 }));
    assert_eq!(report.outcome("z"), None);
  }

  #[test]
  fn test_report_json_shape() {
    let report = CopyReport {
      dry_run: false,
      list: Some(PhaseReport {
        phase: Phase::List,
        keys: vec![KeyReport::new(
          "p:list:antennaTimeline:1",
          KeyOutcome::Skipped {
            reason: SkipReason::SourceEmpty,
          },
        )],
      }),
      notifications: None,
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["list"]["phase"], "list");
    assert_eq!(json["list"]["keys"][0]["key"], "p:list:antennaTimeline:1");
    assert_eq!(json["list"]["keys"][0]["status"], "skipped");
    assert_eq!(json["list"]["keys"][0]["reason"]["kind"], "source_empty");
    assert!(json["notifications"].is_null());
    assert!(!report.has_failures());
  }
}
