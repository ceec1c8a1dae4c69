//! Timeline store abstraction
//!
//! The copier only needs a handful of list and stream commands plus key
//! enumeration. `RedisTimelineStore` talks to a real server;
//! `InMemoryTimelineStore` keeps the same semantics in-process.

mod client;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::RedisTimelineStore;
pub use memory::{InMemoryTimelineStore, StoredValue};

/// A single stream entry: its id and the field/value pairs in original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
  pub id: String,
  pub fields: Vec<(String, String)>,
}

impl StreamEntry {
  pub fn new<F, V>(id: impl Into<String>, fields: impl IntoIterator<Item = (F, V)>) -> Self
  where
    F: Into<String>,
    V: Into<String>,
  {
    Self {
      id: id.into(),
      fields: fields
        .into_iter()
        .map(|(f, v)| (f.into(), v.into()))
        .collect(),
    }
  }
}

/// Store operation error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("redis: {0}")]
  Redis(#[from] redis::RedisError),
  #[error("WRONGTYPE Operation against a key holding the wrong kind of value: {key}")]
  WrongType { key: String },
  #[error("Invalid stream ID specified as stream command argument: {id}")]
  InvalidStreamId { id: String },
  #[error("stream {key}: ID {id} is equal or smaller than the target stream top item")]
  StreamIdNotIncreasing { key: String, id: String },
  #[error("wrong number of arguments for 'xadd' command: {key} entry has no fields")]
  EmptyStreamEntry { key: String },
  #[error("invalid key pattern: {pattern}")]
  InvalidPattern { pattern: String },
  #[error("write rejected for {key}")]
  WriteRejected { key: String },
  #[error("connection closed")]
  Closed,
}

/// Timeline store trait
#[async_trait]
pub trait TimelineStore: Send + Sync {
  /// Keys matching a glob pattern
  async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
  /// Whole list, head to tail. Missing keys read as empty.
  async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;
  /// Append values at the tail, returning the new length
  async fn list_push(&self, key: &str, values: &[String]) -> Result<usize, StoreError>;
  /// Every stream entry, oldest first. Missing keys read as empty.
  async fn stream_range(&self, key: &str) -> Result<Vec<StreamEntry>, StoreError>;
  async fn stream_len(&self, key: &str) -> Result<usize, StoreError>;
  /// Append an entry keeping its explicit id
  async fn stream_add(&self, key: &str, entry: &StreamEntry) -> Result<(), StoreError>;
  /// Release the connection. Later calls fail with `StoreError::Closed`.
  async fn disconnect(&self);
}

/// Parsed `<ms>-<seq>` stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamId {
  pub ms: u64,
  pub seq: u64,
}

impl std::str::FromStr for StreamId {
  type Err = StoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || StoreError::InvalidStreamId { id: s.to_string() };
    let (ms, seq) = match s.split_once('-') {
      Some((ms, seq)) => (ms, seq),
      None => (s, "0"),
    };
    Ok(StreamId {
      ms: ms.parse().map_err(|_| invalid())?,
      seq: seq.parse().map_err(|_| invalid())?,
    })
  }
}

impl std::fmt::Display for StreamId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}-{}", self.ms, self.seq)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stream_id_parse() {
    let id: StreamId = "1700000000000-3".parse().unwrap();
    assert_eq!(id, StreamId { ms: 1700000000000, seq: 3 });
    assert_eq!(id.to_string(), "1700000000000-3");

    let bare: StreamId = "42".parse().unwrap();
    assert_eq!(bare, StreamId { ms: 42, seq: 0 });

    assert!("abc-1".parse::<StreamId>().is_err());
    assert!("1-".parse::<StreamId>().is_err());
  }

  #[test]
  fn test_stream_id_ordering() {
    let a: StreamId = "5-9".parse().unwrap();
    let b: StreamId = "6-0".parse().unwrap();
    let c: StreamId = "6-1".parse().unwrap();
    assert!(a < b && b < c);
  }
}
