//! Redis client for the source and destination stores

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{StoreError, StreamEntry, TimelineStore};
use crate::config::StoreTarget;

/// Timeline store backed by a Redis server
pub struct RedisTimelineStore {
  connection: Mutex<Option<ConnectionManager>>,
  target: StoreTarget,
}

impl RedisTimelineStore {
  /// Connect to the target and verify it answers PING
  pub async fn connect(target: StoreTarget) -> Result<Self, StoreError> {
    let client = Client::open(target.connection_url())?;
    let mut connection = ConnectionManager::new(client).await?;
    redis::cmd("PING").query_async::<()>(&mut connection).await?;

    tracing::info!("Connected to {}", target);
    Ok(Self {
      connection: Mutex::new(Some(connection)),
      target,
    })
  }

  /// The manager multiplexes one connection, so each command works on a clone.
  fn connection(&self) -> Result<ConnectionManager, StoreError> {
    self.connection.lock().clone().ok_or(StoreError::Closed)
  }

  /// Turn an XRANGE reply row into a StreamEntry
  fn parse_entry((id, flat): (String, Vec<String>)) -> StreamEntry {
    let mut fields = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
      fields.push((field, value));
    }
    StreamEntry { id, fields }
  }
}

#[async_trait]
impl TimelineStore for RedisTimelineStore {
  async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
    let mut conn = self.connection()?;
    let keys: Vec<String> = conn.keys(pattern).await?;
    Ok(keys)
  }

  async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
    let mut conn = self.connection()?;
    let values: Vec<String> = conn.lrange(key, 0, -1).await?;
    Ok(values)
  }

  async fn list_push(&self, key: &str, values: &[String]) -> Result<usize, StoreError> {
    let mut conn = self.connection()?;
    let mut cmd = redis::cmd("RPUSH");
    cmd.arg(key);
    for value in values {
      cmd.arg(value);
    }
    let len: usize = cmd.query_async(&mut conn).await?;
    Ok(len)
  }

  async fn stream_range(&self, key: &str) -> Result<Vec<StreamEntry>, StoreError> {
    let mut conn = self.connection()?;
    let rows: Vec<(String, Vec<String>)> = redis::cmd("XRANGE")
      .arg(key)
      .arg("-")
      .arg("+")
      .query_async(&mut conn)
      .await?;
    Ok(rows.into_iter().map(Self::parse_entry).collect())
  }

  async fn stream_len(&self, key: &str) -> Result<usize, StoreError> {
    let mut conn = self.connection()?;
    let len: usize = redis::cmd("XLEN").arg(key).query_async(&mut conn).await?;
    Ok(len)
  }

  async fn stream_add(&self, key: &str, entry: &StreamEntry) -> Result<(), StoreError> {
    let mut conn = self.connection()?;
    let mut cmd = redis::cmd("XADD");
    cmd.arg(key).arg(&entry.id);
    for (field, value) in &entry.fields {
      cmd.arg(field).arg(value);
    }
    let _: String = cmd.query_async(&mut conn).await?;
    Ok(())
  }

  async fn disconnect(&self) {
    if self.connection.lock().take().is_some() {
      tracing::debug!("Disconnected from {}", self.target);
    }
  }
}
