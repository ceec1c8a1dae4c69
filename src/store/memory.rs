//! In-memory timeline store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{StoreError, StreamEntry, StreamId, TimelineStore};

/// Value held under a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
  List(Vec<String>),
  Stream(Vec<StreamEntry>),
}

/// In-memory timeline store with Redis list and stream semantics.
///
/// Writes to keys registered with [`reject_writes_to`](Self::reject_writes_to)
/// fail with `StoreError::WriteRejected`.
#[derive(Default)]
pub struct InMemoryTimelineStore {
  data: RwLock<HashMap<String, StoredValue>>,
  rejected: RwLock<HashSet<String>>,
  closed: AtomicBool,
}

impl InMemoryTimelineStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the value under `key` with a list
  pub fn insert_list<I, S>(&self, key: &str, values: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let values = values.into_iter().map(Into::into).collect();
    self
      .data
      .write()
      .insert(key.to_string(), StoredValue::List(values));
  }

  /// Replace the value under `key` with a stream. Entries are taken as given.
  pub fn insert_stream(&self, key: &str, entries: Vec<StreamEntry>) {
    self
      .data
      .write()
      .insert(key.to_string(), StoredValue::Stream(entries));
  }

  /// Make every later write to `key` fail
  pub fn reject_writes_to(&self, key: &str) {
    self.rejected.write().insert(key.to_string());
  }

  /// Copy of the whole keyspace, ordered by key
  pub fn snapshot(&self) -> BTreeMap<String, StoredValue> {
    self
      .data
      .read()
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Relaxed)
  }

  fn check_open(&self) -> Result<(), StoreError> {
    if self.is_closed() {
      Err(StoreError::Closed)
    } else {
      Ok(())
    }
  }

  fn check_writable(&self, key: &str) -> Result<(), StoreError> {
    self.check_open()?;
    if self.rejected.read().contains(key) {
      return Err(StoreError::WriteRejected {
        key: key.to_string(),
      });
    }
    Ok(())
  }

  fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType {
      key: key.to_string(),
    }
  }
}

#[async_trait]
impl TimelineStore for InMemoryTimelineStore {
  async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
    self.check_open()?;
    let data = self.data.read();

    if pattern == "*" {
      return Ok(data.keys().cloned().collect());
    }

    let regex = glob_to_regex(pattern)?;
    Ok(data.keys().filter(|k| regex.is_match(k)).cloned().collect())
  }

  async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
    self.check_open()?;
    match self.data.read().get(key) {
      Some(StoredValue::List(values)) => Ok(values.clone()),
      Some(StoredValue::Stream(_)) => Err(Self::wrong_type(key)),
      None => Ok(Vec::new()),
    }
  }

  async fn list_push(&self, key: &str, values: &[String]) -> Result<usize, StoreError> {
    self.check_writable(key)?;
    let mut data = self.data.write();
    let entry = data
      .entry(key.to_string())
      .or_insert_with(|| StoredValue::List(Vec::new()));

    match entry {
      StoredValue::List(list) => {
        list.extend_from_slice(values);
        Ok(list.len())
      }
      StoredValue::Stream(_) => Err(Self::wrong_type(key)),
    }
  }

  async fn stream_range(&self, key: &str) -> Result<Vec<StreamEntry>, StoreError> {
    self.check_open()?;
    match self.data.read().get(key) {
      Some(StoredValue::Stream(entries)) => Ok(entries.clone()),
      Some(StoredValue::List(_)) => Err(Self::wrong_type(key)),
      None => Ok(Vec::new()),
    }
  }

  async fn stream_len(&self, key: &str) -> Result<usize, StoreError> {
    self.check_open()?;
    match self.data.read().get(key) {
      Some(StoredValue::Stream(entries)) => Ok(entries.len()),
      Some(StoredValue::List(_)) => Err(Self::wrong_type(key)),
      None => Ok(0),
    }
  }

  async fn stream_add(&self, key: &str, entry: &StreamEntry) -> Result<(), StoreError> {
    self.check_writable(key)?;
    if entry.fields.is_empty() {
      return Err(StoreError::EmptyStreamEntry {
        key: key.to_string(),
      });
    }
    let id: StreamId = entry.id.parse()?;
    if id == (StreamId { ms: 0, seq: 0 }) {
      return Err(StoreError::InvalidStreamId {
        id: entry.id.clone(),
      });
    }

    let mut data = self.data.write();
    let value = data
      .entry(key.to_string())
      .or_insert_with(|| StoredValue::Stream(Vec::new()));

    let StoredValue::Stream(entries) = value else {
      return Err(Self::wrong_type(key));
    };

    if let Some(last) = entries.last() {
      let last_id: StreamId = last.id.parse()?;
      if id <= last_id {
        return Err(StoreError::StreamIdNotIncreasing {
          key: key.to_string(),
          id: entry.id.clone(),
        });
      }
    }

    entries.push(StreamEntry {
      id: id.to_string(),
      fields: entry.fields.clone(),
    });
    Ok(())
  }

  async fn disconnect(&self) {
    self.closed.store(true, Ordering::Relaxed);
  }
}

/// Convert a glob pattern to a regex
fn glob_to_regex(pattern: &str) -> Result<regex::Regex, StoreError> {
  let mut regex_str = String::with_capacity(pattern.len() * 2);
  regex_str.push('^');

  for c in pattern.chars() {
    match c {
      '*' => regex_str.push_str(".*"),
      '?' => regex_str.push('.'),
      '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\' => {
        regex_str.push('\\');
        regex_str.push(c);
      }
      _ => regex_str.push(c),
    }
  }

  regex_str.push('$');
  regex::Regex::new(&regex_str).map_err(|_| StoreError::InvalidPattern {
    pattern: pattern.to_string(),
  })
}
