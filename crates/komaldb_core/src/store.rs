//! Key-value map.
//!
//! The store itself only guards its map for the duration of a single map
//! operation. Per-key exclusion across a whole engine operation is the job of
//! [`LockTable`](crate::lock::LockTable); the database takes the key's guard
//! before touching the store.

use komaldb_codec::{CodecResult, Format, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Mapping from key to structured value.
#[derive(Debug, Default)]
pub struct Store {
    entries: RwLock<HashMap<String, Value>>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `entries`.
    #[must_use]
    pub fn with_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns a copy of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn insert(&self, key: &str, value: Value) -> Option<Value> {
        self.entries.write().insert(key.to_string(), value)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.write().remove(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Returns every entry sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        let mut all: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Returns every key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Encodes the whole store as one document whose top level maps key to
    /// value. Keys appear in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in `format`.
    pub fn encode(&self, format: Format) -> CodecResult<Vec<u8>> {
        let entries = self.entries.read();
        let sorted: BTreeMap<&str, &Value> =
            entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        format.encode(&sorted)
    }

    /// Decodes a document produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a mapping from string to value.
    pub fn decode(format: Format, bytes: &[u8]) -> CodecResult<HashMap<String, Value>> {
        format.decode(bytes)
    }
}
