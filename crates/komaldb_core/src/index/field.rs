//! Single-field index.

use crate::index::key::IndexKey;
use crate::index::IndexPolicy;
use komaldb_codec::Value;
use std::collections::HashMap;

/// Index over one object field.
///
/// Maps each field value to the one key that owns it. A value is owned by the
/// key that wrote it most recently.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    field: String,
    policy: IndexPolicy,
    /// Field value -> owning key.
    owners: HashMap<IndexKey, String>,
    /// Key -> field value it last contributed. Only kept for `RetractStale`.
    contributions: HashMap<String, IndexKey>,
}

impl FieldIndex {
    /// Creates an empty index on `field`.
    pub fn new(field: impl Into<String>, policy: IndexPolicy) -> Self {
        Self {
            field: field.into(),
            policy,
            owners: HashMap::new(),
            contributions: HashMap::new(),
        }
    }

    /// Returns the indexed field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns true if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Discards all entries and indexes `entries` in iteration order.
    ///
    /// Later entries win when two keys share a field value.
    pub fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        self.clear();
        for (key, value) in entries {
            self.on_set(key, value);
        }
    }

    /// Records that `key` now holds `value`.
    pub fn on_set(&mut self, key: &str, value: &Value) {
        let new_entry = value.field(&self.field).and_then(IndexKey::from_value);

        if self.policy == IndexPolicy::RetractStale {
            if let Some(old) = self.contributions.remove(key) {
                if self.owners.get(&old).is_some_and(|owner| owner == key) {
                    self.owners.remove(&old);
                }
            }
            if let Some(entry) = &new_entry {
                self.contributions.insert(key.to_string(), entry.clone());
            }
        }

        if let Some(entry) = new_entry {
            self.owners.insert(entry, key.to_string());
        }
    }

    /// Removes every entry owned by `key`.
    pub fn on_delete(&mut self, key: &str) {
        self.owners.retain(|_, owner| owner != key);
        self.contributions.remove(key);
    }

    /// Returns the key that owns `value`, if any.
    #[must_use]
    pub fn lookup(&self, value: &Value) -> Option<&str> {
        let entry = IndexKey::from_value(value)?;
        self.owners.get(&entry).map(String::as_str)
    }

    /// Removes all entries, keeping the definition.
    pub fn clear(&mut self) {
        self.owners.clear();
        self.contributions.clear();
    }
}
