//! Index registry and maintenance.

use crate::index::field::FieldIndex;
use crate::index::IndexPolicy;
use komaldb_codec::Value;
use std::collections::HashMap;
use tracing::debug;

/// All indexes of a database, keyed by field name.
#[derive(Debug)]
pub struct IndexManager {
    policy: IndexPolicy,
    indexes: HashMap<String, FieldIndex>,
}

impl IndexManager {
    /// Creates a manager with no indexes.
    #[must_use]
    pub fn new(policy: IndexPolicy) -> Self {
        Self {
            policy,
            indexes: HashMap::new(),
        }
    }

    /// Returns the maintenance policy.
    #[must_use]
    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// Creates (or recreates) the index on `field` from `entries`.
    ///
    /// Returns the number of entries in the new index.
    pub fn add_index<'a, I>(&mut self, field: &str, entries: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut index = FieldIndex::new(field, self.policy);
        index.rebuild(entries);
        let len = index.len();
        debug!(field, entries = len, "index built");
        self.indexes.insert(field.to_string(), index);
        len
    }

    /// Removes the index on `field`. Returns false if there was none.
    pub fn drop_index(&mut self, field: &str) -> bool {
        self.indexes.remove(field).is_some()
    }

    /// Returns true if `field` is indexed.
    #[must_use]
    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.contains_key(field)
    }

    /// Returns the indexed field names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Updates every index after `key` was set to `value`.
    pub fn on_set(&mut self, key: &str, value: &Value) {
        for index in self.indexes.values_mut() {
            index.on_set(key, value);
        }
    }

    /// Updates every index after `key` was deleted.
    pub fn on_delete(&mut self, key: &str) {
        for index in self.indexes.values_mut() {
            index.on_delete(key);
        }
    }

    /// Looks up the key owning `value` in the index on `field`.
    ///
    /// Returns `None` if there is no such index or no owner.
    #[must_use]
    pub fn search(&self, field: &str, value: &Value) -> Option<String> {
        self.indexes
            .get(field)?
            .lookup(value)
            .map(str::to_string)
    }

    /// Empties every index, keeping the definitions.
    pub fn clear_entries(&mut self) {
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }
}
