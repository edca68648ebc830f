//! Cross-crate integration test helpers.
//!
//! [`ModelHarness`] drives a database and a plain reference model with the
//! same operations and checks that they agree.

use crate::generators::Operation;
use komaldb_core::{CoreError, Database, Value};
use std::collections::HashMap;

/// Reference model of a database with independent nested commits.
#[derive(Debug, Default, Clone)]
pub struct Model {
    entries: HashMap<String, Value>,
    frames: Vec<Vec<(String, Option<Value>)>>,
}

impl Model {
    /// Returns the modelled value of `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the modelled number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the model holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the modelled transaction depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Applies `op`. Returns false for commit/rollback with no transaction.
    pub fn apply(&mut self, op: &Operation) -> bool {
        match op {
            Operation::Set { key, value } => {
                self.entries.insert(key.clone(), value.clone());
            }
            Operation::TransactionalSet { key, value } => {
                let prior = self.entries.get(key).cloned();
                if let Some(frame) = self.frames.last_mut() {
                    frame.push((key.clone(), prior));
                }
                self.entries.insert(key.clone(), value.clone());
            }
            Operation::Delete { key } => {
                self.entries.remove(key);
            }
            Operation::Get { .. } => {}
            Operation::Begin => self.frames.push(Vec::new()),
            Operation::Commit => return self.frames.pop().is_some(),
            Operation::Rollback => {
                let Some(frame) = self.frames.pop() else {
                    return false;
                };
                for (key, prior) in frame.into_iter().rev() {
                    match prior {
                        Some(value) => {
                            self.entries.insert(key, value);
                        }
                        None => {
                            self.entries.remove(&key);
                        }
                    }
                }
            }
        }
        true
    }
}

/// A database paired with its reference model.
pub struct ModelHarness {
    /// The database instance.
    pub db: Database,
    /// The expected state.
    pub model: Model,
}

impl ModelHarness {
    /// Creates a harness with an in-memory database.
    pub fn new() -> Self {
        Self::with_database(Database::open_in_memory().expect("Failed to open database"))
    }

    /// Creates a harness over an existing, empty database.
    pub fn with_database(db: Database) -> Self {
        Self {
            db,
            model: Model::default(),
        }
    }

    /// Applies `op` to both sides and checks the outcome agrees.
    pub fn apply(&mut self, op: &Operation) {
        let expected_ok = self.model.apply(op);
        let result: Result<(), CoreError> = match op {
            Operation::Set { key, value } => self.db.set(key, value.clone()),
            Operation::TransactionalSet { key, value } => {
                self.db.transactional_set(key, value.clone())
            }
            Operation::Delete { key } => self.db.delete(key).map(|_| ()),
            Operation::Get { key } => {
                assert_eq!(self.db.get(key).as_ref(), self.model.get(key), "get {key}");
                Ok(())
            }
            Operation::Begin => {
                self.db.begin();
                Ok(())
            }
            Operation::Commit => self.db.commit().map(|_| ()),
            Operation::Rollback => self.db.rollback().map(|_| ()),
        };

        match result {
            Ok(()) => assert!(expected_ok, "{op:?} succeeded but the model expected an error"),
            Err(CoreError::NoActiveTransaction) => {
                assert!(!expected_ok, "{op:?} failed but the model expected success");
            }
            Err(e) => panic!("{op:?} failed: {e}"),
        }
        assert_eq!(self.db.transaction_depth(), self.model.depth());
    }

    /// Applies every operation in order.
    pub fn apply_all(&mut self, ops: &[Operation]) {
        for op in ops {
            self.apply(op);
        }
    }

    /// Verifies the full contents of the database match the model.
    pub fn verify_all(&self) {
        assert_eq!(self.db.len(), self.model.len(), "key count mismatch");
        for (key, value) in self.db.entries() {
            assert_eq!(Some(&value), self.model.get(&key), "value mismatch for {key}");
        }
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestDatabase;
    use crate::generators::*;
    use komaldb_core::{Config, Format};
    use proptest::prelude::*;

    #[test]
    fn harness_tracks_rollback() {
        let mut harness = ModelHarness::new();
        harness.apply_all(&[
            Operation::Set {
                key: "k".into(),
                value: Value::from(1),
            },
            Operation::Begin,
            Operation::TransactionalSet {
                key: "k".into(),
                value: Value::from(2),
            },
            Operation::TransactionalSet {
                key: "j".into(),
                value: Value::Null,
            },
            Operation::Rollback,
            Operation::Get { key: "k".into() },
            Operation::Get { key: "j".into() },
            Operation::Commit,
        ]);
        harness.verify_all();
        assert_eq!(harness.db.get("k"), Some(Value::from(1)));
        assert!(!harness.db.contains_key("j"));
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn unset_key_is_absent(key in key_strategy()) {
            let db = TestDatabase::memory();
            prop_assert_eq!(db.get(&key), None);
        }

        #[test]
        fn set_then_get_returns_value(key in key_strategy(), value in value_strategy()) {
            let db = TestDatabase::memory();
            db.set(&key, value.clone()).unwrap();
            prop_assert_eq!(db.get(&key), Some(value));
        }

        #[test]
        fn delete_then_get_is_absent(key in key_strategy(), value in value_strategy()) {
            let db = TestDatabase::memory();
            db.set(&key, value).unwrap();
            prop_assert!(db.delete(&key).unwrap());
            prop_assert_eq!(db.get(&key), None);
            prop_assert!(!db.delete(&key).unwrap());
        }

        #[test]
        fn rollback_restores_pre_transaction_value(
            key in key_strategy(),
            before in prop::option::of(value_strategy()),
            v1 in value_strategy(),
            v2 in value_strategy(),
        ) {
            let db = TestDatabase::memory();
            if let Some(before) = &before {
                db.set(&key, before.clone()).unwrap();
            }
            db.begin();
            db.transactional_set(&key, v1).unwrap();
            db.transactional_set(&key, v2).unwrap();
            db.rollback().unwrap();
            prop_assert_eq!(db.get(&key), before);
        }

        #[test]
        fn last_writer_owns_index_value(
            (indexed, first) in record_with_field_strategy("email"),
            extra in prop::collection::btree_map(field_name_strategy(), scalar_value_strategy(), 0..3),
        ) {
            let db = TestDatabase::memory();
            db.add_index("email");
            let mut second = extra;
            second.insert("email".to_string(), Value::Text(indexed.clone()));

            db.set("k1", first).unwrap();
            db.set("k2", Value::Object(second)).unwrap();
            prop_assert_eq!(
                db.search_by_index("email", &Value::Text(indexed)),
                Some("k2".to_string())
            );
        }

        #[test]
        fn non_finite_values_never_reach_the_store(
            key in key_strategy(),
            bad in non_finite_value_strategy(),
            good in value_strategy(),
        ) {
            let db = TestDatabase::memory_with_config(Config::default());
            let rejected = matches!(
                db.set(&key, bad.clone()),
                Err(CoreError::InvalidValue { .. })
            );
            prop_assert!(rejected);
            let rejected = matches!(
                db.transactional_set(&key, bad),
                Err(CoreError::InvalidValue { .. })
            );
            prop_assert!(rejected);
            prop_assert!(!db.contains_key(&key));

            db.set(&key, good.clone()).unwrap();
            let db = db.reopen();
            prop_assert_eq!(db.get(&key), Some(good));
        }

        #[test]
        fn snapshot_round_trip(
            entries in prop::collection::hash_map(key_strategy(), value_strategy(), 0..12),
            cbor in any::<bool>(),
        ) {
            let format = if cbor { Format::Cbor } else { Format::Json };
            let db = TestDatabase::memory_with_config(
                Config::default().audit(false).snapshot_format(format),
            );
            for (key, value) in &entries {
                db.set(key, value.clone()).unwrap();
            }
            let before = db.entries();

            let db = db.reopen();
            prop_assert_eq!(db.entries(), before);
        }

        #[test]
        fn random_sequences_match_model(ops in operation_sequence_strategy(1, 40)) {
            let mut harness = ModelHarness::new();
            harness.apply_all(&ops);
            harness.verify_all();
        }
    }
}
