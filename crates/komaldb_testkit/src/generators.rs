//! Property-based test generators using proptest.
//!
//! Provides strategies for keys, structured values and operation
//! sequences against a database.

use komaldb_core::Value;
use proptest::prelude::*;

/// Strategy for keys drawn from a small pool, so sequences revisit keys.
pub fn small_key_strategy() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|n| format!("k{n}"))
}

/// Strategy for arbitrary keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9:_.-]{1,24}").expect("Invalid regex")
}

/// Strategy for object field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z_]{0,7}").expect("Invalid regex")
}

/// Strategy for floats that survive a text round trip exactly.
///
/// Values are small dyadic rationals, never `-0.0` or non-finite.
pub fn float_strategy() -> impl Strategy<Value = f64> {
    (-1_000_000i32..1_000_000, 0u32..8).prop_map(|(mantissa, shift)| {
        f64::from(mantissa) / f64::from(1u32 << shift)
    })
}

/// Strategy for values that hold a NaN or infinite float somewhere.
pub fn non_finite_value_strategy() -> impl Strategy<Value = Value> {
    let bad = prop_oneof![
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
    .prop_map(Value::Float);
    (bad, field_name_strategy(), 0u8..3).prop_map(|(bad, name, depth)| match depth {
        0 => bad,
        1 => Value::Array(vec![Value::Null, bad]),
        _ => Value::object([(name, bad)]),
    })
}

/// Strategy for scalar values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        float_strategy().prop_map(Value::Float),
        prop::string::string_regex("[a-zA-Z0-9 @._\"\\\\-]{0,16}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for arbitrary structured values, nested up to three levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..6)
                .prop_map(Value::Object),
        ]
    })
}

/// Strategy for objects that carry `field` with a text value.
pub fn record_with_field_strategy(field: &'static str) -> impl Strategy<Value = (String, Value)> {
    (
        prop::string::string_regex("[a-d]").expect("Invalid regex"),
        prop::collection::btree_map(field_name_strategy(), scalar_value_strategy(), 0..3),
    )
        .prop_map(move |(indexed, mut fields)| {
            fields.insert(field.to_string(), Value::Text(indexed.clone()));
            (indexed, Value::Object(fields))
        })
}

/// One call against a database.
#[derive(Debug, Clone)]
pub enum Operation {
    /// `set(key, value)`
    Set {
        /// Key
        key: String,
        /// Value
        value: Value,
    },
    /// `transactional_set(key, value)`
    TransactionalSet {
        /// Key
        key: String,
        /// Value
        value: Value,
    },
    /// `delete(key)`
    Delete {
        /// Key
        key: String,
    },
    /// `get(key)`
    Get {
        /// Key
        key: String,
    },
    /// `begin()`
    Begin,
    /// `commit()`
    Commit,
    /// `rollback()`
    Rollback,
}

/// Strategy for a single operation over the small key pool.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        2 => (small_key_strategy(), scalar_value_strategy())
            .prop_map(|(key, value)| Operation::Set { key, value }),
        4 => (small_key_strategy(), value_strategy())
            .prop_map(|(key, value)| Operation::TransactionalSet { key, value }),
        1 => small_key_strategy().prop_map(|key| Operation::Delete { key }),
        2 => small_key_strategy().prop_map(|key| Operation::Get { key }),
        1 => Just(Operation::Begin),
        1 => Just(Operation::Commit),
        1 => Just(Operation::Rollback),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
