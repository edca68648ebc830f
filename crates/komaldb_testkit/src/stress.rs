//! Stress runners for KomalDB.
//!
//! These exercise the engine under heavy load and concurrent access.

use komaldb_core::{Database, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform (split across threads).
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct keys for mixed workloads.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            key_count: 1_000,
        }
    }
}

impl StressConfig {
    /// A configuration small enough for unit tests.
    #[must_use]
    pub fn small() -> Self {
        Self {
            operations: 400,
            threads: 4,
            key_count: 50,
        }
    }
}

/// The value written by `thread` for its `i`-th operation.
pub fn payload(thread: usize, i: usize) -> Value {
    Value::object([
        ("thread", Value::from(i64::try_from(thread).unwrap_or(i64::MAX))),
        ("seq", Value::from(i64::try_from(i).unwrap_or(i64::MAX))),
        ("body", Value::from("x".repeat(32))),
    ])
}

/// Sequential `set` on distinct keys.
pub fn stress_sequential_writes(db: &Database, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match db.set(&format!("seq:{i}"), payload(0, i)) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Each thread sets its own disjoint range of keys `t<thread>:<i>`.
///
/// Every key is readable afterwards with the value its thread wrote.
pub fn stress_concurrent_distinct_keys(
    db: Arc<Database>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    match db.set(&format!("t{t}:{i}"), payload(t, i)) {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Every thread repeatedly sets the same `key` to its own payload.
///
/// Returns the final value and the payloads that were written.
pub fn stress_same_key_race(
    db: Arc<Database>,
    key: &str,
    threads: usize,
    rounds: usize,
) -> (Option<Value>, Vec<Value>) {
    let candidates: Vec<Value> = (0..threads).map(|t| payload(t, 0)).collect();

    let handles: Vec<_> = candidates
        .iter()
        .cloned()
        .map(|value| {
            let db = Arc::clone(&db);
            let key = key.to_string();
            thread::spawn(move || {
                for _ in 0..rounds {
                    db.set(&key, value.clone()).expect("set failed");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    (db.get(key), candidates)
}

/// Threads mix `set`, `get`, `delete` and `search_by_index` over a shared
/// key range.
pub fn stress_mixed_operations(db: Arc<Database>, config: &StressConfig) -> StressTestResult {
    db.add_index("thread");

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);
    let key_count = config.key_count.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = format!("mixed:{}", (i * 7 + t) % key_count);
                    let result = match i % 4 {
                        0 | 1 => db.set(&key, payload(t, i)),
                        2 => db.delete(&key).map(|_| ()),
                        _ => {
                            let _ = db.get(&key);
                            let _ = db.search_by_index("thread", &Value::from(t as i64));
                            Ok(())
                        }
                    };
                    match result {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Checks that whenever the index on `field` names an owner for a stored
/// field value, that owner currently holds the value.
pub fn verify_index_consistency(db: &Database, field: &str) -> bool {
    db.entries()
        .iter()
        .filter_map(|(_, value)| value.field(field).filter(|v| v.is_scalar()).cloned())
        .all(|indexed| match db.search_by_index(field, &indexed) {
            Some(owner) => db
                .get(&owner)
                .is_some_and(|current| current.field(field) == Some(&indexed)),
            None => true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestDatabase;

    #[test]
    fn sequential_writes_all_succeed() {
        let db = TestDatabase::memory();
        let config = StressConfig::small();
        let result = stress_sequential_writes(&db, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(db.len(), config.operations);
    }

    #[test]
    fn concurrent_distinct_keys_are_all_readable() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = StressConfig::small();
        let result = stress_concurrent_distinct_keys(Arc::clone(&db), &config);

        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, config.operations);
        let per_thread = config.operations / config.threads;
        for t in 0..config.threads {
            for i in 0..per_thread {
                assert_eq!(db.get(&format!("t{t}:{i}")), Some(payload(t, i)));
            }
        }
    }

    #[test]
    fn same_key_race_ends_with_a_whole_value() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (last, candidates) = stress_same_key_race(Arc::clone(&db), "hot", 4, 50);
        let last = last.unwrap();
        assert!(candidates.contains(&last));
    }

    #[test]
    fn mixed_operations_keep_index_consistent() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let result = stress_mixed_operations(Arc::clone(&db), &StressConfig::small());
        assert_eq!(result.failed_ops, 0);
        assert!(verify_index_consistency(&db, "thread"));
    }

    #[test]
    fn file_backed_concurrent_writes() {
        let test_db = TestDatabase::file();
        let path = test_db.path().unwrap();
        let db = Arc::new(test_db.db);
        let config = StressConfig {
            operations: 80,
            threads: 4,
            key_count: 10,
        };
        stress_concurrent_distinct_keys(Arc::clone(&db), &config);

        let db = Arc::try_unwrap(db).expect("no other handles");
        db.close().unwrap();
        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.len(), 80);
    }
}
