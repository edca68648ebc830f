//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use komaldb_core::{Config, Database};
use komaldb_storage::{InMemoryBackend, StorageBackend};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    snapshot: Option<InMemoryBackend>,
    audit: Option<InMemoryBackend>,
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self::memory_with_config(Config::default().audit(false))
    }

    /// Creates an in-memory test database whose snapshot and audit
    /// backends can be inspected.
    pub fn memory_with_config(config: Config) -> Self {
        let snapshot = InMemoryBackend::new();
        let audit = InMemoryBackend::new();
        let db = Database::open_with_backends(
            config,
            Box::new(snapshot.clone()),
            Some(Box::new(audit.clone())),
        )
        .expect("Failed to open in-memory database");

        Self {
            db,
            snapshot: Some(snapshot),
            audit: Some(audit),
            temp_dir: None,
        }
    }

    /// Creates a new database in a fresh temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a database in a fresh temporary directory with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_with_config(&temp_dir.path().join("db"), config)
            .expect("Failed to open file database");

        Self {
            db,
            snapshot: None,
            audit: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("db"))
    }

    /// Returns the snapshot bytes of an in-memory database.
    pub fn snapshot_bytes(&self) -> Option<Vec<u8>> {
        self.snapshot.as_ref().map(InMemoryBackend::data)
    }

    /// Returns the audit log of an in-memory database, one entry per line.
    pub fn audit_lines(&self) -> Vec<String> {
        self.audit
            .as_ref()
            .map(|audit| {
                String::from_utf8_lossy(&audit.data())
                    .lines()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Closes the database and reopens it from the same storage.
    pub fn reopen(self) -> Self {
        let config = self.db.config().clone();
        match (self.snapshot, self.audit, self.temp_dir) {
            (Some(snapshot), audit, None) => {
                drop(self.db);
                let db = Database::open_with_backends(
                    config,
                    Box::new(snapshot.clone()),
                    audit.clone().map(|a| Box::new(a) as Box<dyn StorageBackend>),
                )
                .expect("Failed to reopen in-memory database");
                Self {
                    db,
                    snapshot: Some(snapshot),
                    audit,
                    temp_dir: None,
                }
            }
            (_, _, Some(temp_dir)) => {
                self.db.close().expect("Failed to close database");
                let db = Database::open_with_config(&temp_dir.path().join("db"), config)
                    .expect("Failed to reopen file database");
                Self {
                    db,
                    snapshot: None,
                    audit: None,
                    temp_dir: Some(temp_dir),
                }
            }
            (None, _, None) => unreachable!("test databases always have storage"),
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```
/// use komaldb_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     db.set("k", 1).unwrap();
///     assert!(db.contains_key("k"));
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a database in a temporary directory.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use komaldb_core::Value;

    /// Creates a database holding `count` user records `user:<i>`, each with
    /// a unique `email` field.
    pub fn populated_database(count: usize) -> TestDatabase {
        let test_db = TestDatabase::memory();
        for i in 0..count {
            test_db
                .db
                .set(&format!("user:{i}"), user(i))
                .expect("Failed to set user");
        }
        test_db
    }

    /// Like [`populated_database`], with an index on `email`.
    pub fn indexed_database(count: usize) -> TestDatabase {
        let test_db = populated_database(count);
        test_db.db.add_index("email");
        test_db
    }

    /// The record stored for user `i`.
    pub fn user(i: usize) -> Value {
        Value::object([
            ("email", Value::from(format!("user{i}@example.com"))),
            ("name", Value::from(format!("User {i}"))),
            ("id", Value::from(i64::try_from(i).unwrap_or(i64::MAX))),
        ])
    }
}
