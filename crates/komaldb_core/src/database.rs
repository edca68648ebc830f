//! Database facade.

use crate::audit::{AuditLevel, AuditLog};
use crate::config::Config;
use crate::dir::DatabaseDir;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexManager;
use crate::lock::LockTable;
use crate::persistence::Snapshotter;
use crate::store::Store;
use crate::transaction::TransactionManager;
use crate::types::TransactionId;
use komaldb_codec::Value;
use komaldb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::RwLock;
use std::path::Path;
use tracing::{debug, info};

/// The main database handle.
///
/// `Database` is the entry point of KomalDB. It provides:
/// - Key-value operations with per-key mutual exclusion
/// - Undo-log transactions (`begin` / `commit` / `rollback`)
/// - Single-field secondary indexes
/// - Snapshot persistence and an audit log
///
/// `Database` is `Send + Sync`; share it between threads with `Arc`.
///
/// # Example
///
/// ```
/// use komaldb_core::{Database, Value};
///
/// let db = Database::open_in_memory().unwrap();
/// db.add_index("email");
/// db.set("user:1", Value::object([("email", Value::from("a@example.com"))])).unwrap();
///
/// let owner = db.search_by_index("email", &Value::from("a@example.com"));
/// assert_eq!(owner.as_deref(), Some("user:1"));
/// ```
pub struct Database {
    config: Config,
    locks: LockTable,
    store: Store,
    /// Also taken while the store is mutated, so index rebuilds see a
    /// consistent store.
    indexes: RwLock<IndexManager>,
    transactions: TransactionManager,
    snapshots: Snapshotter,
    audit: AuditLog,
    /// Declared last: the directory lock is released after everything else
    /// has been flushed.
    dir: Option<DatabaseDir>,
}

impl Database {
    /// Opens a database directory with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another engine has the directory locked (`DatabaseLocked`)
    /// - The snapshot cannot be read or decoded
    /// - I/O errors occur
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database directory with a custom configuration.
    ///
    /// ```no_run
    /// use komaldb_core::{Config, Database, Format};
    /// use std::path::Path;
    ///
    /// let config = Config::default().snapshot_format(Format::Cbor);
    /// let db = Database::open_with_config(Path::new("my_database"), config).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open). Also fails with `InvalidConfig` if the
    /// configuration does not validate.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        config.validate()?;
        let dir = DatabaseDir::open(path, config.create_if_missing)?;

        let snapshot = FileBackend::open(&dir.snapshot_path(config.snapshot_format))?;
        let audit: Option<Box<dyn StorageBackend>> = if config.audit {
            Some(Box::new(FileBackend::open(&dir.audit_path())?))
        } else {
            None
        };

        let db = Self::assemble(config, Box::new(snapshot), audit, Some(dir))?;
        info!(path = %path.display(), keys = db.len(), "database opened");
        Ok(db)
    }

    /// Opens a database over caller-supplied backends.
    ///
    /// `snapshot` holds the snapshot document; `audit`, if given and
    /// auditing is enabled in `config`, receives the audit log.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the existing
    /// snapshot cannot be decoded.
    pub fn open_with_backends(
        config: Config,
        snapshot: Box<dyn StorageBackend>,
        audit: Option<Box<dyn StorageBackend>>,
    ) -> CoreResult<Self> {
        config.validate()?;
        Self::assemble(config, snapshot, audit, None)
    }

    /// Opens a fresh, empty, non-persistent database with auditing disabled.
    ///
    /// # Errors
    ///
    /// Only fails if the default configuration is invalid, which it is not.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backends(
            Config::default().audit(false),
            Box::new(InMemoryBackend::new()),
            None,
        )
    }

    fn assemble(
        config: Config,
        snapshot: Box<dyn StorageBackend>,
        audit: Option<Box<dyn StorageBackend>>,
        dir: Option<DatabaseDir>,
    ) -> CoreResult<Self> {
        let audit = match audit {
            Some(backend) if config.audit => {
                AuditLog::new(backend, config.audit_level, config.sync_on_write)
            }
            _ => AuditLog::disabled(),
        };

        let snapshots = Snapshotter::new(snapshot, config.snapshot_format);
        let store = match snapshots.load()? {
            Some(entries) => {
                audit.info(format_args!("Database loaded ({} keys)", entries.len()));
                Store::with_entries(entries)
            }
            None => {
                audit.info("No database file found, starting with an empty store");
                Store::new()
            }
        };

        Ok(Self {
            locks: LockTable::new(config.lock_shards),
            store,
            indexes: RwLock::new(IndexManager::new(config.index_policy)),
            transactions: TransactionManager::new(config.nested_commit),
            snapshots,
            audit,
            dir,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database directory, or `None` for databases opened over
    /// explicit backends.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(DatabaseDir::path)
    }

    // ========================================================================
    // Key-value operations
    // ========================================================================

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Not undo-logged, even inside a transaction; use
    /// [`transactional_set`](Self::transactional_set) for that.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidValue`] if `value` holds a NaN or infinite
    /// float; nothing is changed then. Returns an error if the snapshot
    /// cannot be written. The in-memory update has already happened in that
    /// case.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        Self::check_storable(key, &value)?;
        let message = self
            .audit
            .enabled(AuditLevel::Info)
            .then(|| format!("Set key '{key}' to value '{value}'"));

        let _guard = self.locks.lock(key);
        {
            let mut indexes = self.indexes.write();
            indexes.on_set(key, &value);
            self.store.insert(key, value);
        }
        self.persist(format_args!("setting key '{key}'"))?;

        if let Some(message) = message {
            self.audit.info(message);
        }
        Ok(())
    }

    /// Returns the value under `key`, or `None` if there is none.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.locks.lock(key);
        let value = self.store.get(key);
        match &value {
            Some(v) => self.audit.info(format_args!("Get key '{key}' returned '{v}'")),
            None => self.audit.info(format_args!("Get key '{key}' returned nothing")),
        }
        value
    }

    /// Removes `key`. Deleting an absent key is a no-op.
    ///
    /// Returns true if the key was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn delete(&self, key: &str) -> CoreResult<bool> {
        let _guard = self.locks.lock(key);
        let removed = {
            let mut indexes = self.indexes.write();
            let removed = self.store.remove(key).is_some();
            if removed {
                indexes.on_delete(key);
            }
            removed
        };
        if !removed {
            return Ok(false);
        }

        self.persist(format_args!("deleting key '{key}'"))?;
        self.audit.info(format_args!("Deleted key '{key}'"));
        Ok(true)
    }

    /// Returns true if `key` holds a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if the database holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns every key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Returns every entry, sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.store.entries()
    }

    /// Removes every key and every index entry. Index definitions stay.
    ///
    /// Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn clear(&self) -> CoreResult<usize> {
        let guards = self.locks.lock_all();
        let removed = {
            let mut indexes = self.indexes.write();
            indexes.clear_entries();
            self.store.clear()
        };
        self.persist(format_args!("clearing"))?;
        drop(guards);

        self.audit.info("Database cleared");
        Ok(removed)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Stores `value` under `key`, first recording the previous value in the
    /// current transaction so `rollback` can restore it.
    ///
    /// Outside a transaction this is the same as [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidValue`] for values [`set`](Self::set)
    /// rejects, before anything is recorded, or an error if the snapshot
    /// cannot be written.
    pub fn transactional_set(&self, key: &str, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        Self::check_storable(key, &value)?;
        if self.transactions.is_active() {
            let prior = self.get(key);
            self.transactions.record(key, prior);
        }

        let message = self
            .audit
            .enabled(AuditLevel::Info)
            .then(|| format!("Transactional set: {key} = {value}"));
        self.set(key, value)?;
        if let Some(message) = message {
            self.audit.info(message);
        }
        Ok(())
    }

    /// Starts a (possibly nested) transaction.
    pub fn begin(&self) -> TransactionId {
        let id = self.transactions.begin();
        self.audit.info("Transaction started");
        id
    }

    /// Ends the innermost transaction, keeping its writes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoActiveTransaction`] if no transaction is open,
    /// or an error if the snapshot cannot be written.
    pub fn commit(&self) -> CoreResult<TransactionId> {
        let id = self
            .transactions
            .commit()
            .inspect_err(|_| self.audit.warning("Commit requested with no active transaction"))?;

        self.persist(format_args!("committing transaction {id}"))?;
        self.audit.info("Transaction committed");
        Ok(id)
    }

    /// Ends the innermost transaction, restoring every key it wrote through
    /// [`transactional_set`](Self::transactional_set).
    ///
    /// Each restore goes through the ordinary `set`/`delete` path, so the
    /// rollback is not one atomic step. If a restore fails, the transaction
    /// has already been removed from the stack.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoActiveTransaction`] if no transaction is open,
    /// or the first error hit while restoring.
    pub fn rollback(&self) -> CoreResult<TransactionId> {
        let frame = self
            .transactions
            .rollback()
            .inspect_err(|_| self.audit.warning("Rollback requested with no active transaction"))?;
        let id = frame.id();
        debug!(%id, records = frame.len(), "rolling back");

        for record in frame.into_undo_order() {
            match record.prior {
                Some(prior) => self.set(&record.key, prior)?,
                None => {
                    self.delete(&record.key)?;
                }
            }
        }

        self.persist(format_args!("rolling back transaction {id}"))?;
        self.audit.info("Transaction rolled back");
        Ok(id)
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.transactions.depth()
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Creates (or rebuilds) the index on `field` from the current contents.
    ///
    /// Keys are scanned in ascending order; when two keys share a field
    /// value, the later key owns it. Returns the number of index entries.
    pub fn add_index(&self, field: &str) -> usize {
        let count = {
            let mut indexes = self.indexes.write();
            let entries = self.store.entries();
            indexes.add_index(field, entries.iter().map(|(k, v)| (k.as_str(), v)))
        };
        self.audit
            .info(format_args!("Index added on field '{field}' ({count} entries)"));
        count
    }

    /// Removes the index on `field`. Returns false if there was none.
    pub fn drop_index(&self, field: &str) -> bool {
        let dropped = self.indexes.write().drop_index(field);
        if dropped {
            self.audit.info(format_args!("Index dropped on field '{field}'"));
        }
        dropped
    }

    /// Returns the indexed field names, sorted.
    #[must_use]
    pub fn indexes(&self) -> Vec<String> {
        self.indexes.read().names()
    }

    /// Returns true if `field` is indexed.
    #[must_use]
    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.read().has_index(field)
    }

    /// Returns the key owning `value` in the index on `field`.
    ///
    /// `None` if the field is not indexed, `value` is not a scalar, or no key
    /// owns it.
    #[must_use]
    pub fn search_by_index(&self, field: &str, value: &Value) -> Option<String> {
        let owner = self.indexes.read().search(field, value);
        match &owner {
            Some(key) => self.audit.info(format_args!(
                "Search on index '{field}' for '{value}' returned '{key}'"
            )),
            None => self.audit.info(format_args!(
                "Search on index '{field}' for '{value}' returned nothing"
            )),
        }
        owner
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Writes the snapshot now, regardless of `Config::autosave`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded or written.
    pub fn save(&self) -> CoreResult<()> {
        let bytes = self.snapshots.save(&self.store)?;
        self.audit
            .debug(format_args!("Database saved ({bytes} bytes)"));
        Ok(())
    }

    /// Saves, flushes and releases the database.
    ///
    /// Dropping a `Database` releases it too, but without the final save and
    /// without reporting errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the final save or flush fails.
    pub fn close(self) -> CoreResult<()> {
        if self.transactions.is_active() {
            self.audit.warning(format_args!(
                "Closing with {} open transaction(s)",
                self.transactions.depth()
            ));
        }
        self.save()?;
        self.snapshots.flush()?;
        self.audit.flush()?;
        info!("database closed");
        Ok(())
    }

    /// Saves if autosave is on. A failed save is audited at ERROR; the
    /// in-memory change it follows is kept.
    fn persist(&self, action: std::fmt::Arguments<'_>) -> CoreResult<()> {
        if !self.config.autosave {
            return Ok(());
        }
        self.save().inspect_err(|e| {
            self.audit
                .error(format_args!("Failed to save database after {action}: {e}"));
        })
    }

    fn check_storable(key: &str, value: &Value) -> CoreResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(CoreError::invalid_value(
                key,
                "NaN and infinite floats cannot be stored",
            ))
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("keys", &self.len())
            .field("indexes", &self.indexes())
            .field("transaction_depth", &self.transaction_depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexPolicy;
    use crate::transaction::NestedCommit;
    use komaldb_codec::Format;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn create_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn audited_db(config: Config) -> (Database, InMemoryBackend, InMemoryBackend) {
        let snapshot = InMemoryBackend::new();
        let audit = InMemoryBackend::new();
        let db = Database::open_with_backends(
            config,
            Box::new(snapshot.clone()),
            Some(Box::new(audit.clone())),
        )
        .unwrap();
        (db, snapshot, audit)
    }

    fn audit_messages(audit: &InMemoryBackend) -> Vec<String> {
        String::from_utf8(audit.data())
            .unwrap()
            .lines()
            .map(|line| line.splitn(2, " - ").nth(1).unwrap().to_string())
            .collect()
    }

    fn email(addr: &str) -> Value {
        Value::object([("email", Value::from(addr))])
    }

    #[test]
    fn database_is_send_sync() {
        fn check<T: Send + Sync>() {}
        check::<Database>();
    }

    #[test]
    fn get_missing_is_none() {
        let db = create_db();
        assert_eq!(db.get("never"), None);
        assert!(db.is_empty());
    }

    #[test]
    fn set_then_get() {
        let db = create_db();
        let value = Value::object([
            ("name", Value::from("Ada")),
            ("tags", Value::from(vec!["x", "y"])),
            ("age", Value::from(36)),
        ]);
        db.set("user:1", value.clone()).unwrap();
        assert_eq!(db.get("user:1"), Some(value));
        assert!(db.contains_key("user:1"));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn stored_null_is_present() {
        let db = create_db();
        db.set("k", Value::Null).unwrap();
        assert_eq!(db.get("k"), Some(Value::Null));
    }

    #[test]
    fn delete_then_get() {
        let db = create_db();
        db.set("k", 1).unwrap();
        assert!(db.delete("k").unwrap());
        assert_eq!(db.get("k"), None);
        assert!(!db.delete("k").unwrap());
    }

    #[test]
    fn rollback_restores_absent_key() {
        let db = create_db();
        db.begin();
        db.transactional_set("k", "v1").unwrap();
        assert_eq!(db.get("k"), Some(Value::from("v1")));
        db.rollback().unwrap();
        assert_eq!(db.get("k"), None);
    }

    #[test]
    fn rollback_restores_previous_value() {
        let db = create_db();
        db.set("k", "before").unwrap();
        db.begin();
        db.transactional_set("k", "v1").unwrap();
        db.rollback().unwrap();
        assert_eq!(db.get("k"), Some(Value::from("before")));
    }

    #[test]
    fn rollback_after_two_writes_restores_first_prior() {
        let db = create_db();
        db.set("k", "v0").unwrap();
        db.begin();
        db.transactional_set("k", "v1").unwrap();
        db.transactional_set("k", "v2").unwrap();
        db.rollback().unwrap();
        assert_eq!(db.get("k"), Some(Value::from("v0")));
    }

    #[test]
    fn rollback_restores_stored_null() {
        let db = create_db();
        db.set("k", Value::Null).unwrap();
        db.begin();
        db.transactional_set("k", 5).unwrap();
        db.rollback().unwrap();
        assert_eq!(db.get("k"), Some(Value::Null));
    }

    #[test]
    fn plain_set_is_not_undone() {
        let db = create_db();
        db.begin();
        db.set("k", 1).unwrap();
        db.rollback().unwrap();
        assert_eq!(db.get("k"), Some(Value::from(1)));
    }

    #[test]
    fn transactional_set_outside_transaction() {
        let db = create_db();
        db.transactional_set("k", true).unwrap();
        assert_eq!(db.get("k"), Some(Value::Bool(true)));
        assert_eq!(db.transaction_depth(), 0);
    }

    #[test]
    fn commit_and_rollback_without_transaction() {
        let db = create_db();
        assert!(matches!(db.commit(), Err(CoreError::NoActiveTransaction)));
        assert!(matches!(db.rollback(), Err(CoreError::NoActiveTransaction)));
    }

    #[test]
    fn commit_keeps_writes() {
        let db = create_db();
        db.begin();
        db.transactional_set("k", 1).unwrap();
        db.commit().unwrap();
        assert_eq!(db.get("k"), Some(Value::from(1)));
        assert_eq!(db.transaction_depth(), 0);
    }

    #[test]
    fn nested_commit_independent() {
        let db = create_db();
        db.begin();
        db.begin();
        db.transactional_set("k", 1).unwrap();
        db.commit().unwrap();
        db.rollback().unwrap();
        assert_eq!(db.get("k"), Some(Value::from(1)));
    }

    #[test]
    fn nested_commit_merge_into_parent() {
        let db = Database::open_with_backends(
            Config::default()
                .audit(false)
                .nested_commit(NestedCommit::MergeIntoParent),
            Box::new(InMemoryBackend::new()),
            None,
        )
        .unwrap();

        db.begin();
        db.transactional_set("outer", 1).unwrap();
        db.begin();
        db.transactional_set("inner", 2).unwrap();
        db.commit().unwrap();
        db.rollback().unwrap();

        assert_eq!(db.get("outer"), None);
        assert_eq!(db.get("inner"), None);
    }

    #[test]
    fn index_last_writer_wins() {
        let db = create_db();
        db.add_index("email");
        db.set("k1", email("a")).unwrap();
        db.set("k2", email("a")).unwrap();
        assert_eq!(db.search_by_index("email", &Value::from("a")), Some("k2".to_string()));
    }

    #[test]
    fn add_index_scans_existing_keys_in_order() {
        let db = create_db();
        db.set("b", email("shared")).unwrap();
        db.set("a", email("shared")).unwrap();
        db.set("c", Value::from("not an object")).unwrap();
        assert_eq!(db.add_index("email"), 1);
        assert_eq!(
            db.search_by_index("email", &Value::from("shared")),
            Some("b".to_string())
        );
    }

    #[test]
    fn search_unknown_index_or_container_is_none() {
        let db = create_db();
        db.set("k1", email("a")).unwrap();
        assert_eq!(db.search_by_index("email", &Value::from("a")), None);
        db.add_index("email");
        assert_eq!(db.search_by_index("email", &Value::from(vec!["a"])), None);
    }

    #[test]
    fn delete_cleans_index() {
        let db = create_db();
        db.add_index("email");
        db.set("k1", email("a")).unwrap();
        db.delete("k1").unwrap();
        assert_eq!(db.search_by_index("email", &Value::from("a")), None);
    }

    #[test]
    fn retract_stale_policy() {
        let db = create_db();
        db.add_index("email");
        db.set("k1", email("old")).unwrap();
        db.set("k1", email("new")).unwrap();
        assert_eq!(db.search_by_index("email", &Value::from("old")), None);
        assert_eq!(db.search_by_index("email", &Value::from("new")), Some("k1".to_string()));
    }

    #[test]
    fn keep_stale_policy() {
        let db = Database::open_with_backends(
            Config::default()
                .audit(false)
                .index_policy(IndexPolicy::KeepStale),
            Box::new(InMemoryBackend::new()),
            None,
        )
        .unwrap();
        db.add_index("email");
        db.set("k1", email("old")).unwrap();
        db.set("k1", email("new")).unwrap();
        assert_eq!(db.search_by_index("email", &Value::from("old")), Some("k1".to_string()));
    }

    #[test]
    fn rollback_maintains_index() {
        let db = create_db();
        db.add_index("email");
        db.begin();
        db.transactional_set("k1", email("a")).unwrap();
        db.rollback().unwrap();
        assert_eq!(db.search_by_index("email", &Value::from("a")), None);
    }

    #[test]
    fn drop_index_and_listing() {
        let db = create_db();
        db.add_index("email");
        db.add_index("city");
        assert_eq!(db.indexes(), vec!["city", "email"]);
        assert!(db.drop_index("city"));
        assert!(!db.drop_index("city"));
        assert!(!db.has_index("city"));
    }

    #[test]
    fn clear_empties_store_and_indexes() {
        let db = create_db();
        db.add_index("email");
        db.set("k1", email("a")).unwrap();
        db.set("k2", 2).unwrap();
        assert_eq!(db.clear().unwrap(), 2);
        assert!(db.is_empty());
        assert!(db.has_index("email"));
        assert_eq!(db.search_by_index("email", &Value::from("a")), None);
    }

    #[test]
    fn entries_sorted() {
        let db = create_db();
        db.set("b", 2).unwrap();
        db.set("a", 1).unwrap();
        assert_eq!(db.keys(), vec!["a", "b"]);
        assert_eq!(
            db.entries(),
            vec![("a".to_string(), Value::from(1)), ("b".to_string(), Value::from(2))]
        );
    }

    #[test]
    fn every_mutation_rewrites_snapshot() {
        let (db, snapshot, _audit) = audited_db(Config::default());
        let mut scribble = snapshot.clone();

        db.set("k", 1).unwrap();
        assert_eq!(snapshot.data(), br#"{"k":1}"#);

        db.set("gone", 2).unwrap();
        db.delete("gone").unwrap();
        assert_eq!(snapshot.data(), br#"{"k":1}"#);

        db.begin();
        db.transactional_set("k", 2).unwrap();
        scribble.replace(b"stale").unwrap();
        db.commit().unwrap();
        assert_eq!(snapshot.data(), br#"{"k":2}"#);

        db.begin();
        db.transactional_set("k", 3).unwrap();
        db.transactional_set("new", 4).unwrap();
        assert_eq!(snapshot.data(), br#"{"k":3,"new":4}"#);
        db.rollback().unwrap();
        assert_eq!(snapshot.data(), br#"{"k":2}"#);

        // An empty frame restores nothing, so only the final save writes.
        db.begin();
        scribble.replace(b"stale").unwrap();
        db.rollback().unwrap();
        assert_eq!(snapshot.data(), br#"{"k":2}"#);

        db.clear().unwrap();
        assert_eq!(snapshot.data(), b"{}");
    }

    #[test]
    fn non_finite_float_is_rejected_without_side_effects() {
        let (db, snapshot, _audit) = audited_db(Config::default());
        db.add_index("score");
        db.set("ok", 1).unwrap();

        let err = db.set("bad", Value::Float(f64::INFINITY)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { ref key, .. } if key == "bad"));
        let nested = Value::object([("score", Value::from(vec![Value::Float(f64::NAN)]))]);
        assert!(matches!(db.set("bad", nested), Err(CoreError::InvalidValue { .. })));
        let scored = Value::object([("score", Value::Float(f64::NAN))]);
        assert!(matches!(db.set("bad", scored), Err(CoreError::InvalidValue { .. })));

        assert!(!db.contains_key("bad"));
        assert_eq!(db.search_by_index("score", &Value::Float(f64::NAN)), None);

        db.set("other", 2).unwrap();
        assert_eq!(snapshot.data(), br#"{"ok":1,"other":2}"#);
    }

    #[test]
    fn transactional_set_rejects_non_finite_before_recording() {
        let db = create_db();
        db.set("k", 1).unwrap();
        db.begin();
        assert!(matches!(
            db.transactional_set("k", f64::NAN),
            Err(CoreError::InvalidValue { .. })
        ));
        db.transactional_set("j", 5).unwrap();
        db.rollback().unwrap();
        assert_eq!(db.get("k"), Some(Value::from(1)));
        assert!(!db.contains_key("j"));
    }

    #[derive(Debug, Default)]
    struct ReadOnlyBackend;

    impl StorageBackend for ReadOnlyBackend {
        fn read_all(&self) -> komaldb_storage::StorageResult<Vec<u8>> {
            Ok(Vec::new())
        }

        fn append(&mut self, _data: &[u8]) -> komaldb_storage::StorageResult<u64> {
            Ok(0)
        }

        fn replace(&mut self, _data: &[u8]) -> komaldb_storage::StorageResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn flush(&mut self) -> komaldb_storage::StorageResult<()> {
            Ok(())
        }

        fn sync(&mut self) -> komaldb_storage::StorageResult<()> {
            Ok(())
        }

        fn size(&self) -> komaldb_storage::StorageResult<u64> {
            Ok(0)
        }
    }

    #[test]
    fn failed_save_is_audited_as_error() {
        let audit = InMemoryBackend::new();
        let db = Database::open_with_backends(
            Config::default(),
            Box::new(ReadOnlyBackend),
            Some(Box::new(audit.clone())),
        )
        .unwrap();

        assert!(matches!(db.set("k", 1), Err(CoreError::Storage(_))));
        assert!(db.contains_key("k"));
        assert!(matches!(db.delete("k"), Err(CoreError::Storage(_))));
        db.begin();
        assert!(matches!(db.commit(), Err(CoreError::Storage(_))));
        db.begin();
        assert!(matches!(db.rollback(), Err(CoreError::Storage(_))));
        assert!(matches!(db.clear(), Err(CoreError::Storage(_))));

        let errors: Vec<String> = audit_messages(&audit)
            .into_iter()
            .filter(|line| line.starts_with("ERROR - "))
            .collect();
        assert_eq!(errors.len(), 5);
        assert!(errors[0].starts_with("ERROR - Failed to save database after setting key 'k': "));
        assert!(errors[0].contains("read-only"));
        assert!(errors[1].starts_with("ERROR - Failed to save database after deleting key 'k'"));
        assert!(errors[2].starts_with("ERROR - Failed to save database after committing transaction"));
        assert!(errors[3].starts_with("ERROR - Failed to save database after rolling back transaction"));
        assert!(errors[4].starts_with("ERROR - Failed to save database after clearing"));
        assert!(!audit_messages(&audit).iter().any(|line| line == "INFO - Set key 'k' to value '1'"));
    }

    #[test]
    fn autosave_off_defers_snapshot() {
        let (db, snapshot, _audit) = audited_db(Config::default().autosave(false));
        db.set("k", 1).unwrap();
        assert!(snapshot.data().is_empty());
        db.save().unwrap();
        assert_eq!(snapshot.data(), br#"{"k":1}"#);
    }

    #[test]
    fn snapshot_round_trip_over_backends() {
        let snapshot = InMemoryBackend::new();
        let config = Config::default().audit(false);
        {
            let db =
                Database::open_with_backends(config.clone(), Box::new(snapshot.clone()), None)
                    .unwrap();
            db.set("a", email("x")).unwrap();
            db.set("b", Value::from(vec![1, 2, 3])).unwrap();
            db.set("c", Value::Float(2.5)).unwrap();
        }

        let reopened =
            Database::open_with_backends(config, Box::new(snapshot), None).unwrap();
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.get("a"), Some(email("x")));
        assert_eq!(reopened.get("b"), Some(Value::from(vec![1, 2, 3])));
        assert_eq!(reopened.get("c"), Some(Value::Float(2.5)));
    }

    #[test]
    fn file_database_round_trip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db");
        {
            let db = Database::open(&path).unwrap();
            db.set("user:1", email("a@b")).unwrap();
            db.close().unwrap();
        }
        assert!(path.join("database.json").exists());
        assert!(path.join("audit.log").exists());

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get("user:1"), Some(email("a@b")));
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn cbor_database_round_trip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db");
        let config = Config::default().snapshot_format(Format::Cbor);
        {
            let db = Database::open_with_config(&path, config.clone()).unwrap();
            db.set("k", Value::object([("n", Value::Integer(-4))])).unwrap();
        }
        assert!(path.join("database.cbor").exists());

        let db = Database::open_with_config(&path, config).unwrap();
        assert_eq!(db.get("k"), Some(Value::object([("n", Value::Integer(-4))])));
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db");
        let _db = Database::open(&path).unwrap();
        assert!(matches!(Database::open(&path), Err(CoreError::DatabaseLocked)));
    }

    #[test]
    fn invalid_config_rejected() {
        let result = Database::open_with_backends(
            Config::default().lock_shards(0),
            Box::new(InMemoryBackend::new()),
            None,
        );
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn audit_records_operations() {
        let (db, _snapshot, audit) = audited_db(Config::default());
        db.begin();
        db.transactional_set("k", "v").unwrap();
        db.commit().unwrap();
        let _ = db.get("k");
        db.delete("k").unwrap();
        let _ = db.rollback();

        assert_eq!(
            audit_messages(&audit),
            vec![
                "INFO - No database file found, starting with an empty store",
                "INFO - Transaction started",
                "INFO - Get key 'k' returned nothing",
                "INFO - Set key 'k' to value '\"v\"'",
                "INFO - Transactional set: k = \"v\"",
                "INFO - Transaction committed",
                "INFO - Get key 'k' returned '\"v\"'",
                "INFO - Deleted key 'k'",
                "WARNING - Rollback requested with no active transaction",
            ]
        );
    }

    #[test]
    fn audit_debug_level_includes_saves() {
        let (db, _snapshot, audit) =
            audited_db(Config::default().audit_level(AuditLevel::Debug));
        db.set("k", 1).unwrap();
        let messages = audit_messages(&audit);
        assert!(messages.iter().any(|m| m.starts_with("DEBUG - Database saved")));
    }

    #[test]
    fn audit_disabled_writes_nothing() {
        let (db, _snapshot, audit) = audited_db(Config::default().audit(false));
        db.set("k", 1).unwrap();
        assert!(audit.data().is_empty());
    }

    #[test]
    fn concurrent_distinct_keys() {
        let db = Arc::new(create_db());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for i in 0..50 {
                        db.set(&format!("t{t}:k{i}"), i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(db.len(), 400);
        for t in 0..8 {
            for i in 0..50 {
                assert_eq!(db.get(&format!("t{t}:k{i}")), Some(Value::from(i)));
            }
        }
    }

    #[test]
    fn concurrent_same_key_is_never_torn() {
        let db = Arc::new(create_db());
        let a = Value::object([("writer", Value::from("a")), ("n", Value::from(1))]);
        let b = Value::object([("writer", Value::from("b")), ("n", Value::from(2))]);

        let handles: Vec<_> = [a.clone(), b.clone()]
            .into_iter()
            .map(|value| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for _ in 0..100 {
                        db.set("shared", value.clone()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = db.get("shared").unwrap();
        assert!(last == a || last == b);
    }

    #[test]
    fn concurrent_writers_snapshot_is_complete() {
        let snapshot = InMemoryBackend::new();
        let db = Arc::new(
            Database::open_with_backends(
                Config::default().audit(false),
                Box::new(snapshot.clone()),
                None,
            )
            .unwrap(),
        );
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for i in 0..25 {
                        db.set(&format!("{t}-{i}"), i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let saved: std::collections::HashMap<String, Value> =
            Format::Json.decode(&snapshot.data()).unwrap();
        assert_eq!(saved.len(), 100);
    }
}
