//! Database configuration.

use crate::audit::AuditLevel;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexPolicy;
use crate::transaction::NestedCommit;
use komaldb_codec::Format;

/// Default number of lock shards.
pub const DEFAULT_LOCK_SHARDS: usize = 64;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Document format of the snapshot file.
    pub snapshot_format: Format,

    /// Whether to write the audit log.
    pub audit: bool,

    /// Minimum level of audit records that are written.
    pub audit_level: AuditLevel,

    /// Number of mutual-exclusion shards in the lock table.
    pub lock_shards: usize,

    /// What `commit` does with the undo records of a nested transaction.
    pub nested_commit: NestedCommit,

    /// How indexes treat the entry of a key whose field value changed.
    pub index_policy: IndexPolicy,

    /// Whether every mutation rewrites the snapshot.
    pub autosave: bool,

    /// Whether to fsync the audit log after every record.
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            snapshot_format: Format::Json,
            audit: true,
            audit_level: AuditLevel::Info,
            lock_shards: DEFAULT_LOCK_SHARDS,
            nested_commit: NestedCommit::Independent,
            index_policy: IndexPolicy::RetractStale,
            autosave: true,
            sync_on_write: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the snapshot document format.
    #[must_use]
    pub const fn snapshot_format(mut self, format: Format) -> Self {
        self.snapshot_format = format;
        self
    }

    /// Enables or disables the audit log.
    #[must_use]
    pub const fn audit(mut self, value: bool) -> Self {
        self.audit = value;
        self
    }

    /// Sets the minimum audit level.
    #[must_use]
    pub const fn audit_level(mut self, level: AuditLevel) -> Self {
        self.audit_level = level;
        self
    }

    /// Sets the number of lock shards.
    #[must_use]
    pub const fn lock_shards(mut self, shards: usize) -> Self {
        self.lock_shards = shards;
        self
    }

    /// Sets the nested commit behavior.
    #[must_use]
    pub const fn nested_commit(mut self, mode: NestedCommit) -> Self {
        self.nested_commit = mode;
        self
    }

    /// Sets the index maintenance policy.
    #[must_use]
    pub const fn index_policy(mut self, policy: IndexPolicy) -> Self {
        self.index_policy = policy;
        self
    }

    /// Sets whether mutations rewrite the snapshot.
    #[must_use]
    pub const fn autosave(mut self, value: bool) -> Self {
        self.autosave = value;
        self
    }

    /// Sets whether to fsync the audit log after every record.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Checks that the configuration can be used to open a database.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `lock_shards` is zero.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lock_shards == 0 {
            return Err(CoreError::invalid_config("lock_shards must be at least 1"));
        }
        Ok(())
    }
}
