//! Database directory management.
//!
//! An on-disk database is a directory:
//!
//! ```text
//! <db_path>/
//! ├─ LOCK              # Advisory lock, one engine per directory
//! ├─ database.json     # Snapshot (database.cbor for CBOR snapshots)
//! └─ audit.log         # Audit log
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use komaldb_codec::Format;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const SNAPSHOT_STEM: &str = "database";
const AUDIT_FILE: &str = "audit.log";

/// An opened database directory.
///
/// Holds an exclusive lock on the `LOCK` file for as long as it lives, so
/// only one `DatabaseDir` can exist per directory at a time. The lock is
/// released when the value is dropped.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens (or creates) a database directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - Another engine holds the lock (`DatabaseLocked`)
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "database directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the snapshot file path for `format`.
    #[must_use]
    pub fn snapshot_path(&self, format: Format) -> PathBuf {
        self.path
            .join(format!("{SNAPSHOT_STEM}.{}", format.extension()))
    }

    /// Returns the audit log path.
    #[must_use]
    pub fn audit_path(&self) -> PathBuf {
        self.path.join(AUDIT_FILE)
    }

    /// Returns true if no snapshot in `format` has been written yet.
    #[must_use]
    pub fn is_new_database(&self, format: Format) -> bool {
        !self.snapshot_path(format).exists()
    }
}
