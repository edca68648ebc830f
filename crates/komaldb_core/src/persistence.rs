//! Whole-store snapshots.

use crate::error::CoreResult;
use crate::store::Store;
use komaldb_codec::{Format, Value};
use komaldb_storage::StorageBackend;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Writes and reads the snapshot document of a store.
///
/// `save` encodes the store while holding the snapshot mutex, so a completed
/// save always contains every mutation that finished before it started.
/// Content is swapped with [`StorageBackend::replace`].
pub struct Snapshotter {
    backend: Mutex<Box<dyn StorageBackend>>,
    format: Format,
}

impl Snapshotter {
    /// Creates a snapshotter over `backend`.
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>, format: Format) -> Self {
        Self {
            backend: Mutex::new(backend),
            format,
        }
    }

    /// Reads the last saved snapshot.
    ///
    /// Returns `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or the document is not
    /// a mapping from key to value.
    pub fn load(&self) -> CoreResult<Option<HashMap<String, Value>>> {
        let data = self.backend.lock().read_all()?;
        if data.is_empty() {
            return Ok(None);
        }
        let entries = Store::decode(self.format, &data)?;
        debug!(entries = entries.len(), format = %self.format, "snapshot loaded");
        Ok(Some(entries))
    }

    /// Rewrites the snapshot from the current contents of `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be encoded or the backend write
    /// fails. The previous snapshot is left in place on error.
    pub fn save(&self, store: &Store) -> CoreResult<usize> {
        let mut backend = self.backend.lock();
        let data = store.encode(self.format)?;
        backend.replace(&data)?;
        debug!(bytes = data.len(), "snapshot written");
        Ok(data.len())
    }

    /// Flushes the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot flush.
    pub fn flush(&self) -> CoreResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Snapshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshotter")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
