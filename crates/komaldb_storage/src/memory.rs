//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory storage backend.
///
/// Clones share the same buffer, so a test can hand one clone to a database
/// and keep another to inspect what was written.
///
/// # Example
///
/// ```rust
/// use komaldb_storage::{StorageBackend, InMemoryBackend};
///
/// let observer = InMemoryBackend::new();
/// let mut backend = observer.clone();
/// backend.replace(b"{}").unwrap();
/// assert_eq!(observer.data(), b"{}");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing data.
    ///
    /// Useful for testing snapshot loading.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of all data in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        Ok(self.data())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn replace(&mut self, new_data: &[u8]) -> StorageResult<()> {
        *self.data.write() = new_data.to_vec();
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }
}
