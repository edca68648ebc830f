//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level byte store.
///
/// Backends are **opaque**: they never interpret the bytes they hold. KomalDB
/// uses two access patterns on top of them:
///
/// - the snapshot is written with [`replace`](StorageBackend::replace) and
///   read back with [`read_all`](StorageBackend::read_all);
/// - the audit log only ever [`append`](StorageBackend::append)s.
///
/// # Invariants
///
/// - `append` returns the offset where data was written and never discards
///   existing content
/// - `replace` is all-or-nothing: after a crash the store holds either the
///   previous content or the new content, never a mix
/// - Backends must be `Send + Sync`; callers serialize mutation through
///   `&mut self`
pub trait StorageBackend: Send + Sync {
    /// Reads the whole content.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Atomically replaces the whole content with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs. On error the previous content
    /// is left in place.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Pushes buffered writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Returns true if the storage holds no bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.size()? == 0)
    }
}
