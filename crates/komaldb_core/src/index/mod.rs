//! Secondary indexes.
//!
//! An index is named by the object field it covers and maps each scalar
//! value of that field to the single key that currently owns it. The last
//! write of a given field value wins; there are no multi-valued entries.
//!
//! Indexes are created explicitly with a full scan of the store and from then
//! on kept up to date by every `set` and `delete`.

mod field;
mod key;
mod manager;

pub use field::FieldIndex;
pub use key::IndexKey;
pub use manager::IndexManager;

/// What happens to the entry a key contributed when its field value changes.
///
/// With `KeepStale`, overwriting `{"email": "a"}` with `{"email": "b"}` leaves
/// `a` pointing at the key until another key claims `a` or the key is
/// deleted. With `RetractStale`, the engine remembers the value each key
/// contributed and drops the old entry (if the key still owns it) before
/// recording the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    /// Remove a key's previous entry when its field value changes or disappears.
    #[default]
    RetractStale,
    /// Leave previous entries in place until the key is deleted.
    KeepStale,
}
