//! Undo-log transactions.
//!
//! Transactions here provide undo-on-failure, not isolation. `begin` pushes a
//! frame onto an engine-wide stack; each `transactional_set` records the key's
//! prior value in the topmost frame before writing; `rollback` pops the frame
//! and restores the recorded values newest-first; `commit` pops the frame and
//! either discards it or hands its records to the parent frame, depending on
//! [`NestedCommit`].
//!
//! Writes made through the plain `set`/`delete` path are never recorded, and
//! other threads' writes are visible immediately.

mod frame;
mod manager;

pub use frame::{Frame, UndoRecord};
pub use manager::TransactionManager;

/// What `commit` does with a frame that has a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedCommit {
    /// Discard the committed frame. A later rollback of the parent does not
    /// undo the inner transaction's writes.
    #[default]
    Independent,
    /// Append the committed frame's records to the parent, so rolling back the
    /// parent also undoes the inner transaction.
    MergeIntoParent,
}
