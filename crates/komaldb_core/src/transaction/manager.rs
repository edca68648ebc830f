//! Transaction stack.

use crate::error::{CoreError, CoreResult};
use crate::transaction::frame::{Frame, UndoRecord};
use crate::transaction::NestedCommit;
use crate::types::TransactionId;
use komaldb_codec::Value;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Engine-wide stack of undo frames.
///
/// The stack is shared by every thread using the database: a `begin` on one
/// thread followed by a `transactional_set` on another records into the same
/// frame. Stack depth always equals the number of `begin` calls not yet
/// matched by `commit` or `rollback`.
#[derive(Debug)]
pub struct TransactionManager {
    mode: NestedCommit,
    next_txid: AtomicU64,
    stack: Mutex<Vec<Frame>>,
}

impl TransactionManager {
    /// Creates an empty transaction stack.
    #[must_use]
    pub fn new(mode: NestedCommit) -> Self {
        Self {
            mode,
            next_txid: AtomicU64::new(1),
            stack: Mutex::new(Vec::new()),
        }
    }

    /// Pushes a new empty frame.
    pub fn begin(&self) -> TransactionId {
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let mut stack = self.stack.lock();
        stack.push(Frame::new(id));
        debug!(%id, depth = stack.len(), "transaction started");
        id
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    /// Returns true if at least one transaction is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.stack.lock().is_empty()
    }

    /// Returns the ID of the topmost frame.
    #[must_use]
    pub fn current(&self) -> Option<TransactionId> {
        self.stack.lock().last().map(Frame::id)
    }

    /// Appends an undo record to the topmost frame.
    ///
    /// Returns the frame's ID, or `None` (recording nothing) when no
    /// transaction is open.
    pub fn record(&self, key: &str, prior: Option<Value>) -> Option<TransactionId> {
        let mut stack = self.stack.lock();
        let frame = stack.last_mut()?;
        frame.push(UndoRecord::new(key, prior));
        Some(frame.id())
    }

    /// Pops the topmost frame and ends it successfully.
    ///
    /// Under [`NestedCommit::MergeIntoParent`] the frame's records move to the
    /// new topmost frame; otherwise they are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoActiveTransaction`] if the stack is empty.
    pub fn commit(&self) -> CoreResult<TransactionId> {
        let mut stack = self.stack.lock();
        let frame = stack.pop().ok_or(CoreError::NoActiveTransaction)?;
        let id = frame.id();

        match (self.mode, stack.last_mut()) {
            (NestedCommit::MergeIntoParent, Some(parent)) => {
                debug!(%id, parent = %parent.id(), records = frame.len(), "merged into parent");
                parent.absorb(frame);
            }
            _ => debug!(%id, records = frame.len(), "frame discarded"),
        }
        Ok(id)
    }

    /// Pops the topmost frame for replay.
    ///
    /// The caller applies [`Frame::into_undo_order`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoActiveTransaction`] if the stack is empty.
    pub fn rollback(&self) -> CoreResult<Frame> {
        self.stack.lock().pop().ok_or(CoreError::NoActiveTransaction)
    }
}
