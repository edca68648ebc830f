//! Transaction frames.

use crate::types::TransactionId;
use komaldb_codec::Value;

/// The state of one key before a transactional write.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoRecord {
    /// Key that was written.
    pub key: String,
    /// Value before the write; `None` if the key did not exist.
    pub prior: Option<Value>,
}

impl UndoRecord {
    /// Creates a new undo record.
    pub fn new(key: impl Into<String>, prior: Option<Value>) -> Self {
        Self {
            key: key.into(),
            prior,
        }
    }
}

/// One transaction's undo log, in the order the writes happened.
#[derive(Debug, Clone)]
pub struct Frame {
    id: TransactionId,
    records: Vec<UndoRecord>,
}

impl Frame {
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            records: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the number of undo records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was written in this frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[UndoRecord] {
        &self.records
    }

    pub(crate) fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    pub(crate) fn absorb(&mut self, child: Frame) {
        self.records.extend(child.records);
    }

    /// Consumes the frame, yielding records newest first.
    ///
    /// Replaying in this order restores each key to the value it had before
    /// its *first* write in the frame.
    pub fn into_undo_order(self) -> impl Iterator<Item = UndoRecord> {
        self.records.into_iter().rev()
    }
}
