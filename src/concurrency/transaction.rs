use crate::buffer::BufferPool;
use crate::common::{Result, TransactionId};

/// Lifecycle of a transaction handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// Handle for one unit of work. Finishing it hands control to
/// [`BufferPool::transaction_complete`], which flushes or discards the
/// pages the transaction dirtied and releases its locks.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
}

impl Transaction {
    /// Starts a new transaction with a fresh ID.
    pub fn begin() -> Self {
        let id = TransactionId::new();
        log::debug!("begin {}", id);
        Self {
            id,
            state: TransactionState::Active,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Flushes every page this transaction dirtied and releases its locks.
    pub fn commit(mut self, pool: &BufferPool) -> Result<()> {
        // Marked first so a failed flush doesn't trigger the drop warning
        self.state = TransactionState::Committed;
        pool.transaction_complete(self.id, true)
    }

    /// Discards every page this transaction dirtied and releases its locks.
    pub fn abort(mut self, pool: &BufferPool) -> Result<()> {
        self.state = TransactionState::Aborted;
        pool.transaction_complete(self.id, false)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            log::warn!("{} dropped without commit or abort", self.id);
        }
    }
}
