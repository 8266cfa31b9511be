use thiserror::Error;

use super::types::{PageId, TableId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transaction {0} aborted: lock wait budget exhausted")]
    TransactionAborted(TransactionId),

    #[error("Buffer pool is full, every cached page is dirty")]
    BufferPoolFull,

    #[error("Page {0} not found")]
    PageNotFound(PageId),

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u16),

    #[error("Slot {0} is empty")]
    EmptySlot(u16),

    #[error("Page {0} has no free slot")]
    PageFull(PageId),

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Tuple has no record ID")]
    MissingRecordId,

    #[error("Column index {0} out of range")]
    InvalidColumn(usize),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Aggregate {0} is not supported on this column type")]
    UnsupportedAggregate(String),

    #[error("Aggregate result overflows an INTEGER")]
    AggregateOverflow,

    #[error("Operator is not open")]
    OperatorNotOpen,

    #[error("No more tuples")]
    NoSuchElement,

    #[error("Corrupted data: {0}")]
    Corrupted(String),
}

impl StrataError {
    /// Returns true for failures the transaction layer should answer by
    /// aborting (and optionally retrying) the transaction.
    pub fn is_transaction_abort(&self) -> bool {
        matches!(self, StrataError::TransactionAborted(_))
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
