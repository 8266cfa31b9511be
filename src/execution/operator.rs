use std::sync::Arc;

use crate::common::{Result, StrataError};
use crate::tuple::{Schema, Tuple};

/// Iteration state every operator carries: whether it is open and the
/// tuple fetched by `has_next` but not yet returned by `next`.
#[derive(Debug, Default)]
pub struct Cursor {
    open: bool,
    pending: Option<Tuple>,
}

impl Cursor {
    pub fn open(&mut self) {
        self.open = true;
        self.pending = None;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.pending = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// A pull-based relational operator.
///
/// An operator starts closed. `open` opens its children first and then
/// does its own setup; `has_next`/`next` pull tuples one at a time; `close`
/// releases iteration state and closes the children. Any call may block
/// in the buffer pool waiting for a page lock, and a lock timeout surfaces
/// as [`StrataError::TransactionAborted`] from whichever call hit it.
///
/// Implementors provide `fetch_next`; the provided `has_next` and `next`
/// buffer one tuple of look-ahead on top of it.
pub trait Operator: Send {
    /// Describes the tuples this operator produces.
    fn schema(&self) -> &Arc<Schema>;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self);

    /// Restarts iteration from the first tuple.
    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    /// Produces the next tuple, or `None` once exhausted. Only called
    /// while the operator is open.
    fn fetch_next(&mut self) -> Result<Option<Tuple>>;

    fn cursor(&mut self) -> &mut Cursor;

    fn has_next(&mut self) -> Result<bool> {
        if !self.cursor().is_open() {
            return Err(StrataError::OperatorNotOpen);
        }
        if self.cursor().pending.is_none() {
            let next = self.fetch_next()?;
            self.cursor().pending = next;
        }
        Ok(self.cursor().pending.is_some())
    }

    /// Returns the next tuple, failing with [`StrataError::NoSuchElement`]
    /// once the operator is exhausted.
    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(StrataError::NoSuchElement);
        }
        self.cursor().pending.take().ok_or(StrataError::NoSuchElement)
    }
}

/// Opens `op`, pulls every tuple out of it, and closes it again.
pub fn collect(op: &mut dyn Operator) -> Result<Vec<Tuple>> {
    op.open()?;
    let mut tuples = Vec::new();
    while op.has_next()? {
        tuples.push(op.next()?);
    }
    op.close();
    Ok(tuples)
}
