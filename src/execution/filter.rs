use std::sync::Arc;

use crate::common::{Result, StrataError};
use crate::execution::{Cursor, Operator, Predicate};
use crate::tuple::{Schema, Tuple};

/// Passes through the child tuples that satisfy a predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn Operator>,
    cursor: Cursor,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn Operator>) -> Result<Self> {
        if predicate.field() >= child.schema().column_count() {
            return Err(StrataError::InvalidColumn(predicate.field()));
        }
        Ok(Self {
            predicate,
            child,
            cursor: Cursor::default(),
        })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Operator for Filter {
    fn schema(&self) -> &Arc<Schema> {
        self.child.schema()
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
        self.child.close();
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.cursor.open();
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
