use std::sync::Arc;

use crate::common::Result;
use crate::execution::{Cursor, Operator};
use crate::tuple::{Schema, Tuple};

/// Operator over an in-memory list of tuples.
pub struct TupleIterator {
    schema: Arc<Schema>,
    tuples: Vec<Tuple>,
    position: usize,
    cursor: Cursor,
}

impl TupleIterator {
    pub fn new(schema: Arc<Schema>, tuples: Vec<Tuple>) -> Self {
        Self {
            schema,
            tuples,
            position: 0,
            cursor: Cursor::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

impl Operator for TupleIterator {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn open(&mut self) -> Result<()> {
        self.position = 0;
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        let next = self.tuples.get(self.position).cloned();
        if next.is_some() {
            self.position += 1;
        }
        Ok(next)
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
