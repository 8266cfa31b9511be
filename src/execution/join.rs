use std::sync::Arc;

use crate::common::{Result, StrataError};
use crate::execution::{Cursor, JoinPredicate, Operator};
use crate::tuple::{Schema, Tuple};

/// Nested-loop join.
///
/// For each left tuple the right child is scanned to completion and every
/// match is emitted as the left fields followed by the right fields. The
/// right child is rewound before moving to the next left tuple.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    schema: Arc<Schema>,
    current_left: Option<Tuple>,
    cursor: Cursor,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn Operator>,
        right: Box<dyn Operator>,
    ) -> Result<Self> {
        if predicate.left_field() >= left.schema().column_count() {
            return Err(StrataError::InvalidColumn(predicate.left_field()));
        }
        if predicate.right_field() >= right.schema().column_count() {
            return Err(StrataError::InvalidColumn(predicate.right_field()));
        }

        let schema = Arc::new(Schema::merge(left.schema(), right.schema()));
        Ok(Self {
            predicate,
            left,
            right,
            schema,
            current_left: None,
            cursor: Cursor::default(),
        })
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    /// Names of the compared columns, left then right.
    pub fn join_field_names(&self) -> (&str, &str) {
        (
            column_name(self.left.schema(), self.predicate.left_field()),
            column_name(self.right.schema(), self.predicate.right_field()),
        )
    }
}

fn column_name(schema: &Schema, index: usize) -> &str {
    schema.column(index).map_or("", |c| c.name())
}

impl Operator for Join {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = None;
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
        self.current_left = None;
        self.right.close();
        self.left.close();
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.current_left = Some(self.left.next()?);
            }

            if let Some(left) = &self.current_left {
                while self.right.has_next()? {
                    let right = self.right.next()?;
                    if self.predicate.filter(left, &right) {
                        let joined = Tuple::concat(left, &right, Arc::clone(&self.schema));
                        return Ok(Some(joined));
                    }
                }
            }

            self.right.rewind()?;
            self.current_left = None;
        }
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
