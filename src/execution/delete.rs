use std::sync::Arc;

use crate::common::{Result, TransactionId};
use crate::database::Database;
use crate::execution::insert::{count_schema, count_tuple};
use crate::execution::{Cursor, Operator};
use crate::tuple::{Schema, Tuple};

/// Deletes every tuple its child produces, located by record ID.
///
/// Like [`Insert`](crate::execution::Insert) it yields one count row and
/// then nothing until rewound.
pub struct Delete {
    db: Arc<Database>,
    txn: TransactionId,
    child: Box<dyn Operator>,
    schema: Arc<Schema>,
    done: bool,
    cursor: Cursor,
}

impl Delete {
    pub fn new(db: Arc<Database>, txn: TransactionId, child: Box<dyn Operator>) -> Self {
        Self {
            db,
            txn,
            child,
            schema: count_schema(),
            done: false,
            cursor: Cursor::default(),
        }
    }
}

impl Operator for Delete {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.done = false;
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
        self.child.close();
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let pool = self.db.buffer_pool();
        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            pool.delete_tuple(self.txn, &tuple)?;
            count += 1;
        }

        log::debug!("{} deleted {} tuples", self.txn, count);
        count_tuple(&self.schema, count).map(Some)
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
