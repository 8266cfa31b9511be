use std::sync::Arc;

use crate::common::{Result, StrataError, TableId, TransactionId};
use crate::database::Database;
use crate::execution::{Cursor, Operator};
use crate::tuple::{DataType, Schema, Tuple, Value};

/// Schema of the single count row Insert and Delete produce.
pub(crate) fn count_schema() -> Arc<Schema> {
    Schema::builder().column("count", DataType::Integer).build_arc()
}

pub(crate) fn count_tuple(schema: &Arc<Schema>, count: usize) -> Result<Tuple> {
    let count = i32::try_from(count).map_err(|_| StrataError::AggregateOverflow)?;
    Tuple::new(Arc::clone(schema), vec![Value::Integer(count)])
}

/// Inserts every tuple of its child into a table through the buffer pool.
///
/// The first fetch drains the child and returns one row holding the number
/// of tuples inserted; later fetches return nothing until rewound.
pub struct Insert {
    db: Arc<Database>,
    txn: TransactionId,
    table_id: TableId,
    table_schema: Arc<Schema>,
    child: Box<dyn Operator>,
    schema: Arc<Schema>,
    done: bool,
    cursor: Cursor,
}

impl Insert {
    pub fn new(
        db: Arc<Database>,
        txn: TransactionId,
        child: Box<dyn Operator>,
        table_id: TableId,
    ) -> Result<Self> {
        let table_schema = db.catalog().schema(table_id)?;
        if !child.schema().same_types(&table_schema) {
            return Err(StrataError::SchemaMismatch(format!(
                "child tuples do not match table {}",
                table_id
            )));
        }

        Ok(Self {
            db,
            txn,
            table_id,
            table_schema,
            child,
            schema: count_schema(),
            done: false,
            cursor: Cursor::default(),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }
}

impl Operator for Insert {
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
            let mut tuple = self
                .child
                .next()?
                .with_schema(Arc::clone(&self.table_schema));
            pool.insert_tuple(self.txn, self.table_id, &mut tuple)?;
            count += 1;
        }

        log::debug!("{} inserted {} tuples into {}", self.txn, count, self.table_id);
        count_tuple(&self.schema, count).map(Some)
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BufferPoolConfig;
    use crate::execution::{collect, SeqScan, TupleIterator};
    use tempfile::TempDir;

    fn setup() -> (Arc<Database>, TableId, Arc<Schema>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::new(BufferPoolConfig::new(8)));
        let schema = Schema::builder()
            .column("id", DataType::Integer)
            .column("name", DataType::Text(8))
            .build_arc();
        let table_id = db
            .create_table("people", dir.path().join("people.dat"), schema.clone())
            .unwrap();
        (db, table_id, schema, dir)
    }

    fn rows(schema: &Arc<Schema>, n: i32) -> Box<dyn Operator> {
        let tuples = (0..n)
            .map(|i| Tuple::new(schema.clone(), vec![Value::Integer(i), Value::from("p")]).unwrap())
            .collect();
        Box::new(TupleIterator::new(schema.clone(), tuples))
    }

    #[test]
    fn test_insert_reports_count_once() {
        let (db, table_id, schema, _dir) = setup();
        let txn = TransactionId::new();
        let mut insert = Insert::new(db.clone(), txn, rows(&schema, 4), table_id).unwrap();

        insert.open().unwrap();
        assert_eq!(insert.next().unwrap().values(), &[Value::Integer(4)]);
        assert!(!insert.has_next().unwrap());
        assert!(matches!(insert.next(), Err(StrataError::NoSuchElement)));
        insert.close();

        let mut scan = SeqScan::new(db, txn, table_id).unwrap();
        assert_eq!(collect(&mut scan).unwrap().len(), 4);
    }

    #[test]
    fn test_insert_nothing_reports_zero() {
        let (db, table_id, schema, _dir) = setup();
        let mut insert = Insert::new(db, TransactionId::new(), rows(&schema, 0), table_id).unwrap();

        let out = collect(&mut insert).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].values(), &[Value::Integer(0)]);
    }

    #[test]
    fn test_insert_rejects_wrong_schema() {
        let (db, table_id, _schema, _dir) = setup();
        let other = Schema::builder().column("x", DataType::Integer).build_arc();
        let child = Box::new(TupleIterator::new(other, Vec::new()));

        assert!(matches!(
            Insert::new(db, TransactionId::new(), child, table_id),
            Err(StrataError::SchemaMismatch(_))
        ));
    }
}
