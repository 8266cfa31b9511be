use std::sync::Arc;
use std::vec;

use crate::common::{PageId, Result, TableId, TransactionId};
use crate::concurrency::LockMode;
use crate::database::Database;
use crate::execution::{Cursor, Operator};
use crate::storage::disk::PageStore;
use crate::tuple::{Schema, Tuple};

/// Scans every tuple of a table in page order, reading each page under a
/// shared lock. Output columns are named `alias.field`.
pub struct SeqScan {
    db: Arc<Database>,
    txn: TransactionId,
    table_id: TableId,
    table_name: String,
    alias: String,
    schema: Arc<Schema>,

    // runtime
    store: Option<Arc<dyn PageStore>>,
    next_page: u32,
    page_tuples: vec::IntoIter<Tuple>,
    cursor: Cursor,
}

impl SeqScan {
    /// Scans `table_id` using the table's own name as alias.
    pub fn new(db: Arc<Database>, txn: TransactionId, table_id: TableId) -> Result<Self> {
        let name = db.catalog().table_name(table_id)?;
        Self::with_alias(db, txn, table_id, &name)
    }

    pub fn with_alias(
        db: Arc<Database>,
        txn: TransactionId,
        table_id: TableId,
        alias: &str,
    ) -> Result<Self> {
        let table_name = db.catalog().table_name(table_id)?;
        let schema = Arc::new(db.catalog().schema(table_id)?.with_alias(alias));
        Ok(Self {
            db,
            txn,
            table_id,
            table_name,
            alias: alias.to_string(),
            schema,
            store: None,
            next_page: 0,
            page_tuples: Vec::new().into_iter(),
            cursor: Cursor::default(),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl Operator for SeqScan {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn open(&mut self) -> Result<()> {
        self.store = Some(self.db.catalog().database_file(self.table_id)?);
        self.next_page = 0;
        self.page_tuples = Vec::new().into_iter();
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
        self.store = None;
        self.page_tuples = Vec::new().into_iter();
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if let Some(tuple) = self.page_tuples.next() {
                return Ok(Some(tuple.with_schema(Arc::clone(&self.schema))));
            }

            let num_pages = match &self.store {
                Some(store) => store.num_pages(),
                None => return Ok(None),
            };
            if self.next_page >= num_pages {
                return Ok(None);
            }

            let page_id = PageId::new(self.table_id, self.next_page);
            let page = self
                .db
                .buffer_pool()
                .get_page(self.txn, page_id, LockMode::Shared)?;
            let tuples: Vec<Tuple> = page.read().tuples().cloned().collect();
            self.page_tuples = tuples.into_iter();
            self.next_page += 1;
        }
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
