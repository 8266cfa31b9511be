use std::sync::Arc;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::storage::page::HeapPage;
use crate::tuple::{Schema, Tuple};

/// Storage capability behind one table.
///
/// `read_page`/`write_page` move whole pages between the backing store and
/// memory and are only called by the buffer pool. `insert_tuple` and
/// `delete_tuple` locate the affected pages through the buffer pool
/// (taking exclusive locks) and return every page they modified so the
/// pool can mark them dirty.
pub trait PageStore: Send + Sync {
    /// The table this store backs.
    fn table_id(&self) -> TableId;

    /// Schema of the stored tuples.
    fn schema(&self) -> &Arc<Schema>;

    /// Reads and decodes one page.
    fn read_page(&self, page_id: PageId) -> Result<HeapPage>;

    /// Encodes and writes one page at its offset.
    fn write_page(&self, page: &HeapPage) -> Result<()>;

    /// Number of pages currently in the store.
    fn num_pages(&self) -> u32;

    /// Adds `tuple` to the table, stamping its record ID.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>>;

    /// Removes the tuple at `tuple.record_id()`.
    fn delete_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>>;
}
