use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, Result, StrataError, TableId, TransactionId, PAGE_SIZE};
use crate::concurrency::LockMode;
use crate::storage::page::HeapPage;
use crate::tuple::{Schema, Tuple};

use super::PageStore;

/// HeapFile stores one table as an unordered collection of tuples in a
/// flat file of fixed-size pages. Page N lives at byte offset
/// `N * PAGE_SIZE`.
pub struct HeapFile {
    /// The table this file backs
    table_id: TableId,
    /// Schema of every tuple in the file
    schema: Arc<Schema>,
    /// The backing file
    file: Mutex<File>,
    /// Path to the backing file
    path: PathBuf,
    /// Number of pages in the file; only grows, under the file mutex
    num_pages: AtomicU32,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl HeapFile {
    /// Opens (creating if needed) the heap file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, table_id: TableId, schema: Arc<Schema>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(StrataError::Corrupted(format!(
                "{} is {} bytes, not a whole number of pages",
                path.as_ref().display(),
                file_size
            )));
        }
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        log::debug!(
            "opened heap file {} for {} with {} pages",
            path.as_ref().display(),
            table_id,
            num_pages
        );

        Ok(Self {
            table_id,
            schema,
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            num_pages: AtomicU32::new(num_pages),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Appends a zero-filled page to the file and returns its ID.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut file = self.file.lock();
        let page_id = PageId::new(self.table_id, self.num_pages.load(Ordering::Acquire));

        file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        file.write_all(&HeapPage::empty_page_data())?;
        file.flush()?;

        self.num_pages.store(page_id.page_no + 1, Ordering::Release);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        log::debug!("allocated {}", page_id);
        Ok(page_id)
    }

    /// Returns the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of page reads performed.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    fn check_owner(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id != self.table_id {
            return Err(StrataError::PageNotFound(page_id));
        }
        Ok(())
    }
}

impl PageStore for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_owner(page_id)?;

        let mut data = HeapPage::empty_page_data();
        {
            let mut file = self.file.lock();
            if page_id.page_no >= self.num_pages.load(Ordering::Acquire) {
                return Err(StrataError::PageNotFound(page_id));
            }
            file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
            file.read_exact(&mut data)?;
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        HeapPage::from_bytes(page_id, self.schema.clone(), &data)
    }

    fn write_page(&self, page: &HeapPage) -> Result<()> {
        let page_id = page.page_id();
        self.check_owner(page_id)?;
        let data = page.to_bytes()?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        file.write_all(&data)?;
        file.flush()?;
        self.num_pages.fetch_max(page_id.page_no + 1, Ordering::AcqRel);

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::Acquire)
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        // Probe existing pages for a free slot under a shared lock first so
        // that scanning full pages doesn't hold exclusive locks on them.
        for page_no in 0..self.num_pages() {
            let page_id = PageId::new(self.table_id, page_no);
            let held_before = pool.holds_lock(txn, page_id);

            let page = pool.get_page(txn, page_id, LockMode::Shared)?;
            let has_room = page.read().free_slots() > 0;
            if !has_room {
                if !held_before {
                    pool.release_page(txn, page_id);
                }
                continue;
            }

            let page = pool.get_page(txn, page_id, LockMode::Exclusive)?;
            page.write().insert_tuple(tuple)?;
            return Ok(vec![page]);
        }

        // Every page is full: grow the file. Another transaction may claim
        // the fresh page first, in which case we allocate again.
        loop {
            let page_id = self.allocate_page()?;
            let page = pool.get_page(txn, page_id, LockMode::Exclusive)?;
            let inserted = page.write().insert_tuple(tuple);
            match inserted {
                Ok(_) => return Ok(vec![page]),
                Err(StrataError::PageFull(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let record_id = tuple.record_id().ok_or(StrataError::MissingRecordId)?;
        self.check_owner(record_id.page_id)?;

        let page = pool.get_page(txn, record_id.page_id, LockMode::Exclusive)?;
        page.write().delete_tuple(tuple)?;
        Ok(vec![page])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, Value};
    use tempfile::NamedTempFile;

    fn create_test_schema() -> Arc<Schema> {
        Schema::builder()
            .column("id", DataType::Integer)
            .column("label", DataType::Text(8))
            .build_arc()
    }

    fn open_file(temp: &NamedTempFile) -> HeapFile {
        HeapFile::open(temp.path(), TableId::new(1), create_test_schema()).unwrap()
    }

    #[test]
    fn test_heap_file_new() {
        let temp = NamedTempFile::new().unwrap();
        let hf = open_file(&temp);
        assert_eq!(hf.num_pages(), 0);
        assert_eq!(hf.table_id(), TableId::new(1));
    }

    #[test]
    fn test_allocate_page() {
        let temp = NamedTempFile::new().unwrap();
        let hf = open_file(&temp);

        let first = hf.allocate_page().unwrap();
        let second = hf.allocate_page().unwrap();

        assert_eq!(first.page_no, 0);
        assert_eq!(second.page_no, 1);
        assert_eq!(hf.num_pages(), 2);
        assert_eq!(
            std::fs::metadata(temp.path()).unwrap().len(),
            2 * PAGE_SIZE as u64
        );
    }

    #[test]
    fn test_read_write_page() {
        let temp = NamedTempFile::new().unwrap();
        let hf = open_file(&temp);
        let page_id = hf.allocate_page().unwrap();

        let mut page = hf.read_page(page_id).unwrap();
        let mut tuple = Tuple::new(
            hf.schema().clone(),
            vec![Value::Integer(7), Value::from("seven")],
        )
        .unwrap();
        page.insert_tuple(&mut tuple).unwrap();
        hf.write_page(&page).unwrap();

        let reread = hf.read_page(page_id).unwrap();
        let tuples: Vec<_> = reread.tuples().cloned().collect();
        assert_eq!(tuples, vec![tuple]);
        assert_eq!(hf.num_writes(), 2);
        assert_eq!(hf.num_reads(), 2);
    }

    #[test]
    fn test_read_past_end() {
        let temp = NamedTempFile::new().unwrap();
        let hf = open_file(&temp);

        let result = hf.read_page(PageId::new(TableId::new(1), 0));
        assert!(matches!(result, Err(StrataError::PageNotFound(_))));
    }

    #[test]
    fn test_foreign_page_rejected() {
        let temp = NamedTempFile::new().unwrap();
        let hf = open_file(&temp);
        hf.allocate_page().unwrap();

        let result = hf.read_page(PageId::new(TableId::new(2), 0));
        assert!(matches!(result, Err(StrataError::PageNotFound(_))));
    }

    #[test]
    fn test_persistence() {
        let temp = NamedTempFile::new().unwrap();
        {
            let hf = open_file(&temp);
            hf.allocate_page().unwrap();
            hf.allocate_page().unwrap();
            hf.sync().unwrap();
            assert_eq!(hf.path(), temp.path());
        }

        let hf = open_file(&temp);
        assert_eq!(hf.num_pages(), 2);
    }

    #[test]
    fn test_partial_page_file_is_corrupt() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), [0u8; 100]).unwrap();

        let result = HeapFile::open(temp.path(), TableId::new(1), create_test_schema());
        assert!(matches!(result, Err(StrataError::Corrupted(_))));
    }
}
