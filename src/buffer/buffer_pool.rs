use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::Rng;

use crate::catalog::Catalog;
use crate::common::{BufferPoolConfig, PageId, Result, StrataError, TableId, TransactionId};
use crate::concurrency::{LockManager, LockMode};
use crate::storage::page::HeapPage;
use crate::tuple::Tuple;

/// Shared handle to a cached page. The page's content lock serialises
/// in-memory access; the transactional lock on its [`PageId`] decides who
/// may take that content lock at all.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// BufferPool caches up to `capacity` pages in memory and is the only
/// path through which pages are read or modified.
///
/// Every `get_page` first obtains a page lock from the [`LockManager`]
/// (strict two-phase locking), so callers block there under contention.
/// Eviction is NO-STEAL: only clean pages are ever dropped, so an
/// uncommitted write never leaves memory except through
/// `transaction_complete`.
pub struct BufferPool {
    config: BufferPoolConfig,
    catalog: Arc<Catalog>,
    /// Page table: at most `config.capacity` entries
    pages: Mutex<HashMap<PageId, PageRef>>,
    lock_manager: LockManager,
}

impl BufferPool {
    /// Creates a buffer pool over the tables registered in `catalog`.
    pub fn new(config: BufferPoolConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            config,
            catalog,
            pages: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(),
        }
    }

    /// Returns the maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Returns the number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns true if `page_id` is resident in the cache.
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Retrieves a page on behalf of `txn` with the requested lock mode.
    ///
    /// Blocks until the lock is granted. If it is not granted within a
    /// randomly drawn budget the call fails with
    /// [`StrataError::TransactionAborted`]. A miss reads the page from
    /// its table's store, evicting a clean page first when the cache is full.
    pub fn get_page(&self, txn: TransactionId, page_id: PageId, mode: LockMode) -> Result<PageRef> {
        self.acquire_lock(txn, page_id, mode)?;

        if let Some(page) = self.pages.lock().get(&page_id) {
            return Ok(Arc::clone(page));
        }

        let store = self.catalog.database_file(page_id.table_id)?;
        let page = store.read_page(page_id)?;

        // Another reader may have loaded the same page while we were doing I/O
        let mut pages = self.pages.lock();
        if let Some(existing) = pages.get(&page_id) {
            return Ok(Arc::clone(existing));
        }
        if pages.len() >= self.config.capacity {
            self.evict_page(&mut pages)?;
        }

        let page = Arc::new(RwLock::new(page));
        pages.insert(page_id, Arc::clone(&page));
        Ok(page)
    }

    /// Releases the lock `txn` holds on `page_id` before the transaction
    /// ends. This breaks two-phase locking and is only safe for pages the
    /// transaction inspected without using their contents.
    pub fn release_page(&self, txn: TransactionId, page_id: PageId) {
        self.lock_manager.release(txn, page_id);
    }

    /// Returns true if `txn` holds a lock on `page_id`.
    pub fn holds_lock(&self, txn: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds(txn, page_id)
    }

    /// Adds `tuple` to `table_id` on behalf of `txn`, stamping its record ID.
    /// Every page the insert modified is marked dirty by `txn` and cached.
    pub fn insert_tuple(&self, txn: TransactionId, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        let store = self.catalog.database_file(table_id)?;
        let dirtied = store.insert_tuple(self, txn, tuple)?;
        self.cache_dirty_pages(txn, dirtied)
    }

    /// Removes `tuple` from the table its record ID points into.
    pub fn delete_tuple(&self, txn: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(StrataError::MissingRecordId)?;
        let store = self.catalog.database_file(record_id.page_id.table_id)?;
        let dirtied = store.delete_tuple(self, txn, tuple)?;
        self.cache_dirty_pages(txn, dirtied)
    }

    /// Commits or aborts `txn`.
    ///
    /// On commit every page dirtied by `txn` is written to its store and
    /// dropped from the cache. On abort those pages are dropped without
    /// being written, so the next read sees the pre-transaction contents.
    /// Either way all of `txn`'s locks are released afterwards.
    pub fn transaction_complete(&self, txn: TransactionId, commit: bool) -> Result<()> {
        // Pages stay locked by txn until the end, so nobody can reload
        // them between removal and flush.
        let dirtied: Vec<PageRef> = {
            let mut pages = self.pages.lock();
            let ids: Vec<PageId> = pages
                .iter()
                .filter(|(_, page)| page.read().dirtied_by() == Some(txn))
                .map(|(&page_id, _)| page_id)
                .collect();
            ids.iter().filter_map(|page_id| pages.remove(page_id)).collect()
        };

        let mut result = Ok(());
        if commit {
            for page in &dirtied {
                let mut page = page.write();
                if let Err(e) = self.write_back(&page) {
                    log::warn!("{} failed to flush {}: {}", txn, page.page_id(), e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                    continue;
                }
                page.mark_dirty(None);
            }
        }

        log::debug!(
            "{} {} ({} dirty pages)",
            txn,
            if commit { "committed" } else { "aborted" },
            dirtied.len()
        );

        self.lock_manager.release_all(txn);
        result
    }

    /// Drops `page_id` from the cache without writing it.
    pub fn discard_page(&self, page_id: PageId) {
        if self.pages.lock().remove(&page_id).is_some() {
            log::trace!("discarded {}", page_id);
        }
    }

    /// Writes `page_id` to its store if it is cached and dirty, leaving it
    /// cached and clean. Returns whether a write happened.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let page = match self.pages.lock().get(&page_id) {
            Some(page) => Arc::clone(page),
            None => return Ok(false),
        };
        self.flush(&page)
    }

    /// Flushes every page dirtied by `txn` without ending it.
    pub fn flush_pages(&self, txn: TransactionId) -> Result<()> {
        for page in self.snapshot() {
            if page.read().dirtied_by() == Some(txn) {
                self.flush(&page)?;
            }
        }
        Ok(())
    }

    /// Flushes every dirty page.
    ///
    /// This writes uncommitted data to disk and therefore defeats NO-STEAL;
    /// it exists for administrative use and tests only.
    pub fn flush_all_pages(&self) -> Result<()> {
        for page in self.snapshot() {
            self.flush(&page)?;
        }
        Ok(())
    }

    fn acquire_lock(&self, txn: TransactionId, page_id: PageId, mode: LockMode) -> Result<()> {
        if self.lock_manager.acquire(txn, page_id, mode) {
            return Ok(());
        }

        let budget = self.lock_budget();
        if self
            .lock_manager
            .acquire_within(txn, page_id, mode, budget)
        {
            Ok(())
        } else {
            Err(StrataError::TransactionAborted(txn))
        }
    }

    /// Draws the lock-wait budget for one request from the configured range.
    fn lock_budget(&self) -> Duration {
        let min = self.config.lock_timeout_min.as_millis() as u64;
        let max = self.config.lock_timeout_max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Evicts one clean page. Fails with `BufferPoolFull` if every cached
    /// page holds uncommitted changes.
    fn evict_page(&self, pages: &mut HashMap<PageId, PageRef>) -> Result<()> {
        // A page whose content lock is taken is being modified right now
        let victim = pages
            .iter()
            .find(|(_, page)| page.try_read().is_some_and(|p| !p.is_dirty()))
            .map(|(&page_id, _)| page_id);

        match victim {
            Some(page_id) => {
                pages.remove(&page_id);
                log::trace!("evicted {}", page_id);
                Ok(())
            }
            None => {
                log::debug!("no clean page to evict among {}", pages.len());
                Err(StrataError::BufferPoolFull)
            }
        }
    }

    /// Marks pages returned by a store mutation dirty and (re)inserts them,
    /// replacing any other cached instance of the same page.
    fn cache_dirty_pages(&self, txn: TransactionId, dirtied: Vec<PageRef>) -> Result<()> {
        for page in dirtied {
            let page_id = {
                let mut guard = page.write();
                guard.mark_dirty(Some(txn));
                guard.page_id()
            };

            let mut pages = self.pages.lock();
            let same_instance = pages.get(&page_id).map(|cached| Arc::ptr_eq(cached, &page));
            match same_instance {
                Some(true) => {}
                Some(false) => {
                    pages.insert(page_id, page);
                }
                None => {
                    if pages.len() >= self.config.capacity {
                        self.evict_page(&mut pages)?;
                    }
                    pages.insert(page_id, page);
                }
            }
        }
        Ok(())
    }

    fn flush(&self, page: &PageRef) -> Result<bool> {
        let mut page = page.write();
        if !page.is_dirty() {
            return Ok(false);
        }
        self.write_back(&page)?;
        page.mark_dirty(None);
        Ok(true)
    }

    fn write_back(&self, page: &HeapPage) -> Result<()> {
        let store = self.catalog.database_file(page.page_id().table_id)?;
        store.write_page(page)?;
        log::trace!("flushed {}", page.page_id());
        Ok(())
    }

    fn snapshot(&self) -> Vec<PageRef> {
        self.pages.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, Schema, Value};
    use tempfile::TempDir;

    fn setup(capacity: usize) -> (BufferPool, TableId, TempDir) {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(Catalog::new());
        let schema = Schema::builder()
            .column("id", DataType::Integer)
            .column("note", DataType::Text(16))
            .build_arc();
        let table_id = catalog
            .create_table("t", dir.path().join("t.dat"), schema)
            .unwrap();
        let config = BufferPoolConfig::new(capacity)
            .with_lock_timeout(Duration::from_millis(20), Duration::from_millis(40));
        (BufferPool::new(config, catalog), table_id, dir)
    }

    fn row(pool: &BufferPool, table_id: TableId, id: i32) -> Tuple {
        let schema = pool.catalog.schema(table_id).unwrap();
        Tuple::new(schema, vec![Value::Integer(id), Value::from("n")]).unwrap()
    }

    fn allocate(pool: &BufferPool, table_id: TableId, n: u32) -> Vec<PageId> {
        let store = pool.catalog.database_file(table_id).unwrap();
        (0..n)
            .map(|_| {
                let page = HeapPage::empty(PageId::new(table_id, store.num_pages()), store.schema().clone());
                store.write_page(&page).unwrap();
                page.page_id()
            })
            .collect()
    }

    #[test]
    fn test_get_page_caches() {
        let (pool, table_id, _dir) = setup(4);
        let pids = allocate(&pool, table_id, 1);
        let txn = TransactionId::new();

        let a = pool.get_page(txn, pids[0], LockMode::Shared).unwrap();
        let b = pool.get_page(txn, pids[0], LockMode::Shared).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.cached_pages(), 1);
        assert!(pool.holds_lock(txn, pids[0]));
    }

    #[test]
    fn test_clean_pages_are_evicted() {
        let (pool, table_id, _dir) = setup(2);
        let pids = allocate(&pool, table_id, 5);
        let txn = TransactionId::new();

        for &pid in &pids {
            pool.get_page(txn, pid, LockMode::Shared).unwrap();
            assert!(pool.cached_pages() <= 2);
        }
        assert!(pool.is_cached(pids[4]));
    }

    #[test]
    fn test_dirty_pages_are_never_evicted() {
        let (pool, table_id, _dir) = setup(2);
        let pids = allocate(&pool, table_id, 3);
        let txn = TransactionId::new();

        for &pid in &pids[..2] {
            let page = pool.get_page(txn, pid, LockMode::Exclusive).unwrap();
            page.write().mark_dirty(Some(txn));
        }

        let result = pool.get_page(txn, pids[2], LockMode::Shared);
        assert!(matches!(result, Err(StrataError::BufferPoolFull)));
        assert!(pool.is_cached(pids[0]));
        assert!(pool.is_cached(pids[1]));
    }

    #[test]
    fn test_conflicting_lock_times_out() {
        let (pool, table_id, _dir) = setup(4);
        let pids = allocate(&pool, table_id, 1);
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        pool.get_page(t1, pids[0], LockMode::Exclusive).unwrap();
        let result = pool.get_page(t2, pids[0], LockMode::Shared);

        match result {
            Err(e) => assert!(e.is_transaction_abort()),
            Ok(_) => panic!("expected a lock timeout"),
        }
    }

    #[test]
    fn test_insert_marks_dirty_and_commit_flushes() {
        let (pool, table_id, _dir) = setup(4);
        let txn = TransactionId::new();

        let mut tuple = row(&pool, table_id, 1);
        pool.insert_tuple(txn, table_id, &mut tuple).unwrap();
        let pid = tuple.record_id().unwrap().page_id;

        {
            let page = pool.get_page(txn, pid, LockMode::Shared).unwrap();
            assert_eq!(page.read().dirtied_by(), Some(txn));
        }

        pool.transaction_complete(txn, true).unwrap();
        assert!(!pool.is_cached(pid));
        assert!(!pool.holds_lock(txn, pid));

        let store = pool.catalog.database_file(table_id).unwrap();
        let on_disk = store.read_page(pid).unwrap();
        assert_eq!(on_disk.tuple_count(), 1);
    }

    #[test]
    fn test_abort_discards() {
        let (pool, table_id, _dir) = setup(4);
        let txn = TransactionId::new();

        let mut tuple = row(&pool, table_id, 1);
        pool.insert_tuple(txn, table_id, &mut tuple).unwrap();
        let pid = tuple.record_id().unwrap().page_id;

        pool.transaction_complete(txn, false).unwrap();
        assert!(!pool.is_cached(pid));

        let reader = TransactionId::new();
        let page = pool.get_page(reader, pid, LockMode::Shared).unwrap();
        assert_eq!(page.read().tuple_count(), 0);
    }

    #[test]
    fn test_flush_page_and_discard() {
        let (pool, table_id, _dir) = setup(4);
        let txn = TransactionId::new();

        let mut tuple = row(&pool, table_id, 9);
        pool.insert_tuple(txn, table_id, &mut tuple).unwrap();
        let pid = tuple.record_id().unwrap().page_id;

        assert!(pool.flush_page(pid).unwrap());
        assert!(!pool.flush_page(pid).unwrap());

        pool.discard_page(pid);
        assert!(!pool.is_cached(pid));
        pool.transaction_complete(txn, false).unwrap();

        // Flushed before the abort, so the write survives
        let reader = TransactionId::new();
        let page = pool.get_page(reader, pid, LockMode::Shared).unwrap();
        assert_eq!(page.read().tuple_count(), 1);
    }

    #[test]
    fn test_delete_requires_record_id() {
        let (pool, table_id, _dir) = setup(4);
        let txn = TransactionId::new();
        let tuple = row(&pool, table_id, 1);

        assert!(matches!(
            pool.delete_tuple(txn, &tuple),
            Err(StrataError::MissingRecordId)
        ));
    }
}
