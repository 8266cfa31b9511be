//! Integration tests for the buffer pool: capacity, NO-STEAL, commit and abort

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use strata::buffer::BufferPool;
use strata::catalog::Catalog;
use strata::common::{BufferPoolConfig, PageId, StrataError, TableId, TransactionId};
use strata::concurrency::LockMode;
use strata::storage::disk::PageStore;
use strata::storage::page::HeapPage;
use strata::tuple::{DataType, Schema, Tuple, Value};
use tempfile::TempDir;

fn create_schema() -> Arc<Schema> {
    Schema::builder()
        .column("id", DataType::Integer)
        .column("v", DataType::Integer)
        .build_arc()
}

fn create_pool(capacity: usize) -> (Arc<BufferPool>, Arc<Catalog>, TableId, TempDir) {
    let config = BufferPoolConfig::new(capacity)
        .with_lock_timeout(Duration::from_millis(50), Duration::from_millis(100));
    create_pool_with(config)
}

fn create_pool_with(config: BufferPoolConfig) -> (Arc<BufferPool>, Arc<Catalog>, TableId, TempDir) {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new());
    let table_id = catalog
        .create_table("t", dir.path().join("t.dat"), create_schema())
        .unwrap();
    let pool = Arc::new(BufferPool::new(config, catalog.clone()));
    (pool, catalog, table_id, dir)
}

/// Writes `n` pages holding one tuple each straight to the table file.
fn seed_pages(catalog: &Catalog, table_id: TableId, n: u32) -> Vec<PageId> {
    let store = catalog.database_file(table_id).unwrap();
    (0..n)
        .map(|page_no| {
            let page_id = PageId::new(table_id, page_no);
            let mut page = HeapPage::empty(page_id, store.schema().clone());
            let mut tuple = row(page_no as i32, 0);
            page.insert_tuple(&mut tuple).unwrap();
            store.write_page(&page).unwrap();
            page_id
        })
        .collect()
}

fn row(id: i32, v: i32) -> Tuple {
    Tuple::new(create_schema(), vec![Value::Integer(id), Value::Integer(v)]).unwrap()
}

fn first_value(pool: &BufferPool, page_id: PageId) -> i32 {
    let reader = TransactionId::new();
    let page = pool.get_page(reader, page_id, LockMode::Shared).unwrap();
    let v = page.read().tuples().next().unwrap().field(1).unwrap().as_integer().unwrap();
    pool.transaction_complete(reader, true).unwrap();
    v
}

#[test]
fn test_cache_never_exceeds_capacity() {
    let (pool, catalog, table_id, _dir) = create_pool(4);
    let pages = seed_pages(&catalog, table_id, 20);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pool = pool.clone();
            let pages = pages.clone();
            thread::spawn(move || {
                let txn = TransactionId::new();
                for round in 0..50 {
                    let pid = pages[(i * 7 + round * 3) % pages.len()];
                    pool.get_page(txn, pid, LockMode::Shared).unwrap();
                    assert!(pool.cached_pages() <= pool.capacity());
                }
                pool.transaction_complete(txn, true).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(pool.cached_pages() <= 4);
}

#[test]
fn test_no_steal_full_of_dirty_pages() {
    let (pool, catalog, table_id, _dir) = create_pool(2);
    let pages = seed_pages(&catalog, table_id, 3);
    let writer = TransactionId::new();

    for &pid in &pages[..2] {
        let page = pool.get_page(writer, pid, LockMode::Exclusive).unwrap();
        page.write().mark_dirty(Some(writer));
    }

    let reader = TransactionId::new();
    assert!(matches!(
        pool.get_page(reader, pages[2], LockMode::Shared),
        Err(StrataError::BufferPoolFull)
    ));

    // Completing the writer frees the cache
    pool.transaction_complete(writer, true).unwrap();
    assert!(pool.get_page(reader, pages[2], LockMode::Shared).is_ok());
    pool.transaction_complete(reader, true).unwrap();
}

#[test]
fn test_commit_flushes_and_releases() {
    let (pool, catalog, table_id, _dir) = create_pool(8);
    let pages = seed_pages(&catalog, table_id, 2);
    let txn = TransactionId::new();

    {
        let page = pool.get_page(txn, pages[0], LockMode::Exclusive).unwrap();
        let mut page = page.write();
        let mut tuple = page.tuples().next().unwrap().clone();
        page.delete_tuple(&tuple).unwrap();
        tuple.set_value(1, Value::Integer(42)).unwrap();
        page.insert_tuple(&mut tuple).unwrap();
        page.mark_dirty(Some(txn));
    }
    pool.get_page(txn, pages[1], LockMode::Shared).unwrap();

    pool.transaction_complete(txn, true).unwrap();

    assert!(!pool.is_cached(pages[0]));
    assert!(pool.is_cached(pages[1]));
    assert!(pool.lock_manager().pages_locked_by(txn).is_empty());

    let on_disk = catalog.database_file(table_id).unwrap().read_page(pages[0]).unwrap();
    let v = on_disk.tuples().next().unwrap().field(1).unwrap().clone();
    assert_eq!(v, Value::Integer(42));
    assert_eq!(first_value(&pool, pages[0]), 42);
}

#[test]
fn test_abort_restores_previous_contents() {
    let (pool, catalog, table_id, _dir) = create_pool(8);
    let pages = seed_pages(&catalog, table_id, 1);
    let txn = TransactionId::new();

    let mut extra = row(100, 7);
    pool.insert_tuple(txn, table_id, &mut extra).unwrap();
    assert_eq!(extra.record_id().unwrap().page_id, pages[0]);
    {
        let page = pool.get_page(txn, pages[0], LockMode::Shared).unwrap();
        assert_eq!(page.read().tuple_count(), 2);
    }

    pool.transaction_complete(txn, false).unwrap();
    assert!(!pool.is_cached(pages[0]));

    let reader = TransactionId::new();
    let page = pool.get_page(reader, pages[0], LockMode::Shared).unwrap();
    assert_eq!(page.read().tuple_count(), 1);
    assert_eq!(first_value(&pool, pages[0]), 0);
}

#[test]
fn test_lock_timeout_aborts_and_recovers() {
    let (pool, catalog, table_id, _dir) = create_pool(8);
    let pages = seed_pages(&catalog, table_id, 1);
    let (holder, waiter) = (TransactionId::new(), TransactionId::new());

    pool.get_page(holder, pages[0], LockMode::Exclusive).unwrap();
    let err = pool.get_page(waiter, pages[0], LockMode::Exclusive).unwrap_err();
    assert!(matches!(err, StrataError::TransactionAborted(t) if t == waiter));

    pool.transaction_complete(waiter, false).unwrap();
    pool.transaction_complete(holder, true).unwrap();

    let retry = TransactionId::new();
    assert!(pool.get_page(retry, pages[0], LockMode::Exclusive).is_ok());
    pool.transaction_complete(retry, true).unwrap();
}

#[test]
fn test_waiter_gets_lock_after_commit() {
    // Long budget so the waiter outlasts the holder
    let config = BufferPoolConfig::new(8)
        .with_lock_timeout(Duration::from_secs(2), Duration::from_secs(3));
    let (pool, catalog, table_id, _dir) = create_pool_with(config);
    let pages = seed_pages(&catalog, table_id, 1);

    let holder = TransactionId::new();
    pool.get_page(holder, pages[0], LockMode::Exclusive).unwrap();

    let waiter_pool = pool.clone();
    let pid = pages[0];
    let waiter = thread::spawn(move || {
        let txn = TransactionId::new();
        let result = waiter_pool.get_page(txn, pid, LockMode::Shared).map(|_| ());
        waiter_pool.transaction_complete(txn, true).unwrap();
        result
    });

    thread::sleep(Duration::from_millis(50));
    pool.transaction_complete(holder, true).unwrap();
    assert!(waiter.join().unwrap().is_ok());
}

#[test]
fn test_insert_grows_table() {
    let (pool, catalog, table_id, _dir) = create_pool(8);
    let txn = TransactionId::new();
    let per_page = HeapPage::slots_per_page(&create_schema()) as i32;

    for i in 0..per_page + 1 {
        let mut tuple = row(i, i);
        pool.insert_tuple(txn, table_id, &mut tuple).unwrap();
    }
    pool.transaction_complete(txn, true).unwrap();

    let store = catalog.database_file(table_id).unwrap();
    assert_eq!(store.num_pages(), 2);
    let total: usize = (0..2)
        .map(|n| store.read_page(PageId::new(table_id, n)).unwrap().tuple_count())
        .sum();
    assert_eq!(total, per_page as usize + 1);
}

#[test]
fn test_flush_pages_for_transaction() {
    let (pool, catalog, table_id, _dir) = create_pool(8);
    let pages = seed_pages(&catalog, table_id, 1);
    let txn = TransactionId::new();

    let mut tuple = row(5, 5);
    pool.insert_tuple(txn, table_id, &mut tuple).unwrap();
    pool.flush_pages(txn).unwrap();

    let store = catalog.database_file(table_id).unwrap();
    assert_eq!(store.read_page(pages[0]).unwrap().tuple_count(), 2);
    assert!(pool.is_cached(pages[0]));
    pool.transaction_complete(txn, true).unwrap();
}
