use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::common::{PageId, TransactionId};

/// Lock modes for page-level two-phase locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Read access; any number of transactions may share it
    Shared,
    /// Read-write access; excludes every other holder
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "S"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

/// One granted lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lock {
    pub mode: LockMode,
    pub txn: TransactionId,
}

/// Lock table state guarded by a single mutex.
#[derive(Default)]
struct LockTable {
    /// Granted locks per page. Holds either one exclusive lock or any
    /// number of shared locks from distinct transactions.
    pages: HashMap<PageId, Vec<Lock>>,
    /// Reverse index used to release everything a transaction holds
    held: HashMap<TransactionId, HashSet<PageId>>,
}

impl LockTable {
    /// Applies the grant rule and records the lock on success.
    fn try_grant(&mut self, txn: TransactionId, page_id: PageId, mode: LockMode) -> bool {
        let locks = self.pages.entry(page_id).or_default();

        if locks.is_empty() {
            locks.push(Lock { mode, txn });
            self.held.entry(txn).or_default().insert(page_id);
            return true;
        }

        if let Some(pos) = locks.iter().position(|l| l.txn == txn) {
            return match (locks[pos].mode, mode) {
                // Same mode, or exclusive already implies read access
                (held, wanted) if held == wanted => true,
                (LockMode::Exclusive, LockMode::Shared) => true,
                // Upgrade only as the sole holder
                (LockMode::Shared, LockMode::Exclusive) => {
                    if locks.len() == 1 {
                        locks[pos].mode = LockMode::Exclusive;
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            };
        }

        // No lock of our own here; any existing holder blocks an exclusive
        // request, and an exclusive holder blocks everything.
        if mode == LockMode::Exclusive || locks.iter().any(|l| l.mode == LockMode::Exclusive) {
            return false;
        }

        locks.push(Lock { mode, txn });
        self.held.entry(txn).or_default().insert(page_id);
        true
    }

    fn release(&mut self, txn: TransactionId, page_id: PageId) -> bool {
        let mut released = false;
        if let Some(locks) = self.pages.get_mut(&page_id) {
            let before = locks.len();
            locks.retain(|l| l.txn != txn);
            released = locks.len() != before;
            if locks.is_empty() {
                self.pages.remove(&page_id);
            }
        }
        if let Some(pages) = self.held.get_mut(&txn) {
            pages.remove(&page_id);
            if pages.is_empty() {
                self.held.remove(&txn);
            }
        }
        released
    }
}

/// LockManager grants and releases page locks on behalf of transactions.
///
/// Every operation runs atomically under one mutex. `acquire` never
/// blocks; `acquire_within` waits for releases up to a time budget and
/// gives up with `false`, which callers turn into a transaction abort.
/// There is no wait-for graph: a deadlock resolves when one of the waiters
/// runs out of budget.
pub struct LockManager {
    table: Mutex<LockTable>,
    /// Signalled whenever a lock is released
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
        }
    }

    /// Tries once to grant `mode` on `page_id` to `txn`.
    pub fn acquire(&self, txn: TransactionId, page_id: PageId, mode: LockMode) -> bool {
        let granted = self.table.lock().try_grant(txn, page_id, mode);
        log::trace!(
            "{} {} lock on {} for {}",
            if granted { "granted" } else { "denied" },
            mode,
            page_id,
            txn
        );
        granted
    }

    /// Retries `acquire` each time a lock is released until it succeeds or
    /// `budget` elapses. Returns whether the lock was granted.
    pub fn acquire_within(
        &self,
        txn: TransactionId,
        page_id: PageId,
        mode: LockMode,
        budget: Duration,
    ) -> bool {
        let deadline = Instant::now() + budget;
        let mut table = self.table.lock();
        loop {
            if table.try_grant(txn, page_id, mode) {
                log::trace!("granted {} lock on {} for {}", mode, page_id, txn);
                return true;
            }
            if self.released.wait_until(&mut table, deadline).timed_out() {
                // One last attempt in case the release raced the deadline
                let granted = table.try_grant(txn, page_id, mode);
                if !granted {
                    log::debug!(
                        "{} timed out after {:?} waiting for {} lock on {}",
                        txn,
                        budget,
                        mode,
                        page_id
                    );
                }
                return granted;
            }
        }
    }

    /// Releases whatever lock `txn` holds on `page_id`.
    pub fn release(&self, txn: TransactionId, page_id: PageId) {
        let released = self.table.lock().release(txn, page_id);
        if released {
            self.released.notify_all();
        }
    }

    /// Releases every lock held by `txn`.
    pub fn release_all(&self, txn: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&txn).unwrap_or_default();
        for page_id in &pages {
            if let Some(locks) = table.pages.get_mut(page_id) {
                locks.retain(|l| l.txn != txn);
                if locks.is_empty() {
                    table.pages.remove(page_id);
                }
            }
        }
        drop(table);

        if !pages.is_empty() {
            log::trace!("released {} locks held by {}", pages.len(), txn);
            self.released.notify_all();
        }
    }

    /// Returns true if `txn` holds any lock on `page_id`.
    pub fn holds(&self, txn: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(txn, page_id).is_some()
    }

    /// Returns the mode `txn` holds on `page_id`, if any.
    pub fn lock_mode(&self, txn: TransactionId, page_id: PageId) -> Option<LockMode> {
        self.table
            .lock()
            .pages
            .get(&page_id)
            .and_then(|locks| locks.iter().find(|l| l.txn == txn))
            .map(|l| l.mode)
    }

    /// Returns every page `txn` currently holds a lock on.
    pub fn pages_locked_by(&self, txn: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .held
            .get(&txn)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns a snapshot of the locks granted on `page_id`.
    pub fn locks_on(&self, page_id: PageId) -> Vec<Lock> {
        self.table
            .lock()
            .pages
            .get(&page_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
