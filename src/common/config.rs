use std::time::Duration;

/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool may cache
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// Lower bound of the randomized lock-wait budget
pub const DEFAULT_LOCK_TIMEOUT_MIN: Duration = Duration::from_millis(1000);

/// Upper bound of the randomized lock-wait budget
pub const DEFAULT_LOCK_TIMEOUT_MAX: Duration = Duration::from_millis(3000);

/// Tunables for a [`crate::buffer::BufferPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of pages resident at once
    pub capacity: usize,
    /// Shortest lock-wait budget a single `get_page` call may draw
    pub lock_timeout_min: Duration,
    /// Longest lock-wait budget a single `get_page` call may draw
    pub lock_timeout_max: Duration,
}

impl BufferPoolConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the range the per-call lock-wait budget is drawn from.
    /// A reversed range is normalised so that `min <= max`.
    pub fn with_lock_timeout(mut self, min: Duration, max: Duration) -> Self {
        self.lock_timeout_min = min.min(max);
        self.lock_timeout_max = max.max(min);
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUFFER_POOL_PAGES,
            lock_timeout_min: DEFAULT_LOCK_TIMEOUT_MIN,
            lock_timeout_max: DEFAULT_LOCK_TIMEOUT_MAX,
        }
    }
}
