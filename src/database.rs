use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{BufferPoolConfig, Result, TableId};
use crate::tuple::Schema;

/// Execution context shared by every operator and storage call: the
/// table registry plus the buffer pool sitting in front of it.
///
/// Each `Database` is fully isolated, so tests can build as many as they
/// like side by side.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    pub fn new(config: BufferPoolConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(config, Arc::clone(&catalog)));
        Self {
            catalog,
            buffer_pool,
        }
    }

    /// Registers a table backed by the file at `path`.
    pub fn create_table<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        schema: Arc<Schema>,
    ) -> Result<TableId> {
        self.catalog.create_table(name, path, schema)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}
