use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Result, StrataError, TableId, PAGE_SIZE};
use crate::storage::disk::{HeapFile, PageStore};
use crate::tuple::Schema;

/// Catalog entry for one table.
#[derive(Clone)]
pub struct TableInfo {
    pub id: TableId,
    pub name: String,
    pub store: Arc<dyn PageStore>,
}

#[derive(Default)]
struct CatalogState {
    tables: HashMap<TableId, TableInfo>,
    names: HashMap<String, TableId>,
    next_id: u32,
}

/// Catalog maps table IDs to their names, schemas, and page stores.
pub struct Catalog {
    state: RwLock<CatalogState>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Opens (or creates) a heap file at `path` and registers it as `name`.
    pub fn create_table<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        schema: Arc<Schema>,
    ) -> Result<TableId> {
        if schema.column_count() == 0 || schema.tuple_size() + 1 > PAGE_SIZE {
            return Err(StrataError::SchemaMismatch(format!(
                "tuples of {} bytes cannot be stored in {}-byte pages",
                schema.tuple_size(),
                PAGE_SIZE
            )));
        }

        let mut state = self.state.write();
        if state.names.contains_key(name) {
            return Err(StrataError::TableAlreadyExists(name.to_string()));
        }

        let id = TableId::new(state.next_id);
        let store = Arc::new(HeapFile::open(path, id, schema)?);
        state.next_id += 1;
        state.names.insert(name.to_string(), id);
        state.tables.insert(
            id,
            TableInfo {
                id,
                name: name.to_string(),
                store,
            },
        );

        log::debug!("registered table '{}' as {}", name, id);
        Ok(id)
    }

    /// Returns the page store backing `table_id`.
    pub fn database_file(&self, table_id: TableId) -> Result<Arc<dyn PageStore>> {
        self.table(table_id).map(|t| t.store)
    }

    /// Returns the schema of `table_id`.
    pub fn schema(&self, table_id: TableId) -> Result<Arc<Schema>> {
        self.table(table_id).map(|t| t.store.schema().clone())
    }

    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.table(table_id).map(|t| t.name)
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.state.read().names.get(name).copied()
    }

    /// Returns every registered table ID in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.state.read().tables.keys().copied().collect();
        ids.sort();
        ids
    }

    fn table(&self, table_id: TableId) -> Result<TableInfo> {
        self.state
            .read()
            .tables
            .get(&table_id)
            .cloned()
            .ok_or(StrataError::TableNotFound(table_id))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
