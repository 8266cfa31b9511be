use std::collections::HashMap;
use std::sync::Arc;

use super::DataType;

/// Represents a single column in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name (possibly qualified as `alias.field`)
    name: String,

    /// Column data type
    data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the on-disk size of this column in bytes.
    pub fn size(&self) -> usize {
        self.data_type.size()
    }
}

/// Ordered list of typed, named columns describing a tuple.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,

    /// Map from column name to the first column index carrying it
    name_to_index: HashMap<String, usize>,

    /// Encoded size of a whole tuple
    tuple_size: usize,
}

impl Schema {
    /// Creates a schema from columns in tuple order.
    pub fn new(columns: Vec<Column>) -> Self {
        let mut name_to_index = HashMap::new();
        for (i, col) in columns.iter().enumerate() {
            // A merged join schema may repeat a name; lookups resolve to the left side
            name_to_index.entry(col.name.clone()).or_insert(i);
        }
        let tuple_size = columns.iter().map(Column::size).sum();

        Self {
            columns,
            name_to_index,
            tuple_size,
        }
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column at the given index.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Looks up a column by exact (possibly alias-qualified) name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Returns the encoded size of one tuple in bytes.
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Returns true if both schemas have the same column types in the same
    /// order. Names are ignored.
    pub fn same_types(&self, other: &Schema) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.data_type == b.data_type)
    }

    /// Concatenates two schemas, left columns first. Duplicate names are kept.
    pub fn merge(left: &Schema, right: &Schema) -> Schema {
        let columns = left
            .columns
            .iter()
            .chain(right.columns.iter())
            .cloned()
            .collect();
        Schema::new(columns)
    }

    /// Returns a copy of this schema with every column qualified as
    /// `alias.field`.
    pub fn with_alias(&self, alias: &str) -> Schema {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(format!("{}.{}", alias, c.name), c.data_type))
            .collect();
        Schema::new(columns)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

/// Fluent builder: `Schema::builder().column(..).column(..).build()`.
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(self.columns)
    }

    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
