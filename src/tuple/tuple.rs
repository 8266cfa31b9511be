use std::fmt;
use std::sync::Arc;

use crate::common::{RecordId, Result, StrataError};

use super::{Schema, Value};

/// Represents a single row/tuple.
///
/// A tuple holds one value per column of its schema and, once it has been
/// read from or written to a heap page, the [`RecordId`] locating it.
///
/// ## Tuple Binary Format
///
/// Every column is fixed width, so a tuple encodes to exactly
/// `schema.tuple_size()` bytes: each value in column order, integers as
/// 4 little-endian bytes and text as a 4-byte length followed by the
/// zero-padded bytes.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// The schema defining the structure of this tuple
    schema: Arc<Schema>,

    /// The values for each column (in schema order)
    values: Vec<Value>,

    /// Location on disk, if the tuple is stored
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple, checking every value against its column type.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.column_count() {
            return Err(StrataError::SchemaMismatch(format!(
                "expected {} values, got {}",
                schema.column_count(),
                values.len()
            )));
        }
        for (value, column) in values.iter().zip(schema.columns()) {
            if !value.fits(column.data_type()) {
                return Err(StrataError::TypeMismatch(format!(
                    "{} does not fit column '{}' of type {}",
                    value,
                    column.name(),
                    column.data_type()
                )));
            }
        }
        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Decodes a tuple from its fixed-width encoding.
    pub fn from_bytes(schema: Arc<Schema>, mut data: &[u8]) -> Result<Self> {
        let mut values = Vec::with_capacity(schema.column_count());
        for column in schema.columns() {
            values.push(Value::decode(column.data_type(), &mut data)?);
        }
        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Encodes the tuple into exactly `schema.tuple_size()` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.schema.tuple_size());
        for (value, column) in self.values.iter().zip(self.schema.columns()) {
            value.encode(column.data_type(), &mut bytes)?;
        }
        Ok(bytes)
    }

    /// Concatenates two tuples field by field, left fields first.
    pub fn concat(left: &Tuple, right: &Tuple, schema: Arc<Schema>) -> Tuple {
        let values = left
            .values
            .iter()
            .chain(right.values.iter())
            .cloned()
            .collect();
        Tuple {
            schema,
            values,
            record_id: None,
        }
    }

    /// Returns the schema of this tuple.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the value at the given column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value at the given index, or an error if out of range.
    pub fn field(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or(StrataError::InvalidColumn(index))
    }

    /// Returns all values in this tuple.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replaces the value at the given column index.
    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        let column = self
            .schema
            .column(index)
            .ok_or(StrataError::InvalidColumn(index))?;
        if !value.fits(column.data_type()) {
            return Err(StrataError::TypeMismatch(format!(
                "{} does not fit column '{}'",
                value,
                column.name()
            )));
        }
        self.values[index] = value;
        Ok(())
    }

    /// Returns the number of columns/values in this tuple.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this tuple has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Re-labels the tuple with a schema of identical shape, e.g. an
    /// alias-qualified copy of the table schema.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Tuple {
        debug_assert!(self.schema.same_types(&schema));
        self.schema = schema;
        self
    }
}

/// Tuples compare by their values only.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}
