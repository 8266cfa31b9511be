use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::common::{Result, StrataError};
use crate::execution::{Cursor, Operator, TupleIterator};
use crate::tuple::{Column, DataType, Schema, Tuple, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateOp::Count => "COUNT",
            AggregateOp::Sum => "SUM",
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Avg => "AVG",
        };
        f.write_str(name)
    }
}

impl FromStr for AggregateOp {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "COUNT" => Ok(AggregateOp::Count),
            "SUM" => Ok(AggregateOp::Sum),
            "MIN" => Ok(AggregateOp::Min),
            "MAX" => Ok(AggregateOp::Max),
            "AVG" => Ok(AggregateOp::Avg),
            _ => Err(StrataError::UnsupportedAggregate(s.to_string())),
        }
    }
}

/// Running state for one group. AVG keeps sum and count and only divides
/// when the result is produced.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: i64,
    sum: i64,
    min: i32,
    max: i32,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        }
    }
}

impl Accumulator {
    fn add(&mut self, value: &Value) {
        self.count += 1;
        if let Some(v) = value.as_integer() {
            self.sum += i64::from(v);
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    fn result(&self, op: AggregateOp) -> Result<i32> {
        let value = match op {
            AggregateOp::Count => self.count,
            AggregateOp::Sum => self.sum,
            AggregateOp::Min => i64::from(self.min),
            AggregateOp::Max => i64::from(self.max),
            AggregateOp::Avg => self.sum / self.count.max(1),
        };
        i32::try_from(value).map_err(|_| StrataError::AggregateOverflow)
    }
}

/// Grouping engine: folds tuples into per-group accumulators and emits one
/// row per group in the order groups were first seen.
#[derive(Debug)]
pub struct Aggregator {
    group_field: Option<usize>,
    aggregate_field: usize,
    op: AggregateOp,
    groups: Vec<(Option<Value>, Accumulator)>,
    index: HashMap<Option<Value>, usize>,
}

impl Aggregator {
    pub fn new(group_field: Option<usize>, aggregate_field: usize, op: AggregateOp) -> Self {
        Self {
            group_field,
            aggregate_field,
            op,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Folds one tuple into its group.
    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let key = match self.group_field {
            Some(field) => Some(tuple.field(field)?.clone()),
            None => None,
        };
        let value = tuple.field(self.aggregate_field)?;
        if self.op != AggregateOp::Count && value.as_integer().is_none() {
            return Err(StrataError::TypeMismatch(format!(
                "{} needs an integer, got {}",
                self.op, value
            )));
        }

        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.groups.push((key.clone(), Accumulator::default()));
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.add(value);
        Ok(())
    }

    /// Builds one output tuple per group against `schema`.
    pub fn results(&self, schema: &Arc<Schema>) -> Result<Vec<Tuple>> {
        self.groups
            .iter()
            .map(|(key, acc)| {
                let mut values = Vec::with_capacity(2);
                if let Some(key) = key {
                    values.push(key.clone());
                }
                values.push(Value::Integer(acc.result(self.op)?));
                Tuple::new(Arc::clone(schema), values)
            })
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Computes one aggregate over its child, optionally grouped by one field.
///
/// The child is drained during `open`; output rows are then served from
/// memory. The schema is `[group field?, "<OP>(<field>)"]`.
pub struct Aggregate {
    child: Box<dyn Operator>,
    group_field: Option<usize>,
    aggregate_field: usize,
    op: AggregateOp,
    schema: Arc<Schema>,
    output: Option<TupleIterator>,
    cursor: Cursor,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn Operator>,
        aggregate_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let child_schema = child.schema();
        let aggregate_column = child_schema
            .column(aggregate_field)
            .ok_or(StrataError::InvalidColumn(aggregate_field))?;
        if !aggregate_column.data_type().is_numeric() && op != AggregateOp::Count {
            return Err(StrataError::UnsupportedAggregate(format!(
                "{} over {} column '{}'",
                op,
                aggregate_column.data_type(),
                aggregate_column.name()
            )));
        }

        let mut columns = Vec::with_capacity(2);
        if let Some(field) = group_field {
            let column = child_schema
                .column(field)
                .ok_or(StrataError::InvalidColumn(field))?;
            columns.push(column.clone());
        }
        columns.push(Column::new(
            format!("{}({})", op, aggregate_column.name()),
            DataType::Integer,
        ));

        Ok(Self {
            child,
            group_field,
            aggregate_field,
            op,
            schema: Arc::new(Schema::new(columns)),
            output: None,
            cursor: Cursor::default(),
        })
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn aggregate_field(&self) -> usize {
        self.aggregate_field
    }

    /// Name of the child column used for grouping, if grouped.
    pub fn group_field_name(&self) -> Option<&str> {
        self.group_field
            .and_then(|field| self.child.schema().column(field))
            .map(Column::name)
    }

    pub fn aggregate_field_name(&self) -> &str {
        self.child
            .schema()
            .column(self.aggregate_field)
            .map_or("", Column::name)
    }
}

impl Operator for Aggregate {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;

        let mut aggregator = Aggregator::new(self.group_field, self.aggregate_field, self.op);
        while self.child.has_next()? {
            aggregator.merge(&self.child.next()?)?;
        }

        let rows = aggregator.results(&self.schema)?;
        log::trace!("{} produced {} groups", self.op, rows.len());
        let mut output = TupleIterator::new(Arc::clone(&self.schema), rows);
        output.open()?;
        self.output = Some(output);
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
        self.output = None;
        self.child.close();
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        let output = self.output.as_mut().ok_or(StrataError::OperatorNotOpen)?;
        if output.has_next()? {
            Ok(Some(output.next()?))
        } else {
            Ok(None)
        }
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
