use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{Result, StrataError};

use super::DataType;

/// Comparison operators usable in filter and join predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
}

impl CompareOp {
    /// Returns true if an ordering between two operands satisfies this operator.
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Equals => ordering == Ordering::Equal,
            CompareOp::NotEquals => ordering != Ordering::Equal,
            CompareOp::LessThan => ordering == Ordering::Less,
            CompareOp::LessThanOrEq => ordering != Ordering::Greater,
            CompareOp::GreaterThan => ordering == Ordering::Greater,
            CompareOp::GreaterThanOrEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "<>",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEq => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEq => ">=",
        };
        f.write_str(symbol)
    }
}

/// A typed field value. Values are totally ordered within a type and
/// hashable, so they can serve directly as group-by keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// 32-bit signed integer
    Integer(i32),

    /// Character string
    Text(String),
}

impl Value {
    /// Returns the DataType that best matches this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Text(s) => DataType::Text(s.len() as u16),
        }
    }

    /// Returns true if this value can be stored in a column of the given type.
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Integer(_), DataType::Integer) => true,
            (Value::Text(s), DataType::Text(n)) => s.len() <= *n as usize,
            _ => false,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Integer(_) => None,
        }
    }

    /// Compares two values for ordering.
    /// Returns None if the values are of different types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Evaluates `self <op> other`. Values of different types never match.
    pub fn satisfies(&self, op: CompareOp, other: &Value) -> bool {
        self.compare(other).map(|o| op.matches(o)).unwrap_or(false)
    }

    /// Appends the fixed-width encoding of this value to `buf`.
    pub fn encode(&self, data_type: &DataType, buf: &mut impl BufMut) -> Result<()> {
        match (self, data_type) {
            (Value::Integer(v), DataType::Integer) => buf.put_i32_le(*v),
            (Value::Text(s), DataType::Text(n)) => {
                let n = *n as usize;
                let bytes = s.as_bytes();
                if bytes.len() > n {
                    return Err(StrataError::TypeMismatch(format!(
                        "string of {} bytes exceeds {}",
                        bytes.len(),
                        data_type
                    )));
                }
                buf.put_u32_le(bytes.len() as u32);
                buf.put_slice(bytes);
                buf.put_bytes(0, n - bytes.len());
            }
            _ => {
                return Err(StrataError::TypeMismatch(format!(
                    "cannot store {} in a {} column",
                    self, data_type
                )))
            }
        }
        Ok(())
    }

    /// Reads one fixed-width value of the given type from `buf`.
    pub fn decode(data_type: &DataType, buf: &mut impl Buf) -> Result<Value> {
        if buf.remaining() < data_type.size() {
            return Err(StrataError::Corrupted(format!(
                "truncated {} field",
                data_type
            )));
        }
        match data_type {
            DataType::Integer => Ok(Value::Integer(buf.get_i32_le())),
            DataType::Text(n) => {
                let n = *n as usize;
                let len = buf.get_u32_le() as usize;
                if len > n {
                    return Err(StrataError::Corrupted(format!(
                        "text length {} exceeds {}",
                        len, data_type
                    )));
                }
                let mut raw = vec![0u8; n];
                buf.copy_to_slice(&mut raw);
                raw.truncate(len);
                let s = String::from_utf8(raw)
                    .map_err(|e| StrataError::Corrupted(e.to_string()))?;
                Ok(Value::Text(s))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
