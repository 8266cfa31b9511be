use std::fmt;

/// Represents the column types supported by the storage engine.
/// Every type is fixed width on disk so that heap pages can use
/// fixed-size slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer: 4 bytes, little-endian
    Integer,

    /// Bounded character string.
    /// Stored as: length (4 bytes) + data padded with zeros to `n` bytes
    Text(u16),
}

impl DataType {
    /// Returns the on-disk size of a value of this type in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::Integer => 4,
            DataType::Text(n) => 4 + *n as usize,
        }
    }

    /// Returns true for numeric types that support SUM/MIN/MAX/AVG.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Text(n) => write!(f, "TEXT({})", n),
        }
    }
}
