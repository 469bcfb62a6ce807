/// Wire values and type codes
///
/// This module defines the typed values bound to statement parameters and
/// returned in result rows, plus the wire type codes the backend's parameter
/// protocol expects alongside each bound value.
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

/// A single database value, as bound to a parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Bytes),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Null,
}

/// Backend wire type codes.
///
/// `Unspecified` is the untyped, null-compatible code assigned to NULL
/// parameters; the backend infers the column type server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeCode {
    Unspecified,
    Bool,
    Int64,
    Float64,
    String,
    Bytes,
    Date,
    Timestamp,
}

impl Value {
    /// Infer the wire type code for this value.
    ///
    /// Every typed value maps to exactly one code; NULL maps to the untyped
    /// `Unspecified` code so the backend can infer the type.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Value::Int64(_) => TypeCode::Int64,
            Value::Float64(_) => TypeCode::Float64,
            Value::String(_) => TypeCode::String,
            Value::Bytes(_) => TypeCode::Bytes,
            Value::Bool(_) => TypeCode::Bool,
            Value::Date(_) => TypeCode::Date,
            Value::Timestamp(_) => TypeCode::Timestamp,
            Value::Null => TypeCode::Unspecified,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl TypeCode {
    /// Display size of a value of this type, per the backend's documented
    /// data-type sizes. Dynamically-sized types (STRING, BYTES) have no fixed
    /// size and return `None`. Used for `Cursor.description`; the result
    /// metadata does not carry sizes, so they are looked up here.
    pub fn display_size(self) -> Option<usize> {
        match self {
            TypeCode::Bool => Some(1),
            TypeCode::Date => Some(4),
            TypeCode::Float64 | TypeCode::Int64 => Some(8),
            TypeCode::Timestamp => Some(12),
            TypeCode::String | TypeCode::Bytes | TypeCode::Unspecified => None,
        }
    }
}

/// A result row.
pub type Row = Vec<Value>;

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Value::from)
    }
}
