//! Scanned values and the destinations that accept them.
//!
//! Drivers hand the mapping engine one [`Value`] per column. A destination is
//! anything implementing [`Target`]: it accepts a value of a supported kind or
//! rejects it with a [`ScanError`]. The set of kinds is closed:
//!
//! - strings
//! - signed and unsigned integers (range-checked on conversion)
//! - floats
//! - booleans
//! - byte sequences
//! - `Option<T>` for nullable columns
//!
//! Rust types opt in through [`FromValue`]; a type without an implementation
//! cannot be bound to a column at all.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// A single scanned column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Kind tag of a [`Value`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    /// Any kind (used by destinations that take raw values)
    Any,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Str => "string",
            Self::Bytes => "bytes",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Self::Float(x as f64)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(i: $t) -> Self {
                Self::Int(i as i64)
            }
        })*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

/// Conversion from a scanned [`Value`] into a Rust type.
///
/// Column indexes in returned errors are 0; the engine re-anchors them onto
/// the real column.
pub trait FromValue: Sized {
    /// The kind this type expects, for error messages.
    const KIND: ValueKind;

    fn from_value(value: Value) -> Result<Self, ScanError>;
}

fn mismatch(expected: ValueKind, found: &Value) -> ScanError {
    if found.is_null() {
        ScanError::UnexpectedNull {
            column: 0,
            expected,
        }
    } else {
        ScanError::TypeMismatch {
            column: 0,
            expected,
            found: found.kind(),
        }
    }
}

impl FromValue for Value {
    const KIND: ValueKind = ValueKind::Any;

    fn from_value(value: Value) -> Result<Self, ScanError> {
        Ok(value)
    }
}

impl FromValue for String {
    const KIND: ValueKind = ValueKind::Str;

    fn from_value(value: Value) -> Result<Self, ScanError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FromValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: Value) -> Result<Self, ScanError> {
        match value {
            Value::Bool(b) => Ok(b),
            // MySQL reports BOOLEAN columns as TINYINT(1)
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FromValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: Value) -> Result<Self, ScanError> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FromValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: Value) -> Result<Self, ScanError> {
        f64::from_value(value).map(|x| x as f32)
    }
}

impl FromValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn from_value(value: Value) -> Result<Self, ScanError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Str(s) => Ok(s.into_bytes()),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: Value) -> Result<Self, ScanError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! int_from_value {
    ($($t:ty),*) => {
        $(impl FromValue for $t {
            const KIND: ValueKind = ValueKind::Int;

            fn from_value(value: Value) -> Result<Self, ScanError> {
                match value {
                    Value::Int(i) => <$t>::try_from(i).map_err(|_| ScanError::OutOfRange {
                        column: 0,
                        value: i.to_string(),
                        target: stringify!($t),
                    }),
                    other => Err(mismatch(Self::KIND, &other)),
                }
            }
        })*
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64);

/// A destination that can accept one scanned value per row.
pub trait Target {
    /// The kind this destination expects.
    fn kind(&self) -> ValueKind;

    /// Store a scanned value.
    fn accept(&mut self, value: Value) -> Result<(), ScanError>;
}

/// Destination for result columns nobody asked for: accepts and drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Target for Discard {
    fn kind(&self) -> ValueKind {
        ValueKind::Any
    }

    fn accept(&mut self, _value: Value) -> Result<(), ScanError> {
        Ok(())
    }
}
