//! Error types for column binding, row mapping and query rewriting.
//!
//! Errors are captured on the object that produced them (a [`Column`](crate::Column),
//! a [`QueryTemplate`](crate::QueryTemplate)) and surface the next time that
//! object is used somewhere that can report failure.

use std::error::Error;

use thiserror::Error;

use crate::value::ValueKind;

/// Boxed error returned by row completion callbacks and drivers.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Invalid column declaration, recorded at bind time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("cannot bind column {column} to an empty destination")]
    EmptyDestination { column: String },

    #[error("cannot bind an unnamed column")]
    UnnamedColumn,
}

/// Failure decoding one scanned value or one row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("column {column}: value {value} out of range for {target}")]
    OutOfRange {
        column: usize,
        value: String,
        target: &'static str,
    },

    #[error("column {column}: unexpected NULL for non-optional {expected}")]
    UnexpectedNull { column: usize, expected: ValueKind },

    #[error("row has {found} values but {expected} destinations were supplied")]
    ColumnCount { expected: usize, found: usize },

    #[error("unsupported driver value of type '{type_name}'")]
    Unsupported { type_name: String },

    #[error("driver error: {0}")]
    Driver(String),
}

impl ScanError {
    /// Re-anchor a value-level error onto the column it was scanned from.
    pub(crate) fn at_column(self, index: usize) -> Self {
        match self {
            Self::TypeMismatch { expected, found, .. } => Self::TypeMismatch {
                column: index,
                expected,
                found,
            },
            Self::OutOfRange { value, target, .. } => Self::OutOfRange {
                column: index,
                value,
                target,
            },
            Self::UnexpectedNull { expected, .. } => Self::UnexpectedNull {
                column: index,
                expected,
            },
            other => other,
        }
    }
}

/// Error returned by [`ResultMapper::map`](crate::ResultMapper::map).
#[derive(Error, Debug)]
pub enum MapError {
    #[error("no result from query")]
    NoResult {
        #[source]
        source: Option<BoxError>,
    },

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("failed to scan row {row}: {source}")]
    Scan {
        row: usize,
        #[source]
        source: ScanError,
    },

    #[error("row {row} rejected: {source}")]
    RowCallback {
        row: usize,
        #[source]
        source: BoxError,
    },

    #[error("query returned no rows")]
    NoRows,
}

/// Error recorded on a query template while preparing or binding it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("missing parameters: {}", names.join(", "))]
    MissingParameters { names: Vec<String> },

    #[error("parameter {name} has no values")]
    EmptyParameter { name: String },

    #[error("malformed query template at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: String },
}
