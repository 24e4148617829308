//! Driver-agnostic result mapping and named-parameter query rewriting.
//!
//! - [`column`]: column declarations ([`Column`]) and per-row [`ColumnSet`]s
//! - [`mapper`]: the mapping engine that drives a [`Cursor`]
//! - [`query`]: `:name` templates rewritten to positional placeholders
//! - [`backend`]: cursor implementations for concrete drivers

pub mod backend;
pub mod column;
pub mod config;
pub mod error;
pub mod mapper;
pub mod query;
pub mod value;

// Re-export commonly used items
pub use column::{Column, ColumnSet, Slot};
pub use config::MapperConfig;
pub use error::{BindingError, BoxError, MapError, QueryError, ScanError};
pub use mapper::{collect_column, map_result, scan_into, Cursor, EmptyResultPolicy, ResultMapper};
pub use query::{prepare, prepare_with, BoundQuery, Param, Placeholder, QueryTemplate};
pub use value::{Discard, FromValue, Target, Value, ValueKind};
