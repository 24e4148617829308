//! Cursor implementations for concrete drivers.
//!
//! Each backend converts its driver's rows into [`Value`](crate::Value)s and
//! hands them to [`scan_into`](crate::scan_into); the mapping engine itself
//! never sees driver types.
//!
//! - `memory`: rows built in code (always available)
//! - `cozo`: CozoDB `NamedRows` (feature `backend-cozo`)
//! - `postgres`: PostgreSQL rows (feature `backend-postgres`)

pub mod memory;

#[cfg(feature = "backend-cozo")]
pub mod cozo;

#[cfg(feature = "backend-postgres")]
pub mod postgres;
