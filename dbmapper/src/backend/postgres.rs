//! PostgreSQL backend.
//!
//! Queries are rewritten with [`Placeholder::Dollar`](crate::Placeholder::Dollar)
//! and executed through the synchronous `postgres` client. [`Value`]
//! implements `ToSql`, converting integers and floats to the width the
//! server asks for.

use std::error::Error;

use bytes::BytesMut;
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use postgres::{Client, Row};

use crate::error::{BoxError, ScanError};
use crate::mapper::{scan_into, Cursor};
use crate::query::BoundQuery;
use crate::value::{Target, Value};

/// Prepare and run a bound query, returning a cursor over its rows.
///
/// An invalid query is returned as the error, so it ends up as
/// [`MapError::NoResult`](crate::MapError::NoResult) when passed through
/// [`map_result`](crate::map_result).
pub fn query_pg(client: &mut Client, query: &BoundQuery) -> Result<PgCursor, BoxError> {
    if let Some(err) = query.error() {
        return Err(err.clone().into());
    }
    let statement = client.prepare(query.sql())?;
    let columns = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let params: Vec<&(dyn ToSql + Sync)> = query
        .params()
        .iter()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect();
    let rows = client.query(&statement, &params)?;
    Ok(PgCursor::new(columns, rows))
}

/// Cursor over the rows of one PostgreSQL query.
pub struct PgCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    row_count: usize,
}

impl PgCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows: rows.into_iter(),
            row_count,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

impl Cursor for PgCursor {
    fn column_names(&mut self) -> Result<Vec<String>, ScanError> {
        Ok(self.columns.clone())
    }

    fn scan(&mut self, destinations: &mut [&mut dyn Target]) -> Result<bool, ScanError> {
        let Some(row) = self.rows.next() else {
            return Ok(false);
        };
        let values = (0..row.len())
            .map(|index| column_value(&row, index))
            .collect::<Result<Vec<_>, _>>()?;
        scan_into(values, destinations)?;
        Ok(true)
    }

    fn has_next_row(&mut self) -> Result<bool, ScanError> {
        Ok(!self.rows.as_slice().is_empty())
    }
}

fn driver_error(e: postgres::Error) -> ScanError {
    ScanError::Driver(e.to_string())
}

/// Decode one column according to its server-side type.
fn column_value(row: &Row, index: usize) -> Result<Value, ScanError> {
    let ty = row.columns()[index].type_();
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index).map_err(driver_error)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index).map_err(driver_error)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index).map_err(driver_error)?.map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index).map_err(driver_error)?.map(Value::Int)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(index).map_err(driver_error)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index).map_err(driver_error)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index).map_err(driver_error)?.map(Value::Float)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        row.try_get::<_, Option<String>>(index).map_err(driver_error)?.map(Value::Str)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(index).map_err(driver_error)?.map(Value::Bytes)
    } else {
        return Err(ScanError::Unsupported {
            type_name: ty.name().to_string(),
        });
    };
    Ok(value.unwrap_or(Value::Null))
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) if *ty == Type::INT2 => i16::try_from(*i)?.to_sql_checked(ty, out),
            Value::Int(i) if *ty == Type::INT4 => i32::try_from(*i)?.to_sql_checked(ty, out),
            Value::Int(i) => i.to_sql_checked(ty, out),
            Value::Float(f) if *ty == Type::FLOAT4 => (*f as f32).to_sql_checked(ty, out),
            Value::Float(f) => f.to_sql_checked(ty, out),
            Value::Str(s) => s.to_sql_checked(ty, out),
            Value::Bytes(b) => b.to_sql_checked(ty, out),
        }
    }

    // Type checks happen per variant in to_sql.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
