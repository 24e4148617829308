//! CozoDB backend.
//!
//! CozoDB returns whole results as `NamedRows` (headers plus rows of
//! `DataValue`); [`CozoCursor`] walks them one row at a time. Queries take
//! `$name` parameters, which [`run_cozo`] fills from [`Param`]s.

use std::collections::BTreeMap;
use std::path::Path;

use cozo::{DataValue, DbInstance, NamedRows, Num, ScriptMutability};

use crate::error::{BoxError, ScanError};
use crate::mapper::{scan_into, Cursor};
use crate::query::Param;
use crate::value::{Target, Value};

/// Open a CozoDB database backed by SQLite storage.
pub fn open_sqlite(path: &Path) -> Result<DbInstance, BoxError> {
    DbInstance::new("sqlite", path, "")
        .map_err(|e| format!("Failed to open SQLite database at {:?}: {:?}", path, e).into())
}

/// Create an in-memory database instance.
pub fn open_mem() -> Result<DbInstance, BoxError> {
    DbInstance::new("mem", "", "").map_err(|e| format!("Failed to open in-memory database: {:?}", e).into())
}

/// Run a script and wrap its result in a cursor.
///
/// Single-valued params bind as scalars, multi-valued ones as lists.
pub fn run_cozo(db: &DbInstance, script: &str, params: &[Param]) -> Result<CozoCursor, BoxError> {
    let params: BTreeMap<String, DataValue> = params
        .iter()
        .map(|p| {
            let name = p.name().trim_start_matches(':').to_string();
            let value = match p.values() {
                [single] => to_data_value(single),
                many => DataValue::List(many.iter().map(to_data_value).collect()),
            };
            (name, value)
        })
        .collect();

    let rows = db
        .run_script(script, params, ScriptMutability::Mutable)
        .map_err(|e| format!("Query failed: {:?}", e))?;
    Ok(CozoCursor::new(rows))
}

/// Cursor over a CozoDB result.
pub struct CozoCursor {
    headers: Vec<String>,
    rows: std::vec::IntoIter<Vec<DataValue>>,
    row_count: usize,
}

impl CozoCursor {
    pub fn new(named_rows: NamedRows) -> Self {
        let row_count = named_rows.rows.len();
        Self {
            headers: named_rows.headers,
            rows: named_rows.rows.into_iter(),
            row_count,
        }
    }

    /// Total rows in the result, scanned or not.
    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

impl Cursor for CozoCursor {
    fn column_names(&mut self) -> Result<Vec<String>, ScanError> {
        Ok(self.headers.clone())
    }

    fn scan(&mut self, destinations: &mut [&mut dyn Target]) -> Result<bool, ScanError> {
        let Some(row) = self.rows.next() else {
            return Ok(false);
        };
        let values = row.into_iter().map(to_value).collect::<Result<Vec<_>, _>>()?;
        scan_into(values, destinations)?;
        Ok(true)
    }

    fn has_next_row(&mut self) -> Result<bool, ScanError> {
        Ok(!self.rows.as_slice().is_empty())
    }
}

/// Convert a CozoDB value into a scanned value.
pub fn to_value(value: DataValue) -> Result<Value, ScanError> {
    match value {
        DataValue::Null => Ok(Value::Null),
        DataValue::Bool(b) => Ok(Value::Bool(b)),
        DataValue::Num(Num::Int(i)) => Ok(Value::Int(i)),
        DataValue::Num(Num::Float(f)) => Ok(Value::Float(f)),
        DataValue::Str(s) => Ok(Value::Str(s.to_string())),
        DataValue::Bytes(b) => Ok(Value::Bytes(b)),
        other => Err(ScanError::Unsupported {
            type_name: type_name(&other).to_string(),
        }),
    }
}

/// Convert a parameter value into a CozoDB value.
pub fn to_data_value(value: &Value) -> DataValue {
    match value {
        Value::Null => DataValue::Null,
        Value::Bool(b) => DataValue::Bool(*b),
        Value::Int(i) => DataValue::Num(Num::Int(*i)),
        Value::Float(f) => DataValue::Num(Num::Float(*f)),
        Value::Str(s) => DataValue::Str(s.clone().into()),
        Value::Bytes(b) => DataValue::Bytes(b.clone()),
    }
}

fn type_name(value: &DataValue) -> &'static str {
    match value {
        DataValue::Null => "null",
        DataValue::Bool(_) => "bool",
        DataValue::Num(_) => "number",
        DataValue::Str(_) => "string",
        DataValue::Bytes(_) => "bytes",
        DataValue::List(_) => "list",
        DataValue::Set(_) => "set",
        DataValue::Vec(_) => "vec",
        DataValue::Json(_) => "json",
        DataValue::Uuid(_) => "uuid",
        DataValue::Regex(_) => "regex",
        DataValue::Bot => "bot",
        DataValue::Validity(_) => "validity",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::column::{Column, ColumnSet, Slot};
    use crate::error::MapError;
    use crate::mapper::{collect_column, ResultMapper};
    use rstest::{fixture, rstest};

    #[fixture]
    fn db() -> DbInstance {
        open_mem().expect("Failed to create in-memory DB")
    }

    #[rstest]
    fn test_maps_named_rows(db: DbInstance) {
        let cursor = run_cozo(&db, "?[id, name] <- [[1, 'alice'], [2, 'bob']]", &[]).unwrap();
        assert_eq!(cursor.row_count(), 2);

        let users = RefCell::new(Vec::new());
        let rows = ResultMapper::from_cursor(cursor)
            .map(|| {
                let id = Slot::<i64>::new();
                let name = Slot::<String>::new();
                let users = &users;
                ColumnSet::new([Column::new("id").bind_to(&id), Column::new("name").bind_to(&name)])
                    .on_complete(move || {
                        users.borrow_mut().push((id.take().unwrap_or_default(), name.take().unwrap_or_default()));
                        Ok(())
                    })
            })
            .unwrap();

        assert_eq!(rows, 2);
        let mut users = users.into_inner();
        users.sort();
        assert_eq!(users, vec![(1, "alice".to_string()), (2, "bob".to_string())]);
    }

    #[rstest]
    fn test_binds_params(db: DbInstance) {
        let cursor = run_cozo(&db, "?[x] := x = $x", &[Param::new("x", 41)]).unwrap();
        let xs = RefCell::new(Vec::<i64>::new());
        ResultMapper::from_cursor(cursor)
            .map(collect_column("x", &xs))
            .unwrap();
        assert_eq!(xs.into_inner(), vec![41]);
    }

    #[rstest]
    fn test_script_error_is_no_result(db: DbInstance) {
        let result = run_cozo(&db, "?[x] := *missing_relation{x}", &[]);
        let err = crate::mapper::map_result(result)
            .map(|| ColumnSet::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, MapError::NoResult { source: Some(_) }));
    }

    #[rstest]
    fn test_unsupported_value_fails_scan(db: DbInstance) {
        let cursor = run_cozo(&db, "?[l] <- [[[1, 2]]]", &[]).unwrap();
        let err = ResultMapper::from_cursor(cursor)
            .map(|| ColumnSet::new(Vec::new()))
            .unwrap_err();
        match err {
            MapError::Scan { source: ScanError::Unsupported { type_name }, .. } => {
                assert_eq!(type_name, "list")
            }
            other => panic!("Expected unsupported value error, got {:?}", other),
        }
    }

    #[rstest]
    fn test_to_value_round_trips_scalars() {
        for value in [Value::Null, Value::Bool(true), Value::Int(-3), Value::Float(1.5), Value::from("s")] {
            assert_eq!(to_value(to_data_value(&value)), Ok(value));
        }
    }
}
