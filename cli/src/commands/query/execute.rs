use std::cell::RefCell;
use std::collections::HashSet;
use std::error::Error;

use serde::Serialize;

use super::QueryCmd;
use crate::commands::Execute;
use crate::config::{ConfigFile, DatabaseConfigFile};
use dbmapper::{
    map_result, BoxError, Column, ColumnSet, Cursor, MapError, MapperConfig, Param, Slot, Value,
};

/// Rows mapped from one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Execute for QueryCmd {
    type Output = QueryResult;

    fn execute(self, config: &ConfigFile) -> Result<Self::Output, Box<dyn Error>> {
        let database = match self.db {
            Some(path) => DatabaseConfigFile::Sqlite { path },
            None => config.database.clone(),
        };

        let (columns, rows) =
            run_query(&database, &self.script, &self.params, &self.columns, &config.mapper)
                .map_err(|e| e as Box<dyn Error>)?;

        Ok(QueryResult {
            query: self.script,
            columns,
            rows,
        })
    }
}

type MappedRows = (Vec<String>, Vec<Vec<Value>>);

fn run_query(
    database: &DatabaseConfigFile,
    script: &str,
    params: &[Param],
    columns: &[String],
    mapper: &MapperConfig,
) -> Result<MappedRows, BoxError> {
    match database {
        #[cfg(feature = "backend-cozo")]
        DatabaseConfigFile::Mem => {
            let db = dbmapper::backend::cozo::open_mem()?;
            map_rows(dbmapper::backend::cozo::run_cozo(&db, script, params), columns, mapper)
        }
        #[cfg(feature = "backend-cozo")]
        DatabaseConfigFile::Sqlite { path } => {
            let db = dbmapper::backend::cozo::open_sqlite(path)?;
            map_rows(dbmapper::backend::cozo::run_cozo(&db, script, params), columns, mapper)
        }
        #[cfg(feature = "backend-postgres")]
        DatabaseConfigFile::Postgres { connection_string } => {
            let mut client = postgres::Client::connect(connection_string, postgres::NoTls)?;
            let query = dbmapper::prepare_with(script, dbmapper::Placeholder::Dollar)
                .with(params.iter().cloned());
            map_rows(dbmapper::backend::postgres::query_pg(&mut client, &query), columns, mapper)
        }
        #[allow(unreachable_patterns)]
        other => Err(format!("dbmapper was built without support for {:?} databases", other).into()),
    }
}

/// Map the selected columns of every row as raw values.
///
/// Selected columns absent from the result come back as NULL; result
/// columns not selected are discarded. Repeated names are mapped once.
fn map_rows<C: Cursor>(
    mut result: Result<C, BoxError>,
    columns: &[String],
    config: &MapperConfig,
) -> Result<MappedRows, BoxError> {
    let mut selected = match (&mut result, columns.is_empty()) {
        (Ok(cursor), true) => cursor.column_names()?,
        _ => columns.to_vec(),
    };
    // one output column per name
    let mut seen = HashSet::new();
    selected.retain(|name| seen.insert(name.clone()));

    let rows: RefCell<Vec<Vec<Value>>> = RefCell::new(Vec::new());
    let count = map_result(result)
        .with_config(config)
        .map(|| {
            let slots: Vec<Slot<Value>> = selected.iter().map(|_| Slot::new()).collect();
            let rows = &rows;
            ColumnSet::new(
                selected
                    .iter()
                    .zip(&slots)
                    .map(|(name, slot)| Column::new(name.as_str()).bind_to(slot)),
            )
            .on_complete(move || {
                let row: Vec<Value> = slots.iter().map(|s| s.take().unwrap_or(Value::Null)).collect();
                rows.borrow_mut().push(row);
                Ok(())
            })
        })
        .map_err(|e| -> BoxError {
            match e {
                MapError::NoResult { source: Some(cause) } => format!("no result from query: {}", cause).into(),
                other => other.into(),
            }
        })?;

    tracing::debug!(rows = count, columns = selected.len(), "query mapped");
    Ok((selected, rows.into_inner()))
}
