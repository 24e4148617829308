//! The mapping engine: drives a [`Cursor`] and routes each column value into
//! the destination a row mapper declared for it.
//!
//! # Resolution rules
//!
//! - Destinations are built per row, in the order the cursor reports its
//!   columns. A column without a binding gets a [`Discard`] destination, so the
//!   destination list is always exactly as long as the column list.
//! - A binding whose name never appears in the result is not an error; its
//!   slot simply stays empty.
//! - If the cursor repeats a column name, the first occurrence is delivered
//!   and later ones are discarded.
//! - A binding error on any row aborts the whole call before that row is
//!   scanned. Rows completed earlier stay wherever their callbacks put them.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::column::{Column, ColumnSet, Slot};
use crate::config::MapperConfig;
use crate::error::{BoxError, MapError, ScanError};
use crate::value::{Discard, FromValue, Target, Value};

/// Sequential result-set reader implemented once per driver.
pub trait Cursor {
    /// Column names of the current result, in driver order.
    fn column_names(&mut self) -> Result<Vec<String>, ScanError>;

    /// Writes the next row into `destinations`, aligned with
    /// [`column_names`](Cursor::column_names). Returns `false` once no rows
    /// remain.
    fn scan(&mut self, destinations: &mut [&mut dyn Target]) -> Result<bool, ScanError>;

    /// Whether another row remains to be scanned.
    ///
    /// Checked before each row's column set is built. A cursor that can only
    /// find the end by scanning keeps the default `true`; the row mapper is
    /// then built one extra time for the final, empty scan.
    fn has_next_row(&mut self) -> Result<bool, ScanError> {
        Ok(true)
    }
}

impl<C: Cursor + ?Sized> Cursor for &mut C {
    fn column_names(&mut self) -> Result<Vec<String>, ScanError> {
        (**self).column_names()
    }

    fn scan(&mut self, destinations: &mut [&mut dyn Target]) -> Result<bool, ScanError> {
        (**self).scan(destinations)
    }

    fn has_next_row(&mut self) -> Result<bool, ScanError> {
        (**self).has_next_row()
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    fn column_names(&mut self) -> Result<Vec<String>, ScanError> {
        (**self).column_names()
    }

    fn scan(&mut self, destinations: &mut [&mut dyn Target]) -> Result<bool, ScanError> {
        (**self).scan(destinations)
    }

    fn has_next_row(&mut self) -> Result<bool, ScanError> {
        (**self).has_next_row()
    }
}

/// Assigns one row of driver values to destinations, positionally.
///
/// Adapters call this from [`Cursor::scan`] after converting the driver's
/// row into [`Value`]s.
pub fn scan_into(values: Vec<Value>, destinations: &mut [&mut dyn Target]) -> Result<(), ScanError> {
    if values.len() != destinations.len() {
        return Err(ScanError::ColumnCount {
            expected: destinations.len(),
            found: values.len(),
        });
    }
    for (index, (value, target)) in values.into_iter().zip(destinations.iter_mut()).enumerate() {
        target.accept(value).map_err(|e| e.at_column(index))?;
    }
    Ok(())
}

/// What a mapping call returns when the cursor yields no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultPolicy {
    /// Zero rows is an empty, successful result.
    #[default]
    Succeed,
    /// Zero rows fails with [`MapError::NoRows`].
    Error,
}

/// Binds a cursor (or the error that prevented getting one) to the engine.
pub struct ResultMapper<C> {
    cursor: Option<C>,
    upstream: Option<BoxError>,
    empty_result: EmptyResultPolicy,
}

/// Wraps the outcome of running a query.
///
/// ```ignore
/// map_result(client.query(sql, &params).map(PgCursor::new)).map(row_mapper)?;
/// ```
pub fn map_result<C, E>(result: Result<C, E>) -> ResultMapper<C>
where
    C: Cursor,
    E: Into<BoxError>,
{
    match result {
        Ok(cursor) => ResultMapper::from_cursor(cursor),
        Err(e) => ResultMapper {
            cursor: None,
            upstream: Some(e.into()),
            empty_result: EmptyResultPolicy::default(),
        },
    }
}

impl<C: Cursor> ResultMapper<C> {
    pub fn from_cursor(cursor: C) -> Self {
        Self::from_option(Some(cursor))
    }

    /// A missing cursor makes every [`map`](Self::map) call fail with
    /// [`MapError::NoResult`].
    pub fn from_option(cursor: Option<C>) -> Self {
        Self {
            cursor,
            upstream: None,
            empty_result: EmptyResultPolicy::default(),
        }
    }

    pub fn with_empty_result(mut self, policy: EmptyResultPolicy) -> Self {
        self.empty_result = policy;
        self
    }

    pub fn with_config(self, config: &MapperConfig) -> Self {
        self.with_empty_result(config.empty_result)
    }

    pub fn cursor(&self) -> Option<&C> {
        self.cursor.as_ref()
    }

    /// Gives the cursor back, e.g. to close it.
    pub fn into_cursor(self) -> Option<C> {
        self.cursor
    }

    /// Maps every remaining row, returning how many rows completed.
    ///
    /// `row_mapper` must return fresh destinations on every call. It is
    /// called exactly once per row when the cursor implements
    /// [`Cursor::has_next_row`], as every bundled adapter does. Otherwise it
    /// is called once more than there are rows: the last column set only
    /// observes the end of the result, and its callback never runs.
    pub fn map<'a, F>(&mut self, mut row_mapper: F) -> Result<usize, MapError>
    where
        F: FnMut() -> ColumnSet<'a>,
    {
        if let Some(source) = self.upstream.take() {
            warn!(error = %source, "query failed before mapping");
            return Err(MapError::NoResult {
                source: Some(source),
            });
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(MapError::NoResult { source: None });
        };

        let mut rows = 0;
        loop {
            let row = rows + 1;
            let more = cursor.has_next_row().map_err(|source| {
                warn!(row, error = %source, "scan failed");
                MapError::Scan { row, source }
            })?;
            if !more {
                break;
            }

            let mut set = row_mapper();
            if let Some(err) = set.binding_error() {
                warn!(row, error = %err, "invalid column binding");
                return Err(MapError::Binding(err.clone()));
            }

            let more = scan_row(cursor, set.columns_mut()).map_err(|source| {
                warn!(row, error = %source, "scan failed");
                MapError::Scan { row, source }
            })?;
            if !more {
                break;
            }

            set.complete().map_err(|source| {
                warn!(row, error = %source, "row rejected");
                MapError::RowCallback { row, source }
            })?;
            rows = row;
        }

        debug!(rows, "mapped result set");
        if rows == 0 && self.empty_result == EmptyResultPolicy::Error {
            return Err(MapError::NoRows);
        }
        Ok(rows)
    }
}

fn scan_row<C: Cursor + ?Sized>(cursor: &mut C, columns: &mut [Column<'_>]) -> Result<bool, ScanError> {
    let names = cursor.column_names()?;

    let mut by_name: HashMap<&str, &mut dyn Target> = HashMap::with_capacity(columns.len());
    for column in columns.iter_mut() {
        if let (name, Some(target)) = column.parts_mut() {
            // last binding for a name wins
            by_name.insert(name, target);
        }
    }

    let mut discards = vec![Discard; names.len()];
    let mut destinations: Vec<&mut dyn Target> = Vec::with_capacity(names.len());
    for (name, discard) in names.iter().zip(discards.iter_mut()) {
        let target: &mut dyn Target = match by_name.remove(name.as_str()) {
            Some(target) => target,
            None => discard,
        };
        destinations.push(target);
    }

    cursor.scan(&mut destinations)
}

/// Row mapper that collects a single column into `out`.
///
/// Every row must carry the column; a row without it is rejected with
/// [`MapError::RowCallback`].
pub fn collect_column<'a, T>(
    name: impl Into<String>,
    out: &'a RefCell<Vec<T>>,
) -> impl FnMut() -> ColumnSet<'a>
where
    T: FromValue + 'a,
{
    let name = name.into();
    move || {
        let slot = Slot::<T>::new();
        let column = name.clone();
        ColumnSet::new([Column::new(name.clone()).bind_to(&slot)]).on_complete(move || {
            let value = slot
                .take()
                .ok_or_else(|| format!("column {} missing from result", column))?;
            out.borrow_mut().push(value);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryCursor;
    use crate::error::BindingError;
    use rstest::{fixture, rstest};

    #[derive(Debug, Clone, PartialEq, Default)]
    struct User {
        id: i64,
        name: String,
        active: bool,
        opt_string: Option<String>,
    }

    #[fixture]
    fn users_cursor() -> MemoryCursor {
        MemoryCursor::new(["id", "name", "active", "opt_string"])
            .row([Value::Int(1), "alice".into(), true.into(), Value::Null])
            .row([Value::Int(2), "bob".into(), true.into(), "11111111".into()])
            .row([Value::Int(3), "charlie".into(), false.into(), Value::Null])
    }

    fn user_mapper<'a>(users: &'a RefCell<Vec<User>>) -> impl FnMut() -> ColumnSet<'a> {
        move || {
            let id = Slot::<i64>::new();
            let name = Slot::<String>::new();
            let active = Slot::<bool>::new();
            let opt_string = Slot::<Option<String>>::new();
            ColumnSet::new([
                Column::new("id").bind_to(&id),
                Column::new("name").bind_to(&name),
                Column::new("active").bind_to(&active),
                Column::new("opt_string").bind_to(&opt_string),
            ])
            .on_complete(move || {
                users.borrow_mut().push(User {
                    id: id.take().unwrap_or_default(),
                    name: name.take().unwrap_or_default(),
                    active: active.take().unwrap_or_default(),
                    opt_string: opt_string.take().flatten(),
                });
                Ok(())
            })
        }
    }

    #[rstest]
    fn test_map_populates_rows_in_cursor_order(users_cursor: MemoryCursor) {
        let users = RefCell::new(Vec::new());
        let rows = ResultMapper::from_cursor(users_cursor)
            .map(user_mapper(&users))
            .unwrap();

        let users = users.into_inner();
        assert_eq!(rows, 3);
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].name, "alice");
        assert_eq!(users[1].opt_string.as_deref(), Some("11111111"));
        assert_eq!(users[2], User {
            id: 3,
            name: "charlie".to_string(),
            active: false,
            opt_string: None,
        });
    }

    #[rstest]
    fn test_extra_columns_are_discarded() {
        let cursor = MemoryCursor::new(["id", "country", "name"])
            .row([Value::Int(7), "NL".into(), "dana".into()]);
        let ids = RefCell::new(Vec::new());
        let names = RefCell::new(Vec::new());

        let rows = ResultMapper::from_cursor(cursor)
            .map(|| {
                let id = Slot::<i64>::new();
                let name = Slot::<String>::new();
                let (ids, names) = (&ids, &names);
                ColumnSet::new([Column::new("id").bind_to(&id), Column::new("name").bind_to(&name)])
                    .on_complete(move || {
                        ids.borrow_mut().extend(id.take());
                        names.borrow_mut().extend(name.take());
                        Ok(())
                    })
            })
            .unwrap();

        assert_eq!(rows, 1);
        assert_eq!(ids.into_inner(), vec![7]);
        assert_eq!(names.into_inner(), vec!["dana".to_string()]);
    }

    #[rstest]
    fn test_binding_absent_from_result_stays_empty() {
        let cursor = MemoryCursor::new(["id"]).row([Value::Int(1)]);
        let seen = RefCell::new(Vec::new());

        ResultMapper::from_cursor(cursor)
            .map(|| {
                let id = Slot::<i64>::new();
                let email = Slot::<String>::new();
                let seen = &seen;
                ColumnSet::new([Column::new("id").bind_to(&id), Column::new("email").bind_to(&email)])
                    .on_complete(move || {
                        seen.borrow_mut().push((id.take(), email.take()));
                        Ok(())
                    })
            })
            .unwrap();

        assert_eq!(seen.into_inner(), vec![(Some(1), None)]);
    }

    #[rstest]
    fn test_binding_error_fails_before_any_scan(users_cursor: MemoryCursor) {
        let completed = RefCell::new(0);
        let mut mapper = ResultMapper::from_cursor(users_cursor);

        let err = mapper
            .map(|| {
                ColumnSet::new([Column::new("id").bind_target(None)]).on_complete(|| {
                    *completed.borrow_mut() += 1;
                    Ok(())
                })
            })
            .unwrap_err();

        assert!(matches!(
            err,
            MapError::Binding(BindingError::EmptyDestination { ref column }) if column == "id"
        ));
        assert_eq!(*completed.borrow(), 0);
        assert_eq!(mapper.cursor().map(MemoryCursor::position), Some(0));
    }

    /// Cursor that only finds the end of the result by scanning.
    struct ScanOnly(MemoryCursor);

    impl Cursor for ScanOnly {
        fn column_names(&mut self) -> Result<Vec<String>, ScanError> {
            self.0.column_names()
        }

        fn scan(&mut self, destinations: &mut [&mut dyn Target]) -> Result<bool, ScanError> {
            self.0.scan(destinations)
        }
    }

    fn id_rows(n: i64) -> MemoryCursor {
        (1..=n).fold(MemoryCursor::new(["id"]), |cursor, id| cursor.row([Value::Int(id)]))
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    fn test_row_mapper_built_once_per_row(#[case] n: i64) {
        let mut calls = 0;
        let rows = ResultMapper::from_cursor(id_rows(n))
            .map(|| {
                calls += 1;
                ColumnSet::new(Vec::new())
            })
            .unwrap();

        assert_eq!(rows, n as usize);
        assert_eq!(calls, n as usize);
    }

    #[rstest]
    fn test_scan_only_cursor_builds_one_extra_row_mapper() {
        let mut calls = 0;
        let ids = RefCell::new(Vec::<i64>::new());
        let mut collect = collect_column("id", &ids);
        let rows = ResultMapper::from_cursor(ScanOnly(id_rows(2)))
            .map(|| {
                calls += 1;
                collect()
            })
            .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(calls, 3);
        assert_eq!(*ids.borrow(), vec![1, 2]);
    }

    #[rstest]
    fn test_upstream_error_is_no_result() {
        let mut mapper = map_result::<MemoryCursor, _>(Err("connection refused"));
        let mut calls = 0;
        let err = mapper
            .map(|| {
                calls += 1;
                ColumnSet::new(Vec::new())
            })
            .unwrap_err();

        assert!(matches!(err, MapError::NoResult { source: Some(_) }));
        assert_eq!(calls, 0);
    }

    #[rstest]
    fn test_missing_cursor_is_no_result() {
        let err = ResultMapper::<MemoryCursor>::from_option(None)
            .map(|| ColumnSet::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, MapError::NoResult { source: None }));
    }

    #[rstest]
    fn test_zero_rows_succeeds_without_callback() {
        let cursor = MemoryCursor::new(["id"]);
        let completed = RefCell::new(0);
        let rows = ResultMapper::from_cursor(cursor)
            .map(|| {
                ColumnSet::new(Vec::new()).on_complete(|| {
                    *completed.borrow_mut() += 1;
                    Ok(())
                })
            })
            .unwrap();

        assert_eq!(rows, 0);
        assert_eq!(*completed.borrow(), 0);
    }

    #[rstest]
    fn test_zero_rows_with_error_policy() {
        let err = ResultMapper::from_cursor(MemoryCursor::new(["id"]))
            .with_empty_result(EmptyResultPolicy::Error)
            .map(|| ColumnSet::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, MapError::NoRows));
    }

    #[rstest]
    fn test_row_callback_failure_keeps_earlier_rows(users_cursor: MemoryCursor) {
        let names = RefCell::new(Vec::new());
        let err = ResultMapper::from_cursor(users_cursor)
            .map(|| {
                let name = Slot::<String>::new();
                let names = &names;
                ColumnSet::new([Column::new("name").bind_to(&name)]).on_complete(move || {
                    let name = name.take().unwrap_or_default();
                    if name == "bob" {
                        return Err("bob is not allowed".into());
                    }
                    names.borrow_mut().push(name);
                    Ok(())
                })
            })
            .unwrap_err();

        assert!(matches!(err, MapError::RowCallback { row: 2, .. }));
        assert_eq!(names.into_inner(), vec!["alice".to_string()]);
    }

    #[rstest]
    fn test_scan_failure_aborts_mapping() {
        let cursor = MemoryCursor::new(["id"])
            .row([Value::Int(1)])
            .row([Value::from("not a number")]);
        let ids = RefCell::new(Vec::<i64>::new());

        let err = ResultMapper::from_cursor(cursor)
            .map(collect_column("id", &ids))
            .unwrap_err();

        match err {
            MapError::Scan { row, source } => {
                assert_eq!(row, 2);
                assert!(matches!(source, ScanError::TypeMismatch { column: 0, .. }));
            }
            other => panic!("Expected scan error, got {:?}", other),
        }
        assert_eq!(ids.into_inner(), vec![1]);
    }

    #[rstest]
    fn test_collect_column() {
        let cursor = MemoryCursor::new(["id"])
            .row([Value::Int(1)])
            .row([Value::Int(2)])
            .row([Value::Int(3)]);
        let ids = RefCell::new(Vec::<i32>::new());

        let rows = ResultMapper::from_cursor(cursor)
            .map(collect_column("id", &ids))
            .unwrap();

        assert_eq!(rows, 3);
        assert_eq!(ids.into_inner(), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_collect_column_rejects_row_without_column() {
        let cursor = MemoryCursor::new(["name"]).row(["alice".into()]);
        let ids = RefCell::new(Vec::<i32>::new());

        let err = ResultMapper::from_cursor(cursor)
            .map(collect_column("id", &ids))
            .unwrap_err();

        assert!(matches!(err, MapError::RowCallback { row: 1, .. }));
    }

    #[rstest]
    fn test_duplicate_binding_last_wins() {
        let cursor = MemoryCursor::new(["id"]).row([Value::Int(5)]);
        let first = Slot::<i64>::new();
        let second = Slot::<i64>::new();

        ResultMapper::from_cursor(cursor)
            .map(|| {
                ColumnSet::new([
                    Column::new("id").bind_to(&first),
                    Column::new("id").bind_to(&second),
                ])
            })
            .unwrap();

        assert_eq!(first.get(), None);
        assert_eq!(second.get(), Some(5));
    }

    #[rstest]
    fn test_duplicate_cursor_column_first_wins() {
        let cursor = MemoryCursor::new(["id", "id"]).row([Value::Int(1), Value::Int(2)]);
        let ids = RefCell::new(Vec::<i64>::new());

        ResultMapper::from_cursor(cursor)
            .map(collect_column("id", &ids))
            .unwrap();

        assert_eq!(ids.into_inner(), vec![1]);
    }

    #[rstest]
    fn test_scan_into_checks_length() {
        let mut discard = Discard;
        let target: &mut dyn Target = &mut discard;
        let mut destinations = vec![target];
        let err = scan_into(vec![Value::Int(1), Value::Int(2)], &mut destinations).unwrap_err();
        assert_eq!(err, ScanError::ColumnCount { expected: 1, found: 2 });
    }

    #[rstest]
    fn test_map_through_borrowed_cursor(users_cursor: MemoryCursor) {
        let mut cursor = users_cursor;
        let users = RefCell::new(Vec::new());
        ResultMapper::from_cursor(&mut cursor)
            .map(user_mapper(&users))
            .unwrap();
        assert_eq!(cursor.position(), 3);
    }
}
