//! Column declarations and per-row column sets.
//!
//! A row mapper declares, for one logical row, which result column goes into
//! which destination:
//!
//! ```
//! use std::cell::RefCell;
//! use dbmapper::{Column, ColumnSet, Slot};
//!
//! struct User { id: i64, name: String }
//!
//! let users = RefCell::new(Vec::new());
//! let row_mapper = || {
//!     let id = Slot::<i64>::new();
//!     let name = Slot::<String>::new();
//!     let users = &users;
//!     ColumnSet::new([
//!         Column::new("id").bind_to(&id),
//!         Column::new("name").bind_to(&name),
//!     ])
//!     .on_complete(move || {
//!         users.borrow_mut().push(User {
//!             id: id.take().unwrap_or_default(),
//!             name: name.take().unwrap_or_default(),
//!         });
//!         Ok(())
//!     })
//! };
//! # let _ = row_mapper;
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{BindingError, BoxError, ScanError};
use crate::value::{FromValue, Target, Value, ValueKind};

/// Shared per-row cell a column binding writes into.
///
/// Cloning a slot shares the cell, so the binding and the completion
/// callback see the same value. A slot is created per row by the row
/// mapper factory; nothing carries over between rows.
pub struct Slot<T> {
    cell: Rc<RefCell<Option<T>>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            cell: Rc::new(RefCell::new(None)),
        }
    }

    /// Removes the scanned value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.cell.borrow_mut().take()
    }

    /// Stores a value directly, replacing any scanned one.
    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = Some(value);
    }

    /// Whether a value has been scanned into this slot.
    pub fn is_filled(&self) -> bool {
        self.cell.borrow().is_some()
    }
}

impl<T: Clone> Slot<T> {
    /// Returns a copy of the scanned value.
    pub fn get(&self) -> Option<T> {
        self.cell.borrow().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.cell.borrow()).finish()
    }
}

impl<T: FromValue> Target for Slot<T> {
    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn accept(&mut self, value: Value) -> Result<(), ScanError> {
        let decoded = T::from_value(value)?;
        self.set(decoded);
        Ok(())
    }
}

/// Binding of one result column name to a destination.
///
/// Invalid use never panics: the failure is recorded and reported through
/// [`Column::error`], and the mapping engine refuses to scan with it.
pub struct Column<'a> {
    name: String,
    target: Option<Box<dyn Target + 'a>>,
    error: Option<BindingError>,
}

impl<'a> Column<'a> {
    /// Declares an unbound column.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let error = name.is_empty().then_some(BindingError::UnnamedColumn);
        Self {
            name,
            target: None,
            error,
        }
    }

    /// Binds the column to a typed slot.
    pub fn bind_to<T: FromValue + 'a>(self, slot: &Slot<T>) -> Self {
        self.bind_target(Some(Box::new(slot.clone())))
    }

    /// Binds the column to an arbitrary destination.
    ///
    /// `None` records [`BindingError::EmptyDestination`] and leaves the
    /// column unbound.
    pub fn bind_target(mut self, target: Option<Box<dyn Target + 'a>>) -> Self {
        match target {
            Some(target) => self.target = Some(target),
            None => self.record(BindingError::EmptyDestination {
                column: self.name.clone(),
            }),
        }
        self
    }

    // The first error sticks.
    fn record(&mut self, error: BindingError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error(&self) -> Option<&BindingError> {
        self.error.as_ref()
    }

    pub fn target(&self) -> Option<&(dyn Target + 'a)> {
        self.target.as_deref()
    }

    /// Splits the borrow so the engine can key targets by name.
    pub(crate) fn parts_mut(&mut self) -> (&str, Option<&mut (dyn Target + 'a)>) {
        (&self.name, self.target.as_deref_mut())
    }
}

impl fmt::Debug for Column<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("target", &self.target.as_ref().map(|t| t.kind()))
            .field("error", &self.error)
            .finish()
    }
}

type Completion<'a> = Box<dyn FnOnce() -> Result<(), BoxError> + 'a>;

/// Column bindings for one row plus the callback run after the row is scanned.
///
/// If two bindings share a name, the last one receives the value.
pub struct ColumnSet<'a> {
    columns: Vec<Column<'a>>,
    on_complete: Completion<'a>,
}

impl<'a> ColumnSet<'a> {
    pub fn new(columns: impl IntoIterator<Item = Column<'a>>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            on_complete: Box::new(|| Ok(())),
        }
    }

    /// Replaces the completion callback. Only the last one set runs.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + 'a,
    {
        self.on_complete = Box::new(callback);
        self
    }

    /// Runs the completion callback, consuming the set.
    pub fn complete(self) -> Result<(), BoxError> {
        (self.on_complete)()
    }

    pub fn columns(&self) -> &[Column<'a>] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column<'a>] {
        &mut self.columns
    }

    /// The first binding error among the columns, in declaration order.
    pub fn binding_error(&self) -> Option<&BindingError> {
        self.columns.iter().find_map(Column::error)
    }
}

impl<'a> FromIterator<Column<'a>> for ColumnSet<'a> {
    fn from_iter<I: IntoIterator<Item = Column<'a>>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for ColumnSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSet")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}
