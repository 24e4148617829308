//! In-memory cursor over rows built in code.
//!
//! Stands in for a driver in tests and for results that were materialized
//! elsewhere (e.g. decoded from JSON).

use crate::error::ScanError;
use crate::mapper::{scan_into, Cursor};
use crate::value::{Target, Value};

/// Cursor over a fixed list of rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: usize,
}

impl MemoryCursor {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            position: 0,
        }
    }

    /// Appends a row. Rows with the wrong number of values fail at scan time.
    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.rows.push(values.into_iter().collect());
        self
    }

    pub fn with_rows(mut self, rows: Vec<Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Number of rows already scanned.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for MemoryCursor {
    fn column_names(&mut self) -> Result<Vec<String>, ScanError> {
        Ok(self.columns.clone())
    }

    fn scan(&mut self, destinations: &mut [&mut dyn Target]) -> Result<bool, ScanError> {
        let Some(values) = self.rows.get(self.position) else {
            return Ok(false);
        };
        let values = values.clone();
        self.position += 1;
        scan_into(values, destinations)?;
        Ok(true)
    }

    fn has_next_row(&mut self) -> Result<bool, ScanError> {
        Ok(self.position < self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Discard;
    use rstest::rstest;

    #[rstest]
    fn test_scan_advances_until_exhausted() {
        let mut cursor = MemoryCursor::new(["id"]).row([Value::Int(1)]);
        let mut discard = Discard;
        let target: &mut dyn Target = &mut discard;
        let mut destinations = [target];

        assert_eq!(cursor.has_next_row(), Ok(true));
        assert_eq!(cursor.scan(&mut destinations), Ok(true));
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.has_next_row(), Ok(false));
        assert_eq!(cursor.scan(&mut destinations), Ok(false));
        assert_eq!(cursor.position(), 1);
    }

    #[rstest]
    fn test_short_row_is_column_count_error() {
        let mut cursor = MemoryCursor::new(["id", "name"]).row([Value::Int(1)]);
        let (mut a, mut b) = (Discard, Discard);
        let mut destinations: [&mut dyn Target; 2] = [&mut a, &mut b];

        assert_eq!(
            cursor.scan(&mut destinations),
            Err(ScanError::ColumnCount { expected: 2, found: 1 })
        );
    }

    #[rstest]
    fn test_with_rows_and_row_count() {
        let cursor = MemoryCursor::new(["a"])
            .with_rows(vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
        assert_eq!(cursor.row_count(), 2);
        assert_eq!(cursor.clone().column_names().unwrap(), vec!["a".to_string()]);
    }
}
