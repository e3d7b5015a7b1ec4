use crate::column::{Column, Value};
use serde::{Deserialize, Serialize};

/// Name of the column holding the time value of each row.
pub const TIME_COLUMN: &str = "Time";

/// Name of the integer column flagging whether a row's values can be trusted.
pub const VALID_MASK_COLUMN: &str = "ValidPointMask";

/// Name of the element-count column of statistics tables.
pub const COUNT_COLUMN: &str = "N";

/// A growable column-oriented table.
///
/// Every column always holds exactly [`Table::num_rows`] entries. Rows are
/// appended as `(column name, value)` pairs; columns the table does not have
/// yet are created on the fly and back-filled with default entries.
///
/// # Examples
///
/// ```
/// use overtime_types::column::Value;
/// use overtime_types::table::Table;
///
/// let mut table = Table::new();
/// table.append_row([("Time", Value::Float(0.0)), ("pressure", Value::Float(1.5))]);
/// table.append_row([("Time", Value::Float(1.0)), ("velocity", Value::Float(3.0))]);
///
/// assert_eq!(table.num_rows(), 2);
/// assert_eq!(table.num_columns(), 3);
/// // The first row never saw a velocity value.
/// assert!(table.value(0, "velocity").unwrap().as_f64().unwrap().is_nan());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Value of column `name` at `row`.
    pub fn value(&self, row: usize, name: &str) -> Option<Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// All `(column, value)` pairs of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<(&str, Value)> {
        if row >= self.num_rows {
            return Vec::new();
        }
        self.columns
            .iter()
            .filter_map(|c| c.get(row).map(|v| (c.name(), v)))
            .collect()
    }

    /// Append one row.
    ///
    /// Columns absent from `row` receive a default entry. When a name occurs
    /// more than once, the last value wins.
    pub fn append_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let index = self.num_rows;
        for column in &mut self.columns {
            column.push_default();
        }
        self.num_rows += 1;
        for (name, value) in row {
            self.set_value(index, name.as_ref(), value);
        }
    }

    /// Overwrite the value of column `name` at an existing `row`.
    ///
    /// A missing column is created and back-filled with defaults first.
    /// Returns `false` when `row` is out of bounds.
    pub fn set_value(&mut self, row: usize, name: &str, value: Value) -> bool {
        if row >= self.num_rows {
            return false;
        }
        match self.columns.iter_mut().find(|c| c.name() == name) {
            Some(column) => column.set(row, value),
            None => {
                let mut column = Column::filled_like(name, &value, self.num_rows);
                column.set(row, value);
                self.columns.push(column);
                true
            }
        }
    }

    /// Remove a column, returning it if it existed.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let position = self.columns.iter().position(|c| c.name() == name)?;
        Some(self.columns.remove(position))
    }
}
