//! Immutable, column-oriented in-memory tables.
//!
//! Every transform in the crate borrows a [`Table`] or [`Column`] and returns a
//! freshly built one; nothing here offers in-place mutation of a shared table.

use std::collections::HashSet;

use crate::{
    data::{ColumnType, Value},
    error::QualityError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    datatype: ColumnType,
    values: Vec<Option<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: ColumnType, values: Vec<Option<Value>>) -> Self {
        Self {
            name: name.into(),
            datatype,
            values,
        }
    }

    pub fn from_strs(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        let values = values
            .iter()
            .map(|value| value.map(|s| Value::String(s.to_string())))
            .collect();
        Self::new(name, ColumnType::String, values)
    }

    pub fn from_floats(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        let values = values.iter().map(|value| value.map(Value::Float)).collect();
        Self::new(name, ColumnType::Float, values)
    }

    pub fn from_bools(name: impl Into<String>, values: &[bool]) -> Self {
        let values = values.iter().map(|b| Some(Value::Boolean(*b))).collect();
        Self::new(name, ColumnType::Boolean, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> ColumnType {
        self.datatype
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row).and_then(|value| value.as_ref())
    }

    pub fn is_missing(&self, row: usize) -> bool {
        self.get(row).is_none()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_none()).count()
    }

    pub fn renamed(&self, name: impl Into<String>) -> Column {
        Column {
            name: name.into(),
            datatype: self.datatype,
            values: self.values.clone(),
        }
    }

    /// Numeric view of the column; errors when the column is not numeric.
    pub fn numeric_values(&self) -> Result<Vec<Option<f64>>, QualityError> {
        if !self.datatype.is_numeric() {
            return Err(QualityError::IncompatibleColumn {
                column: self.name.clone(),
                expected: "a numeric column".to_string(),
                found: self.datatype,
            });
        }
        Ok(self
            .values
            .iter()
            .map(|value| value.as_ref().and_then(Value::as_f64))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Builds a table, rejecting duplicate names and ragged columns.
    pub fn new(columns: Vec<Column>) -> Result<Self, QualityError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(QualityError::DuplicateColumn {
                    name: column.name().to_string(),
                });
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(ragged) = columns.iter().find(|c| c.len() != expected) {
                return Err(QualityError::LengthMismatch {
                    column: ragged.name().to_string(),
                    expected,
                    found: ragged.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column, QualityError> {
        self.column(name)
            .ok_or_else(|| QualityError::missing_column(name))
    }

    /// Returns a new table with `column` replacing the same-named column in
    /// place, or appended when the name is new.
    pub fn with_column(&self, column: Column) -> Result<Table, QualityError> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(QualityError::LengthMismatch {
                column: column.name().to_string(),
                expected: self.row_count(),
                found: column.len(),
            });
        }
        let mut columns = self.columns.clone();
        match self.column_index(column.name()) {
            Some(idx) => columns[idx] = column,
            None => columns.push(column),
        }
        Ok(Table { columns })
    }

    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Table, QualityError> {
        columns
            .into_iter()
            .try_fold(self.clone(), |table, column| table.with_column(column))
    }

    /// Rebuilds every column through `f`, which must keep names and lengths.
    pub(crate) fn map_columns<F>(&self, f: F) -> Table
    where
        F: FnMut(&Column) -> Column,
    {
        let columns = self.columns.iter().map(f).collect::<Vec<_>>();
        debug_assert!(columns.iter().all(|c| c.len() == self.row_count()));
        Table { columns }
    }

    pub fn row(&self, idx: usize) -> Vec<Option<&Value>> {
        self.columns.iter().map(|column| column.get(idx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::from_strs("id", &[Some("1"), Some("2")]),
            Column::from_floats("amount", &[Some(1.5), None]),
        ])
        .unwrap()
    }

    #[test]
    fn new_rejects_duplicate_and_ragged_columns() {
        let dup = Table::new(vec![
            Column::from_strs("id", &[Some("1")]),
            Column::from_strs("id", &[Some("2")]),
        ]);
        assert!(matches!(dup, Err(QualityError::DuplicateColumn { .. })));

        let ragged = Table::new(vec![
            Column::from_strs("id", &[Some("1")]),
            Column::from_strs("name", &[Some("a"), Some("b")]),
        ]);
        assert!(matches!(
            ragged,
            Err(QualityError::LengthMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn with_column_replaces_in_place_and_leaves_source_untouched() {
        let table = sample();
        let replaced = table
            .with_column(Column::from_floats("amount", &[Some(2.0), Some(3.0)]))
            .unwrap();
        assert_eq!(replaced.column_names(), vec!["id", "amount"]);
        assert_eq!(replaced.column("amount").unwrap().missing_count(), 0);
        assert_eq!(table.column("amount").unwrap().missing_count(), 1);

        let appended = table
            .with_column(Column::from_bools("flag", &[true, false]))
            .unwrap();
        assert_eq!(appended.column_names(), vec!["id", "amount", "flag"]);
    }

    #[test]
    fn numeric_values_rejects_text_columns() {
        let table = sample();
        assert!(table.column("id").unwrap().numeric_values().is_err());
        assert_eq!(
            table.column("amount").unwrap().numeric_values().unwrap(),
            vec![Some(1.5), None]
        );
    }
}
