//! Canonical schemas and type coercion.
//!
//! [`enforce_schema`] coerces the columns named by a [`CanonicalSchema`] to
//! their declared [`ColumnType`]. Values that cannot be coerced become missing
//! instead of failing the run; the missingness report is where such losses
//! surface. Columns outside the schema pass through untouched.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    data::{ColumnType, Value, convert_value},
    frame::{Column, Table},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub datatype: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalSchema {
    pub columns: Vec<ColumnSpec>,
}

impl CanonicalSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Raw orders: identifiers and status as text, amount/quantity as floats,
    /// `created_at` left as text for the time parser.
    pub fn orders() -> Self {
        Self::new(vec![
            ColumnSpec::new("order_id", ColumnType::String),
            ColumnSpec::new("user_id", ColumnType::String),
            ColumnSpec::new("amount", ColumnType::Float),
            ColumnSpec::new("quantity", ColumnType::Float),
            ColumnSpec::new("created_at", ColumnType::String),
            ColumnSpec::new("status", ColumnType::String),
        ])
    }

    pub fn users() -> Self {
        Self::new(vec![
            ColumnSpec::new("user_id", ColumnType::String),
            ColumnSpec::new("country", ColumnType::String),
            ColumnSpec::new("signup_date", ColumnType::String),
        ])
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn datatype_of(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.datatype)
    }

    /// Adds or retypes a column, keeping declaration order.
    pub fn with_column(mut self, name: &str, datatype: ColumnType) -> Self {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.datatype = datatype,
            None => self.columns.push(ColumnSpec::new(name, datatype)),
        }
        self
    }
}

/// Coerces one column, returning the new column and how many present values
/// were lost to coercion failures.
pub fn coerce_column(column: &Column, datatype: ColumnType) -> (Column, usize) {
    let mut failures = 0usize;
    let values = column
        .values()
        .iter()
        .map(|value| match value {
            None => None,
            Some(value) => coerce_value(value, &datatype).or_else(|| {
                failures += 1;
                None
            }),
        })
        .collect();
    (Column::new(column.name(), datatype, values), failures)
}

fn coerce_value(value: &Value, datatype: &ColumnType) -> Option<Value> {
    match convert_value(value, datatype) {
        Ok(converted) => converted,
        Err(err) => {
            debug!("{err:#}");
            None
        }
    }
}

pub fn enforce_schema(table: &Table, schema: &CanonicalSchema) -> Table {
    for spec in &schema.columns {
        if !table.has_column(&spec.name) {
            debug!("Schema column '{}' absent from table; skipped", spec.name);
        }
    }
    table.map_columns(|column| match schema.datatype_of(column.name()) {
        Some(datatype) => {
            let (coerced, failures) = coerce_column(column, datatype);
            if failures > 0 {
                info!(
                    "Column '{}': {} value(s) could not be coerced to {} and are now missing",
                    column.name(),
                    failures,
                    datatype
                );
            }
            coerced
        }
        None => column.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_orders() -> Table {
        Table::new(vec![
            Column::from_strs("order_id", &[Some("A1"), Some("A2"), Some("A3")]),
            Column::from_strs("amount", &[Some("12.50"), Some("abc"), None]),
            Column::from_strs("quantity", &[Some("2"), Some(" 3 "), Some("x")]),
            Column::from_strs("coupon", &[Some("SPRING"), None, Some("")]),
        ])
        .unwrap()
    }

    #[test]
    fn coercion_failures_become_missing() {
        let enforced = enforce_schema(&raw_orders(), &CanonicalSchema::orders());
        let amount = enforced.column("amount").unwrap();
        assert_eq!(amount.datatype(), ColumnType::Float);
        assert_eq!(amount.get(0), Some(&Value::Float(12.5)));
        assert!(amount.is_missing(1));
        assert!(amount.is_missing(2));

        let quantity = enforced.column("quantity").unwrap();
        assert_eq!(quantity.get(1), Some(&Value::Float(3.0)));
        assert!(quantity.is_missing(2));
    }

    #[test]
    fn unknown_columns_pass_through_and_input_is_untouched() {
        let raw = raw_orders();
        let enforced = enforce_schema(&raw, &CanonicalSchema::orders());
        assert_eq!(enforced.column("coupon"), raw.column("coupon"));
        assert_eq!(enforced.column_names(), raw.column_names());
        assert_eq!(raw.column("amount").unwrap().datatype(), ColumnType::String);
    }

    #[test]
    fn coerce_column_counts_failures() {
        let column = Column::from_strs("n", &[Some("1"), Some("two"), None]);
        let (coerced, failures) = coerce_column(&column, ColumnType::Integer);
        assert_eq!(failures, 1);
        assert_eq!(coerced.get(0), Some(&Value::Integer(1)));
        assert_eq!(coerced.missing_count(), 2);
    }

    #[test]
    fn with_column_retypes_existing_entries() {
        let schema = CanonicalSchema::orders()
            .with_column("amount", ColumnType::Integer)
            .with_column("status_clean", ColumnType::String);
        assert_eq!(schema.datatype_of("amount"), Some(ColumnType::Integer));
        assert_eq!(schema.column_names().last(), Some(&"status_clean"));
    }
}
