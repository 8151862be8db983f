//! Structural and statistical assertions over tables.
//!
//! Gates never filter or rewrite their input; they either return `Ok(())` or a
//! [`QualityError`] describing every offending column or value they found.

use std::collections::HashSet;

use log::debug;

use crate::{
    error::QualityError,
    frame::{Column, Table},
};

/// Number of offending row indices carried by a range violation.
pub const RANGE_SAMPLE_LIMIT: usize = 5;

/// Hashable key of one row: the display form of each key cell, `None` when missing.
pub(crate) type RowKey = Vec<Option<String>>;

pub fn require_columns<S: AsRef<str>>(table: &Table, names: &[S]) -> Result<(), QualityError> {
    let missing = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !table.has_column(name))
        .map(str::to_string)
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(QualityError::MissingColumns { missing })
    }
}

pub fn assert_non_empty(table: &Table, label: &str) -> Result<(), QualityError> {
    if table.row_count() == 0 {
        return Err(QualityError::EmptyDataset {
            label: label.to_string(),
        });
    }
    debug!("{label}: {} row(s)", table.row_count());
    Ok(())
}

pub fn assert_unique_key<S: AsRef<str>>(table: &Table, key: &[S]) -> Result<(), QualityError> {
    let columns = key_columns(table, key)?;
    let duplicates = count_duplicate_keys(&columns, table.row_count());
    if duplicates > 0 {
        return Err(QualityError::Uniqueness {
            key: key.iter().map(|k| k.as_ref().to_string()).collect(),
            duplicates,
        });
    }
    Ok(())
}

/// Checks that every non-missing value lies in `[lo, hi]`. Either bound may be
/// omitted; missing cells are exempt.
pub fn assert_in_range(
    column: &Column,
    lo: Option<f64>,
    hi: Option<f64>,
    name: &str,
) -> Result<(), QualityError> {
    let values = column.numeric_values()?;
    let offending = values
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| value.map(|v| (idx, v)))
        .filter(|(_, v)| lo.is_some_and(|lo| *v < lo) || hi.is_some_and(|hi| *v > hi))
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    if offending.is_empty() {
        return Ok(());
    }
    Err(QualityError::RangeViolation {
        column: name.to_string(),
        violations: offending.len(),
        lo,
        hi,
        sample: offending.into_iter().take(RANGE_SAMPLE_LIMIT).collect(),
    })
}

pub(crate) fn key_columns<'a, S: AsRef<str>>(
    table: &'a Table,
    key: &[S],
) -> Result<Vec<&'a Column>, QualityError> {
    if key.is_empty() {
        return Err(QualityError::EmptyKey);
    }
    require_columns(table, key)?;
    key.iter()
        .map(|name| table.require_column(name.as_ref()))
        .collect()
}

pub(crate) fn row_key(columns: &[&Column], row: usize) -> RowKey {
    columns
        .iter()
        .map(|column| column.get(row).map(|value| value.as_display()))
        .collect()
}

/// Rows minus distinct keys. Missing key cells compare equal to each other.
pub(crate) fn count_duplicate_keys(columns: &[&Column], rows: usize) -> usize {
    let distinct = (0..rows)
        .map(|row| row_key(columns, row))
        .collect::<HashSet<_>>()
        .len();
    rows - distinct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn orders() -> Table {
        Table::new(vec![
            Column::from_strs("order_id", &[Some("A1"), Some("A2"), Some("A2"), Some("A2")]),
            Column::from_floats("amount", &[Some(10.0), Some(-5.0), None, Some(3.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn require_columns_lists_every_missing_name() {
        let table = orders();
        assert!(require_columns(&table, &["order_id", "amount"]).is_ok());
        let err = require_columns(&table, &["status", "order_id", "user_id"]).unwrap_err();
        assert_eq!(
            err,
            QualityError::MissingColumns {
                missing: vec!["status".to_string(), "user_id".to_string()]
            }
        );
    }

    #[test]
    fn assert_non_empty_names_the_label() {
        let empty = Table::new(vec![Column::from_strs("id", &[])]).unwrap();
        let err = assert_non_empty(&empty, "orders_raw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDataset);
        assert!(err.to_string().contains("orders_raw"));
        assert!(assert_non_empty(&orders(), "orders").is_ok());
    }

    #[test]
    fn assert_unique_key_reports_rows_minus_distinct() {
        let err = assert_unique_key(&orders(), &["order_id"]).unwrap_err();
        assert_eq!(
            err,
            QualityError::Uniqueness {
                key: vec!["order_id".to_string()],
                duplicates: 2
            }
        );
    }

    #[test]
    fn assert_in_range_exempts_missing_and_reports_samples() {
        let table = orders();
        let amount = table.column("amount").unwrap();
        let err = assert_in_range(amount, Some(0.0), None, "amount").unwrap_err();
        match err {
            QualityError::RangeViolation {
                violations, sample, ..
            } => {
                assert_eq!(violations, 1);
                assert_eq!(sample, vec![1]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(assert_in_range(amount, None, Some(10.0), "amount").is_ok());
        assert!(assert_in_range(amount, None, None, "amount").is_ok());
    }

    #[test]
    fn assert_in_range_rejects_text_columns() {
        let table = orders();
        let err = assert_in_range(table.column("order_id").unwrap(), Some(0.0), None, "order_id")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }
}
