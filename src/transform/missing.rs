//! Missing-value indicator columns and per-column missingness statistics.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    error::QualityError,
    frame::{Column, Table},
    quality::require_columns,
};

pub const MISSING_FLAG_SUFFIX: &str = "__isna";

/// Adds `<column><suffix>` boolean columns that are true exactly where the
/// current column value is missing. Existing flag columns are re-derived.
pub fn add_missing_flags<S: AsRef<str>>(
    table: &Table,
    columns: &[S],
    suffix: &str,
) -> Result<Table, QualityError> {
    require_columns(table, columns)?;
    let flags = columns
        .iter()
        .map(|name| {
            let column = table.require_column(name.as_ref())?;
            Ok(missing_flag(column, suffix))
        })
        .collect::<Result<Vec<_>, QualityError>>()?;
    table.with_columns(flags)
}

pub fn missing_flag(column: &Column, suffix: &str) -> Column {
    let flags = (0..column.len())
        .map(|row| column.is_missing(row))
        .collect::<Vec<_>>();
    Column::from_bools(format!("{}{suffix}", column.name()), &flags)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessEntry {
    pub column: String,
    pub missing: usize,
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MissingnessReport {
    pub rows: usize,
    pub entries: Vec<MissingnessEntry>,
}

impl MissingnessReport {
    pub fn get(&self, column: &str) -> Option<&MissingnessEntry> {
        self.entries.iter().find(|entry| entry.column == column)
    }

    pub fn headers() -> Vec<String> {
        vec![
            "column".to_string(),
            "n_missing".to_string(),
            "p_missing".to_string(),
        ]
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|entry| {
                vec![
                    entry.column.clone(),
                    entry.missing.to_string(),
                    format!("{:.4}", entry.fraction),
                ]
            })
            .collect()
    }
}

/// Missing count and fraction for every column, sorted by fraction
/// descending then column name ascending. A zero-row table reports 0.
pub fn missingness_report(table: &Table) -> MissingnessReport {
    let rows = table.row_count();
    let mut entries = table
        .columns()
        .iter()
        .map(|column| {
            let missing = column.missing_count();
            let fraction = if rows == 0 {
                0.0
            } else {
                missing as f64 / rows as f64
            };
            MissingnessEntry {
                column: column.name().to_string(),
                missing,
                fraction,
            }
        })
        .collect::<Vec<_>>();
    entries.sort_by(compare_entries);
    MissingnessReport { rows, entries }
}

fn compare_entries(a: &MissingnessEntry, b: &MissingnessEntry) -> Ordering {
    b.fraction
        .total_cmp(&a.fraction)
        .then_with(|| a.column.cmp(&b.column))
}
