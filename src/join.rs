use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::anyhow;
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    data::{ColumnType, Value},
    error::{JoinSide, QualityError},
    frame::{Column, Table},
    quality::{RowKey, count_duplicate_keys, key_columns, row_key},
};

/// Declared key multiplicity between the left and right tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinValidation {
    #[serde(alias = "1:1")]
    OneToOne,
    #[serde(alias = "1:m")]
    OneToMany,
    #[serde(alias = "m:1")]
    ManyToOne,
    #[serde(alias = "m:m")]
    ManyToMany,
}

impl JoinValidation {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinValidation::OneToOne => "one_to_one",
            JoinValidation::OneToMany => "one_to_many",
            JoinValidation::ManyToOne => "many_to_one",
            JoinValidation::ManyToMany => "many_to_many",
        }
    }

    pub fn left_unique(&self) -> bool {
        matches!(self, JoinValidation::OneToOne | JoinValidation::OneToMany)
    }

    pub fn right_unique(&self) -> bool {
        matches!(self, JoinValidation::OneToOne | JoinValidation::ManyToOne)
    }
}

impl fmt::Display for JoinValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinValidation {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "one_to_one" | "1:1" => Ok(JoinValidation::OneToOne),
            "one_to_many" | "1:m" => Ok(JoinValidation::OneToMany),
            "many_to_one" | "m:1" => Ok(JoinValidation::ManyToOne),
            "many_to_many" | "m:m" => Ok(JoinValidation::ManyToMany),
            other => Err(anyhow!(
                "Unknown join validation '{other}'. Expected one_to_one, one_to_many, many_to_one or many_to_many"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinStats {
    pub left_rows: usize,
    pub output_rows: usize,
    pub matched_rows: usize,
}

impl JoinStats {
    /// Share of output rows that found a right-side match.
    pub fn match_rate(&self) -> f64 {
        if self.output_rows == 0 {
            0.0
        } else {
            self.matched_rows as f64 / self.output_rows as f64
        }
    }
}

/// Left join on `on`, validating key cardinality before any output is built.
///
/// Every left row appears in left order; with a right-unique validation mode it
/// appears exactly once. Non-key column names present on both sides get the
/// respective suffix; an empty suffix keeps the original name. Missing key
/// cells match each other, the same equality the cardinality check uses.
pub fn safe_left_join<S: AsRef<str>>(
    left: &Table,
    right: &Table,
    on: &[S],
    validate: JoinValidation,
    suffixes: (&str, &str),
) -> Result<Table, QualityError> {
    safe_left_join_with_stats(left, right, on, validate, suffixes).map(|(table, _)| table)
}

pub fn safe_left_join_with_stats<S: AsRef<str>>(
    left: &Table,
    right: &Table,
    on: &[S],
    validate: JoinValidation,
    suffixes: (&str, &str),
) -> Result<(Table, JoinStats), QualityError> {
    let left_keys = key_columns(left, on)?;
    let right_keys = key_columns(right, on)?;
    validate_key_types(&left_keys, &right_keys)?;
    let key_names = on.iter().map(|k| k.as_ref().to_string()).collect::<Vec<_>>();

    for (side, table, keys, required) in [
        (JoinSide::Left, left, &left_keys, validate.left_unique()),
        (JoinSide::Right, right, &right_keys, validate.right_unique()),
    ] {
        if !required {
            continue;
        }
        let duplicates = count_duplicate_keys(keys, table.row_count());
        if duplicates > 0 {
            return Err(QualityError::CardinalityViolation {
                mode: validate,
                side,
                key: key_names.clone(),
                duplicates,
            });
        }
    }

    let lookup = build_right_lookup(&right_keys, right.row_count());
    let mut pairs: Vec<(usize, Option<usize>)> = Vec::with_capacity(left.row_count());
    let mut matched_rows = 0usize;
    for row in 0..left.row_count() {
        let key = row_key(&left_keys, row);
        match lookup.get(&key) {
            Some(bucket) => {
                matched_rows += bucket.len();
                pairs.extend(bucket.iter().map(|right_row| (row, Some(*right_row))));
            }
            None => pairs.push((row, None)),
        }
    }

    let (left_names, right_columns) = build_output_headers(left, right, &key_names, suffixes);
    let mut columns = Vec::with_capacity(left_names.len() + right_columns.len());
    for (column, name) in left.columns().iter().zip(left_names) {
        let values = pairs
            .iter()
            .map(|(l, _)| column.values()[*l].clone())
            .collect();
        columns.push(Column::new(name, column.datatype(), values));
    }
    for (column, name) in right_columns {
        let values = pairs
            .iter()
            .map(|(_, r)| r.and_then(|r| column.values()[r].clone()))
            .collect();
        columns.push(Column::new(name, column.datatype(), values));
    }
    let joined = Table::new(columns)?;

    let stats = JoinStats {
        left_rows: left.row_count(),
        output_rows: pairs.len(),
        matched_rows,
    };
    info!(
        "Join complete ({validate}): {} output row(s), {} matched row(s)",
        stats.output_rows, stats.matched_rows
    );
    Ok((joined, stats))
}

fn validate_key_types(left: &[&Column], right: &[&Column]) -> Result<(), QualityError> {
    for (l, r) in left.iter().zip(right.iter()) {
        if !same_type(l.datatype(), r.datatype()) {
            return Err(QualityError::IncompatibleColumn {
                column: r.name().to_string(),
                expected: format!("{} to match the left join key", l.datatype()),
                found: r.datatype(),
            });
        }
    }
    Ok(())
}

fn same_type(left: ColumnType, right: ColumnType) -> bool {
    (left.is_numeric() && right.is_numeric()) || left == right
}

fn build_right_lookup(keys: &[&Column], rows: usize) -> HashMap<RowKey, Vec<usize>> {
    let mut map: HashMap<RowKey, Vec<usize>> = HashMap::new();
    for row in 0..rows {
        map.entry(row_key(keys, row)).or_default().push(row);
    }
    map
}

/// Output names for every left column (in order) and the right non-key
/// columns paired with their output names.
fn build_output_headers<'a>(
    left: &Table,
    right: &'a Table,
    key_names: &[String],
    (left_suffix, right_suffix): (&str, &str),
) -> (Vec<String>, Vec<(&'a Column, String)>) {
    let is_key = |name: &str| key_names.iter().any(|k| k == name);
    let right_non_key = right
        .columns()
        .iter()
        .filter(|c| !is_key(c.name()))
        .collect_vec();
    let collides = |name: &str| !is_key(name) && left.has_column(name) && right.has_column(name);

    let left_names = left
        .columns()
        .iter()
        .map(|c| {
            if collides(c.name()) {
                format!("{}{left_suffix}", c.name())
            } else {
                c.name().to_string()
            }
        })
        .collect();
    let right_columns = right_non_key
        .into_iter()
        .map(|c| {
            let name = if collides(c.name()) {
                format!("{}{right_suffix}", c.name())
            } else {
                c.name().to_string()
            };
            (c, name)
        })
        .collect();
    (left_names, right_columns)
}

/// Distinct `key` values of joined rows whose right-side `probe` column is missing.
pub fn unmatched_keys(joined: &Table, key: &str, probe: &str) -> Vec<Value> {
    let (Some(keys), Some(probe)) = (joined.column(key), joined.column(probe)) else {
        return Vec::new();
    };
    (0..joined.row_count())
        .filter(|row| probe.is_missing(*row))
        .filter_map(|row| keys.get(row).cloned())
        .unique_by(Value::as_display)
        .collect()
}
