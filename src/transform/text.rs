//! Categorical text normalization and value remapping.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    data::{ColumnType, Value},
    frame::Column,
    transform::string_ops::normalize_category,
};

/// Total lookup from normalized category to canonical label. Values without an
/// entry map to themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMapping {
    entries: BTreeMap<String, String>,
}

impl CategoryMapping {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The order-status mapping used by the clean stage.
    pub fn order_status() -> Self {
        Self::new([("paid", "paid"), ("refund", "refund"), ("refunded", "refund")])
    }

    pub fn lookup<'a>(&'a self, value: &'a str) -> &'a str {
        self.entries.get(value).map(String::as_str).unwrap_or(value)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercases, trims, and collapses whitespace runs. Missing stays missing and
/// whitespace-only text becomes missing; non-text values are normalized
/// through their display form.
pub fn normalize_text(column: &Column) -> Column {
    let values = column
        .values()
        .iter()
        .map(|value| {
            value.as_ref().and_then(|value| {
                let normalized = match value {
                    Value::String(s) => normalize_category(s).into_owned(),
                    other => normalize_category(&other.as_display()).into_owned(),
                };
                (!normalized.is_empty()).then_some(Value::String(normalized))
            })
        })
        .collect();
    Column::new(column.name(), ColumnType::String, values)
}

/// Replaces mapped text values; anything not in `mapping` passes through unchanged.
pub fn apply_mapping(column: &Column, mapping: &CategoryMapping) -> Column {
    let values = column
        .values()
        .iter()
        .map(|value| match value {
            Some(Value::String(s)) => Some(Value::String(mapping.lookup(s).to_string())),
            other => other.clone(),
        })
        .collect();
    Column::new(column.name(), column.datatype(), values)
}

/// Distinct non-missing text values with no mapping entry, most frequent first.
pub fn unmapped_values(column: &Column, mapping: &CategoryMapping) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in column.values().iter().flatten() {
        if let Value::String(s) = value
            && !mapping.contains(s)
        {
            *counts.entry(s.as_str()).or_insert(0) += 1;
        }
    }
    let mut items = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect::<Vec<_>>();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}
