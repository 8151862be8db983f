use thiserror::Error;

use crate::{data::ColumnType, join::JoinValidation};

/// Taxonomy class of a [`QualityError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    EmptyDataset,
    Uniqueness,
    RangeViolation,
    CardinalityViolation,
    InvalidArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

impl JoinSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinSide::Left => "left",
            JoinSide::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    #[error("missing required column(s): {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("column '{name}' appears more than once")]
    DuplicateColumn { name: String },

    #[error("column '{column}' holds {found} value(s) but the table has {expected} row(s)")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column '{column}' is {found}; expected {expected}")]
    IncompatibleColumn {
        column: String,
        expected: String,
        found: ColumnType,
    },

    #[error("{label} has 0 rows")]
    EmptyDataset { label: String },

    #[error("key ({}) is not unique: {duplicates} duplicate value(s)", .key.join(", "))]
    Uniqueness { key: Vec<String>, duplicates: usize },

    #[error(
        "{column}: {violations} value(s) outside {}{}",
        describe_bounds(.lo, .hi),
        describe_sample(.sample)
    )]
    RangeViolation {
        column: String,
        violations: usize,
        lo: Option<f64>,
        hi: Option<f64>,
        sample: Vec<usize>,
    },

    #[error(
        "{mode} join violated: {} key ({}) has {duplicates} duplicate value(s)",
        .side.as_str(),
        .key.join(", ")
    )]
    CardinalityViolation {
        mode: JoinValidation,
        side: JoinSide,
        key: Vec<String>,
        duplicates: usize,
    },

    #[error("invalid percentile bounds: lower={lower}, upper={upper} (expected 0 <= lower <= upper <= 100)")]
    InvalidPercentiles { lower: f64, upper: f64 },

    #[error("join key list cannot be empty")]
    EmptyKey,
}

impl QualityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QualityError::MissingColumns { .. }
            | QualityError::DuplicateColumn { .. }
            | QualityError::LengthMismatch { .. }
            | QualityError::IncompatibleColumn { .. } => ErrorKind::Schema,
            QualityError::EmptyDataset { .. } => ErrorKind::EmptyDataset,
            QualityError::Uniqueness { .. } => ErrorKind::Uniqueness,
            QualityError::RangeViolation { .. } => ErrorKind::RangeViolation,
            QualityError::CardinalityViolation { .. } => ErrorKind::CardinalityViolation,
            QualityError::InvalidPercentiles { .. } | QualityError::EmptyKey => {
                ErrorKind::InvalidArgument
            }
        }
    }

    pub(crate) fn missing_column(name: &str) -> Self {
        QualityError::MissingColumns {
            missing: vec![name.to_string()],
        }
    }
}

fn describe_bounds(lo: &Option<f64>, hi: &Option<f64>) -> String {
    match (lo, hi) {
        (Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
        (Some(lo), None) => format!("[{lo}, +inf)"),
        (None, Some(hi)) => format!("(-inf, {hi}]"),
        (None, None) => "(-inf, +inf)".to_string(),
    }
}

fn describe_sample(sample: &[usize]) -> String {
    if sample.is_empty() {
        String::new()
    } else {
        let rows = sample
            .iter()
            .map(|idx| idx.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(" (rows {rows})")
    }
}
