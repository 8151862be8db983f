//! Percentile clipping of numeric outliers.

use serde::{Deserialize, Serialize};

use crate::{
    data::{ColumnType, Value},
    error::QualityError,
    frame::Column,
};

/// Lower/upper percentiles in percent units (`0..=100`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for PercentileBounds {
    fn default() -> Self {
        Self {
            lower: 1.0,
            upper: 99.0,
        }
    }
}

impl PercentileBounds {
    pub fn new(lower: f64, upper: f64) -> Result<Self, QualityError> {
        let bounds = Self { lower, upper };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), QualityError> {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if in_range(self.lower) && in_range(self.upper) && self.lower <= self.upper {
            Ok(())
        } else {
            Err(QualityError::InvalidPercentiles {
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

/// Percentile of an ascending slice with linear interpolation between ranks.
/// `None` for an empty slice or a `percent` outside `0..=100`.
pub fn percentile(sorted: &[f64], percent: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&percent) {
        return None;
    }
    let rank = percent / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let frac = rank - lo as f64;
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }
}

/// Clip thresholds over the non-missing values, or `None` if all are missing.
pub fn clip_bounds(
    column: &Column,
    bounds: PercentileBounds,
) -> Result<Option<(f64, f64)>, QualityError> {
    bounds.validate()?;
    let mut present = column
        .numeric_values()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    present.sort_by(f64::total_cmp);
    Ok(percentile(&present, bounds.lower).zip(percentile(&present, bounds.upper)))
}

/// Clips every non-missing value into the percentile bounds. The result is a
/// float column with the same name; missing values pass through.
pub fn winsorize(column: &Column, bounds: PercentileBounds) -> Result<Column, QualityError> {
    let numeric = column.numeric_values()?;
    let limits = clip_bounds(column, bounds)?;
    let values = numeric
        .into_iter()
        .map(|value| {
            value.map(|v| match limits {
                Some((lo, hi)) => Value::Float(v.max(lo).min(hi)),
                None => Value::Float(v),
            })
        })
        .collect();
    Ok(Column::new(column.name(), ColumnType::Float, values))
}
