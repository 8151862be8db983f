//! Cell values, column datatypes, and scalar parsing.
//!
//! A cell is an `Option<Value>`: `None` is the missing state and is never
//! represented by a sentinel string or a zero. Parsing helpers here are shared
//! by CSV ingestion, schema coercion, and timestamp parsing.

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Tokens read as missing when ingesting raw text.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Wall-clock instant without an offset.
    DateTime(NaiveDateTime),
    /// Instant with an explicit UTC offset.
    Timestamp(DateTime<FixedOffset>),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Timestamp(ts) => ts.to_rfc3339(),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::String,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::DateTime(_) => ColumnType::DateTime,
            Value::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    /// Numeric view used by range checks and winsorization.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Timestamp,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::DateTime | ColumnType::Timestamp)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_missing_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    MISSING_TOKENS.contains(&trimmed)
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

pub fn parse_offset_datetime(value: &str) -> Result<DateTime<FixedOffset>> {
    const OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as offset datetime"))
}

/// Parses free-form timestamp text into either an offset-aware or a naive
/// instant. Date-only inputs resolve to midnight.
pub fn parse_instant(value: &str) -> Result<Value> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("Empty timestamp");
    }
    if let Ok(ts) = parse_offset_datetime(trimmed) {
        return Ok(Value::Timestamp(ts));
    }
    if let Ok(dt) = parse_naive_datetime(trimmed) {
        return Ok(Value::DateTime(dt));
    }
    let date = parse_naive_date(trimmed)
        .with_context(|| format!("Failed to parse '{trimmed}' as timestamp"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid midnight for {date}"))?;
    Ok(Value::DateTime(midnight))
}

fn parse_float(value: &str) -> Result<f64> {
    let parsed: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse '{value}' as float"))?;
    if !parsed.is_finite() {
        bail!("Non-finite float '{value}'");
    }
    Ok(parsed)
}

fn parse_boolean(value: &str) -> Result<bool> {
    let lowered = value.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => bail!("Failed to parse '{value}' as boolean"),
    }
}

pub fn parse_typed_value(value: &str, ty: &ColumnType) -> Result<Option<Value>> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = match ty {
        ColumnType::String => Value::String(value.to_string()),
        ColumnType::Integer => {
            let trimmed = value.trim();
            match trimmed.parse::<i64>() {
                Ok(parsed) => Value::Integer(parsed),
                Err(_) => {
                    let float = parse_float(trimmed)
                        .with_context(|| format!("Failed to parse '{value}' as integer"))?;
                    if float.fract() != 0.0 {
                        bail!("Failed to parse '{value}' as integer");
                    }
                    Value::Integer(float as i64)
                }
            }
        }
        ColumnType::Float => Value::Float(parse_float(value)?),
        ColumnType::Boolean => Value::Boolean(parse_boolean(value)?),
        ColumnType::DateTime => match parse_instant(value)? {
            Value::Timestamp(ts) => Value::DateTime(ts.naive_utc()),
            other => other,
        },
        ColumnType::Timestamp => match parse_instant(value)? {
            Value::DateTime(dt) => Value::Timestamp(dt.and_utc().fixed_offset()),
            other => other,
        },
    };
    Ok(Some(parsed))
}

/// Converts an already-typed value to `target`.
pub fn convert_value(value: &Value, target: &ColumnType) -> Result<Option<Value>> {
    if value.column_type() == *target {
        return Ok(Some(value.clone()));
    }
    let converted = match (value, target) {
        (Value::String(s), _) => return parse_typed_value(s, target),
        (_, ColumnType::String) => Value::String(value.as_display()),
        (Value::Integer(i), ColumnType::Float) => Value::Float(*i as f64),
        (Value::Float(f), ColumnType::Integer) if f.fract() == 0.0 => Value::Integer(*f as i64),
        (Value::Boolean(b), ColumnType::Integer) => Value::Integer(i64::from(*b)),
        (Value::Boolean(b), ColumnType::Float) => Value::Float(if *b { 1.0 } else { 0.0 }),
        (Value::Integer(i), ColumnType::Boolean) if *i == 0 || *i == 1 => Value::Boolean(*i == 1),
        (Value::DateTime(dt), ColumnType::Timestamp) => Value::Timestamp(dt.and_utc().fixed_offset()),
        (Value::Timestamp(ts), ColumnType::DateTime) => Value::DateTime(ts.naive_utc()),
        _ => bail!("Cannot convert {value:?} to {target}"),
    };
    Ok(Some(converted))
}
