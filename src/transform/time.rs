//! Timestamp parsing and calendar part extraction.

use chrono::{Datelike, NaiveDateTime, Timelike, Utc, Weekday};
use log::debug;

use crate::{
    data::{ColumnType, Value, parse_instant},
    error::QualityError,
    frame::{Column, Table},
};

/// Columns produced by [`add_time_parts`], in output order.
pub const TIME_PART_COLUMNS: [&str; 5] = ["year", "month", "day", "hour", "dow"];

/// Parses `column` into instants. Unparseable or empty text becomes missing.
///
/// With `to_utc`, offset-free values are read as UTC and offset-aware values
/// are converted to UTC. Without it, offset-free values stay naive unless some
/// value in the column carries an offset, in which case the column becomes
/// offset-aware and offset-free values are read as UTC.
pub fn parse_datetime(table: &Table, column: &str, to_utc: bool) -> Result<Table, QualityError> {
    let source = table.require_column(column)?;
    let parsed = source
        .values()
        .iter()
        .map(|value| match value {
            Some(Value::String(raw)) => parse_instant(raw)
                .inspect_err(|err| debug!("Column '{column}': {err:#}"))
                .ok(),
            Some(instant @ (Value::DateTime(_) | Value::Timestamp(_))) => Some(instant.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();

    let offset_aware = to_utc
        || parsed
            .iter()
            .any(|value| matches!(value, Some(Value::Timestamp(_))));
    let (datatype, values) = if offset_aware {
        let values = parsed
            .into_iter()
            .map(|value| {
                value.map(|value| match value {
                    Value::DateTime(naive) => Value::Timestamp(naive.and_utc().fixed_offset()),
                    Value::Timestamp(ts) if to_utc => {
                        Value::Timestamp(ts.with_timezone(&Utc).fixed_offset())
                    }
                    other => other,
                })
            })
            .collect();
        (ColumnType::Timestamp, values)
    } else {
        (ColumnType::DateTime, parsed)
    };
    table.with_column(Column::new(column, datatype, values))
}

/// Appends `year`, `month`, `day`, `hour` and `dow` derived from a parsed
/// timestamp column. Missing instants give missing parts.
pub fn add_time_parts(table: &Table, timestamp_column: &str) -> Result<Table, QualityError> {
    let source = table.require_column(timestamp_column)?;
    if !source.datatype().is_temporal() {
        return Err(QualityError::IncompatibleColumn {
            column: timestamp_column.to_string(),
            expected: "a parsed timestamp column".to_string(),
            found: source.datatype(),
        });
    }
    let wall_clock = source
        .values()
        .iter()
        .map(|value| match value {
            Some(Value::DateTime(naive)) => Some(*naive),
            Some(Value::Timestamp(ts)) => Some(ts.naive_local()),
            _ => None,
        })
        .collect::<Vec<_>>();

    let integer_part = |name: &str, extract: fn(&NaiveDateTime) -> i64| {
        let values = wall_clock
            .iter()
            .map(|dt| dt.as_ref().map(|dt| Value::Integer(extract(dt))))
            .collect();
        Column::new(name, ColumnType::Integer, values)
    };
    let dow = Column::new(
        "dow",
        ColumnType::String,
        wall_clock
            .iter()
            .map(|dt| dt.map(|dt| Value::String(weekday_name(dt.weekday()).to_string())))
            .collect(),
    );
    table.with_columns(vec![
        integer_part("year", |dt| i64::from(dt.year())),
        integer_part("month", |dt| i64::from(dt.month())),
        integer_part("day", |dt| i64::from(dt.day())),
        integer_part("hour", |dt| i64::from(dt.hour())),
        dow,
    ])
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn orders() -> Table {
        Table::new(vec![Column::from_strs(
            "created_at",
            &[
                Some("2024-03-01 23:30:00"),
                Some("2024-03-01T23:30:00-02:00"),
                Some("not a date"),
                Some(""),
                None,
            ],
        )])
        .unwrap()
    }

    #[test]
    fn parse_datetime_converts_to_utc_and_drops_garbage() {
        let parsed = parse_datetime(&orders(), "created_at", true).unwrap();
        let column = parsed.column("created_at").unwrap();
        assert_eq!(column.datatype(), ColumnType::Timestamp);
        match column.get(1) {
            Some(Value::Timestamp(ts)) => {
                assert_eq!(ts.offset().local_minus_utc(), 0);
                assert_eq!(ts.to_rfc3339(), "2024-03-02T01:30:00+00:00");
            }
            other => panic!("unexpected value {other:?}"),
        }
        assert_eq!(column.missing_count(), 3);
    }

    #[test]
    fn parse_datetime_without_utc_keeps_naive_columns_naive() {
        let table = Table::new(vec![Column::from_strs(
            "created_at",
            &[Some("2024-03-01 08:00:00"), Some("2024-03-02")],
        )])
        .unwrap();
        let parsed = parse_datetime(&table, "created_at", false).unwrap();
        let column = parsed.column("created_at").unwrap();
        assert_eq!(column.datatype(), ColumnType::DateTime);
    }

    #[test]
    fn add_time_parts_yields_missing_parts_for_missing_instants() {
        let parsed = parse_datetime(&orders(), "created_at", true).unwrap();
        let parts = add_time_parts(&parsed, "created_at").unwrap();
        for name in TIME_PART_COLUMNS {
            assert!(parts.has_column(name), "missing {name}");
        }
        assert_eq!(parts.column("year").unwrap().get(1), Some(&Value::Integer(2024)));
        assert_eq!(parts.column("month").unwrap().get(1), Some(&Value::Integer(3)));
        assert_eq!(parts.column("day").unwrap().get(1), Some(&Value::Integer(2)));
        assert_eq!(parts.column("hour").unwrap().get(1), Some(&Value::Integer(1)));
        assert_eq!(
            parts.column("dow").unwrap().get(1),
            Some(&Value::String("Saturday".to_string()))
        );
        assert!(parts.column("hour").unwrap().is_missing(2));
        assert!(parts.column("dow").unwrap().is_missing(4));
    }

    #[test]
    fn add_time_parts_requires_parsed_column() {
        let err = add_time_parts(&orders(), "created_at").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }
}
