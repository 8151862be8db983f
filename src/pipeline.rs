//! The two batch stages: raw orders to a clean table, and clean orders plus
//! users to the analytics table.
//!
//! Both stages thread an immutable [`Table`] through named steps with
//! [`Pipeline`]. The first failing step aborts the stage; nothing downstream
//! runs and the caller persists nothing.

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::{
    config::{PipelineConfig, RangeCheck, StatusConfig},
    data::Value,
    error::QualityError,
    frame::Table,
    join::{JoinStats, safe_left_join_with_stats, unmatched_keys},
    quality::{assert_in_range, assert_non_empty, assert_unique_key, require_columns},
    schema::enforce_schema,
    transform::{
        MissingnessReport, add_missing_flags, add_time_parts, apply_mapping, missingness_report,
        normalize_text, parse_datetime, unmapped_values, winsorize,
    },
};

/// Named sequence of table transforms and gates.
#[derive(Debug, Clone)]
pub struct Pipeline {
    label: String,
    table: Table,
    completed: Vec<String>,
}

impl Pipeline {
    pub fn new(label: impl Into<String>, table: Table) -> Self {
        Self {
            label: label.into(),
            table,
            completed: Vec::new(),
        }
    }

    /// Replaces the current table with the output of `step`.
    pub fn stage<F>(mut self, name: &str, step: F) -> Result<Self>
    where
        F: FnOnce(&Table) -> Result<Table, QualityError>,
    {
        debug!("[{}] {name}", self.label);
        self.table = step(&self.table)
            .with_context(|| format!("Stage '{name}' of {} pipeline", self.label))?;
        self.completed.push(name.to_string());
        Ok(self)
    }

    /// Runs a gate that leaves the table unchanged.
    pub fn check<F>(self, name: &str, gate: F) -> Result<Self>
    where
        F: FnOnce(&Table) -> Result<(), QualityError>,
    {
        self.stage(name, |table| gate(table).map(|()| table.clone()))
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn finish(self) -> Table {
        debug!(
            "[{}] finished {} step(s): {}",
            self.label,
            self.completed.len(),
            self.completed.join(" -> ")
        );
        self.table
    }
}

#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub orders_clean: Table,
    pub users: Table,
    pub report: MissingnessReport,
}

#[derive(Debug, Clone)]
pub struct AnalyticsOutput {
    pub table: Table,
    pub join: JoinStats,
    pub missing_timestamps: usize,
    pub unmatched_keys: Vec<Value>,
}

/// Stage one: gates, schema enforcement, status normalization and missing
/// flags. The missingness report describes the returned clean table.
pub fn clean_orders(
    orders_raw: &Table,
    users: &Table,
    config: &PipelineConfig,
) -> Result<CleanOutput> {
    config.validate()?;
    info!(
        "Rows: {}={}, {}={}",
        config.orders.label,
        orders_raw.row_count(),
        config.users.label,
        users.row_count()
    );

    let orders_cfg = &config.orders;
    let flags = &config.missing_flags;
    let orders_clean = Pipeline::new(&orders_cfg.label, orders_raw.clone())
        .check("require_columns", |t| {
            require_columns(t, &orders_cfg.required_columns)
        })?
        .check("assert_non_empty", |t| assert_non_empty(t, &orders_cfg.label))?
        .stage("enforce_schema", |t| Ok(enforce_schema(t, &orders_cfg.schema)))?
        .check("range_checks", |t| run_range_checks(t, &config.range_checks))?
        .stage("normalize_status", |t| normalize_status(t, &config.status))?
        .stage("add_missing_flags", |t| {
            add_missing_flags(t, &flags.columns, &flags.suffix)
        })?
        .finish();

    let users = prepare_users(users, config)?.finish();
    let report = missingness_report(&orders_clean);
    if let Some(worst) = report.entries.first() {
        info!(
            "Missingness: worst column '{}' at {:.2}%",
            worst.column,
            worst.fraction * 100.0
        );
    }
    Ok(CleanOutput {
        orders_clean,
        users,
        report,
    })
}

/// Stage two: timestamp parsing, validated join against users, and
/// winsorization of the configured amount column.
pub fn build_analytics(
    orders_clean: &Table,
    users: &Table,
    config: &PipelineConfig,
) -> Result<AnalyticsOutput> {
    config.validate()?;
    let users = prepare_users(users, config)?
        .check("assert_unique_key", |t| assert_unique_key(t, &config.join.on))?
        .finish();

    let clean_schema = config.clean_orders_schema();
    let required = config.clean_orders_required();
    let label = format!("{}_clean", config.orders.label);
    let time = &config.time;
    let orders = Pipeline::new(&label, orders_clean.clone())
        .check("require_columns", |t| require_columns(t, &required))?
        .check("assert_non_empty", |t| assert_non_empty(t, &label))?
        .stage("enforce_schema", |t| Ok(enforce_schema(t, &clean_schema)))?
        .stage("parse_datetime", |t| parse_datetime(t, &time.column, time.to_utc))?
        .stage("add_time_parts", |t| add_time_parts(t, &time.column))?
        .finish();

    let missing_timestamps = orders.require_column(&time.column)?.missing_count();
    info!(
        "Missing {} after parse: {} / {}",
        time.column,
        missing_timestamps,
        orders.row_count()
    );

    let join = &config.join;
    let (joined, stats) = safe_left_join_with_stats(
        &orders,
        &users,
        &join.on,
        join.validate,
        (&join.suffixes.0, &join.suffixes.1),
    )
    .with_context(|| format!("Joining {label} with {}", config.users.label))?;
    info!(
        "Rows after join: {} (match rate {:.2}%)",
        stats.output_rows,
        stats.match_rate() * 100.0
    );

    let unmatched = match join.on.first() {
        Some(key) => unmatched_keys(&joined, key, &join.probe_column),
        None => Vec::new(),
    };
    if !unmatched.is_empty() {
        warn!(
            "{} distinct {} value(s) found no match in {}",
            unmatched.len(),
            join.on.join("+"),
            config.users.label
        );
    }

    let winsor = &config.winsorize;
    let clipped = winsorize(joined.require_column(&winsor.column)?, winsor.percentiles)
        .with_context(|| format!("Winsorizing '{}'", winsor.column))?
        .renamed(&winsor.target);
    let table = joined.with_column(clipped)?;
    info!(
        "Analytics table: {} row(s) x {} column(s)",
        table.row_count(),
        table.column_count()
    );
    Ok(AnalyticsOutput {
        table,
        join: stats,
        missing_timestamps,
        unmatched_keys: unmatched,
    })
}

fn prepare_users(users: &Table, config: &PipelineConfig) -> Result<Pipeline> {
    let users_cfg = &config.users;
    Pipeline::new(&users_cfg.label, users.clone())
        .check("require_columns", |t| {
            require_columns(t, &users_cfg.required_columns)
        })?
        .check("assert_non_empty", |t| assert_non_empty(t, &users_cfg.label))?
        .stage("enforce_schema", |t| Ok(enforce_schema(t, &users_cfg.schema)))
}

fn run_range_checks(table: &Table, checks: &[RangeCheck]) -> Result<(), QualityError> {
    checks.iter().try_for_each(|check| {
        let column = table.require_column(&check.column)?;
        assert_in_range(column, check.min, check.max, &check.column)
    })
}

fn normalize_status(table: &Table, status: &StatusConfig) -> Result<Table, QualityError> {
    let normalized = normalize_text(table.require_column(&status.source)?);
    let unmapped = unmapped_values(&normalized, &status.mapping);
    if !unmapped.is_empty() {
        let listed = unmapped
            .iter()
            .map(|(value, count)| format!("{value} ({count})"))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            "Column '{}': unmapped value(s) passed through: {listed}",
            status.source
        );
    }
    table.with_column(apply_mapping(&normalized, &status.mapping).renamed(&status.target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, frame::Column};

    fn users() -> Table {
        Table::new(vec![
            Column::from_strs("user_id", &[Some("u1"), Some("u2")]),
            Column::from_strs("country", &[Some("SA"), Some("AE")]),
            Column::from_strs("signup_date", &[Some("2024-01-01"), Some("2024-01-05")]),
        ])
        .unwrap()
    }

    fn orders(amounts: &[Option<&str>]) -> Table {
        let n = amounts.len();
        let ids = (0..n).map(|i| format!("A{i}")).collect::<Vec<_>>();
        let users = ["u1", "u2", "u3"];
        let statuses = ["Paid", " refund ", "Refunded", "PENDING"];
        Table::new(vec![
            Column::from_strs("order_id", &ids.iter().map(|s| Some(s.as_str())).collect::<Vec<_>>()),
            Column::from_strs("user_id", &(0..n).map(|i| Some(users[i % 3])).collect::<Vec<_>>()),
            Column::from_strs("amount", amounts),
            Column::from_strs("quantity", &vec![Some("1"); n]),
            Column::from_strs(
                "created_at",
                &(0..n).map(|_| Some("2024-03-01T10:00:00Z")).collect::<Vec<_>>(),
            ),
            Column::from_strs("status", &(0..n).map(|i| Some(statuses[i % 4])).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn pipeline_records_completed_steps() {
        let pipeline = Pipeline::new("users", users())
            .check("non_empty", |t| assert_non_empty(t, "users"))
            .unwrap()
            .stage("flags", |t| add_missing_flags(t, &["country"], "__isna"))
            .unwrap();
        assert_eq!(pipeline.completed(), &["non_empty".to_string(), "flags".to_string()]);
        assert!(pipeline.finish().has_column("country__isna"));
    }

    #[test]
    fn pipeline_error_keeps_quality_error_reachable() {
        let err = Pipeline::new("users", users())
            .check("unique", |t| assert_unique_key(t, &["missing"]))
            .unwrap_err();
        let quality = err.downcast_ref::<QualityError>().unwrap();
        assert_eq!(quality.kind(), ErrorKind::Schema);
        assert!(format!("{err:#}").contains("Stage 'unique' of users pipeline"));
    }

    #[test]
    fn clean_orders_normalizes_status_and_flags() {
        let raw = orders(&[Some("10"), None, Some("x"), Some("3")]);
        let out = clean_orders(&raw, &users(), &PipelineConfig::default()).unwrap();
        let status = out.orders_clean.column("status_clean").unwrap();
        let values = status
            .values()
            .iter()
            .map(|v| v.as_ref().and_then(Value::as_str))
            .collect::<Vec<_>>();
        assert_eq!(values, vec![Some("paid"), Some("refund"), Some("refund"), Some("pending")]);
        let flags = out.orders_clean.column("amount__isna").unwrap();
        assert_eq!(flags.get(1), Some(&Value::Boolean(true)));
        assert_eq!(flags.get(2), Some(&Value::Boolean(true)));
        assert_eq!(out.report.get("amount").unwrap().missing, 2);
    }

    #[test]
    fn clean_orders_rejects_negative_amounts() {
        let raw = orders(&[Some("10"), Some("-5")]);
        let err = clean_orders(&raw, &users(), &PipelineConfig::default()).unwrap_err();
        match err.downcast_ref::<QualityError>() {
            Some(QualityError::RangeViolation { violations, .. }) => assert_eq!(*violations, 1),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn build_analytics_joins_and_clips() {
        let raw = orders(&[Some("1"), Some("2"), Some("3"), Some("400")]);
        let config = PipelineConfig::default();
        let clean = clean_orders(&raw, &users(), &config).unwrap();
        let out = build_analytics(&clean.orders_clean, &clean.users, &config).unwrap();
        assert_eq!(out.table.row_count(), 4);
        assert_eq!(out.join.matched_rows, 3);
        assert_eq!(out.unmatched_keys, vec![Value::String("u3".to_string())]);
        assert_eq!(out.missing_timestamps, 0);
        for column in ["year", "dow", "country", "amount_winsor"] {
            assert!(out.table.has_column(column), "missing {column}");
        }
        let top = out.table.column("amount_winsor").unwrap().get(3).and_then(Value::as_f64);
        assert!(top.is_some_and(|v| v < 400.0));
    }

    #[test]
    fn build_analytics_gates_required_columns_before_coercion() {
        let config = PipelineConfig::default();
        let clean = clean_orders(&orders(&[Some("1")]), &users(), &config).unwrap();
        let without_status = Table::new(
            clean
                .orders_clean
                .columns()
                .iter()
                .filter(|column| column.name() != "status_clean")
                .cloned()
                .collect(),
        )
        .unwrap();
        let err = build_analytics(&without_status, &clean.users, &config).unwrap_err();
        match err.downcast_ref::<QualityError>() {
            Some(QualityError::MissingColumns { missing }) => {
                assert_eq!(missing, &vec!["status_clean".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(format!("{err:#}").contains("Stage 'require_columns' of orders_clean pipeline"));
    }

    #[test]
    fn build_analytics_rejects_duplicate_users() {
        let raw = orders(&[Some("1")]);
        let config = PipelineConfig::default();
        let clean = clean_orders(&raw, &users(), &config).unwrap();
        let dup_users = Table::new(vec![
            Column::from_strs("user_id", &[Some("u1"), Some("u1")]),
            Column::from_strs("country", &[Some("SA"), Some("AE")]),
            Column::from_strs("signup_date", &[None, None]),
        ])
        .unwrap();
        let err = build_analytics(&clean.orders_clean, &dup_users, &config).unwrap_err();
        let quality = err.downcast_ref::<QualityError>().unwrap();
        assert_eq!(quality.kind(), ErrorKind::Uniqueness);
    }
}
