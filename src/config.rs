//! YAML pipeline configuration.
//!
//! Every section defaults to the reference orders/users pipeline, so an empty
//! file (or no file at all) reproduces it exactly. Sections that are present
//! replace the default wholesale except where noted.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    data::ColumnType,
    join::JoinValidation,
    schema::CanonicalSchema,
    transform::{CategoryMapping, PercentileBounds, missing::MISSING_FLAG_SUFFIX},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub label: String,
    pub required_columns: Vec<String>,
    pub schema: CanonicalSchema,
}

impl DatasetConfig {
    pub fn orders() -> Self {
        let schema = CanonicalSchema::orders();
        Self {
            label: "orders".to_string(),
            required_columns: schema.column_names().into_iter().map(String::from).collect(),
            schema,
        }
    }

    pub fn users() -> Self {
        let schema = CanonicalSchema::users();
        Self {
            label: "users".to_string(),
            required_columns: schema.column_names().into_iter().map(String::from).collect(),
            schema,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub source: String,
    pub target: String,
    pub mapping: CategoryMapping,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            source: "status".to_string(),
            target: "status_clean".to_string(),
            mapping: CategoryMapping::order_status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingFlagConfig {
    pub columns: Vec<String>,
    pub suffix: String,
}

impl Default for MissingFlagConfig {
    fn default() -> Self {
        Self {
            columns: vec!["amount".to_string(), "quantity".to_string()],
            suffix: MISSING_FLAG_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeCheck {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RangeCheck {
    pub fn non_negative(column: &str) -> Self {
        Self {
            column: column.to_string(),
            min: Some(0.0),
            max: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub column: String,
    pub to_utc: bool,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            column: "created_at".to_string(),
            to_utc: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub on: Vec<String>,
    pub validate: JoinValidation,
    pub suffixes: (String, String),
    /// Right-side column whose presence marks a matched row in diagnostics.
    pub probe_column: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            on: vec!["user_id".to_string()],
            validate: JoinValidation::ManyToOne,
            suffixes: (String::new(), "_user".to_string()),
            probe_column: "country".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinsorConfig {
    pub column: String,
    pub target: String,
    pub percentiles: PercentileBounds,
}

impl Default for WinsorConfig {
    fn default() -> Self {
        Self {
            column: "amount".to_string(),
            target: "amount_winsor".to_string(),
            percentiles: PercentileBounds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub orders: DatasetConfig,
    pub users: DatasetConfig,
    pub status: StatusConfig,
    pub missing_flags: MissingFlagConfig,
    pub range_checks: Vec<RangeCheck>,
    pub time: TimeConfig,
    pub join: JoinConfig,
    pub winsorize: WinsorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            orders: DatasetConfig::orders(),
            users: DatasetConfig::users(),
            status: StatusConfig::default(),
            missing_flags: MissingFlagConfig::default(),
            range_checks: vec![
                RangeCheck::non_negative("amount"),
                RangeCheck::non_negative("quantity"),
            ],
            time: TimeConfig::default(),
            join: JoinConfig::default(),
            winsorize: WinsorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: PipelineConfig =
            serde_yaml::from_reader(reader).context("Parsing pipeline config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing pipeline config to YAML")
    }

    pub fn validate(&self) -> Result<()> {
        self.winsorize.percentiles.validate()?;
        ensure!(!self.join.on.is_empty(), "Join key list cannot be empty");
        ensure!(
            !self.status.source.is_empty() && !self.status.target.is_empty(),
            "Status source and target columns must be named"
        );
        ensure!(
            !self.missing_flags.suffix.is_empty(),
            "Missing-flag suffix cannot be empty"
        );
        for check in &self.range_checks {
            if let (Some(min), Some(max)) = (check.min, check.max) {
                ensure!(
                    min <= max,
                    "Range check on '{}' has min {min} above max {max}",
                    check.column
                );
            }
        }
        Ok(())
    }

    /// Schema of the persisted clean orders table: the orders schema plus the
    /// normalized status column and the boolean missing flags.
    pub fn clean_orders_schema(&self) -> CanonicalSchema {
        let schema = self
            .orders
            .schema
            .clone()
            .with_column(&self.status.target, ColumnType::String);
        self.missing_flags.columns.iter().fold(schema, |schema, column| {
            schema.with_column(
                &format!("{column}{}", self.missing_flags.suffix),
                ColumnType::Boolean,
            )
        })
    }

    /// Columns the analytics stage requires on the clean orders table.
    pub fn clean_orders_required(&self) -> Vec<String> {
        let mut required = self
            .orders
            .required_columns
            .iter()
            .filter(|name| **name != self.status.source)
            .cloned()
            .collect::<Vec<_>>();
        required.push(self.status.target.clone());
        required
    }
}
