//! Column and table transforms: text normalization, missingness, timestamps,
//! and outlier clipping. Every function returns a new column or table.

pub mod missing;
pub mod string_ops;
pub mod text;
pub mod time;
pub mod winsor;

pub use missing::{MissingnessEntry, MissingnessReport, add_missing_flags, missingness_report};
pub use text::{CategoryMapping, apply_mapping, normalize_text, unmapped_values};
pub use time::{add_time_parts, parse_datetime};
pub use winsor::{PercentileBounds, winsorize};
