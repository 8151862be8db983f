//! Missingness report documents.

use anyhow::{Context, Result};

use crate::{table::render_markdown_table, transform::MissingnessReport};

pub const DEFAULT_REPORT_TITLE: &str = "Missingness Report (Orders)";

/// Quarto document with YAML front matter and the report as a markdown table.
pub fn render_missingness_document(title: &str, report: &MissingnessReport) -> String {
    let table = render_markdown_table(&MissingnessReport::headers(), &report.render_rows());
    [
        "---".to_string(),
        format!("title: \"{}\"", title.replace('"', "\\\"")),
        "format: html".to_string(),
        "---".to_string(),
        String::new(),
        "## Missingness table".to_string(),
        String::new(),
        table,
    ]
    .join("\n")
}

pub fn render_missingness_json(report: &MissingnessReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Serializing missingness report")
}
