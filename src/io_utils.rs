//! I/O utilities for reading and writing tables as CSV.
//!
//! All file I/O in csv-curate flows through this module:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Tables**: [`read_table`] loads every cell as text, with a
//!   [`MissingPolicy`] deciding which cells are missing; [`write_table`]
//!   renders missing cells as empty fields, so tables this crate wrote are
//!   read back with [`MissingPolicy::EmptyOnly`].
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    data::{ColumnType, Value, is_missing_token},
    frame::{Column, Table},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// Which cell texts are read as missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Empty cells and placeholder tokens such as `NA` or `null`. For raw inputs.
    #[default]
    Tokens,
    /// Only empty cells. For tables written by [`write_table`], where text
    /// such as `null` is a real value.
    EmptyOnly,
}

impl MissingPolicy {
    pub fn is_missing(&self, raw: &str) -> bool {
        match self {
            MissingPolicy::Tokens => is_missing_token(raw),
            MissingPolicy::EmptyOnly => raw.is_empty(),
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
    has_headers: bool,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter, has_headers))
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => {
            ensure_parent_dir(p)?;
            Box::new(BufWriter::new(
                File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
            ))
        }
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(writer))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// Reads a headered CSV into a table of text columns.
pub fn read_table(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    missing: MissingPolicy,
) -> Result<Table> {
    let mut reader = open_csv_reader_from_path(path, delimiter, true)?;
    let headers = reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let mut cells: Vec<Vec<Option<Value>>> = vec![Vec::new(); headers.len()];
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        for (column, raw) in cells.iter_mut().zip(decoded) {
            column.push(if missing.is_missing(&raw) {
                None
            } else {
                Some(Value::String(raw))
            });
        }
    }
    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name, ColumnType::String, values))
        .collect();
    let table = Table::new(columns).with_context(|| format!("Building table from {path:?}"))?;
    debug!(
        "Read {} row(s) x {} column(s) from {path:?}",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

pub fn write_table(table: &Table, path: &Path, delimiter: u8) -> Result<()> {
    let mut writer = open_csv_writer(Some(path), delimiter)?;
    writer
        .write_record(table.column_names())
        .context("Writing headers")?;
    for row in 0..table.row_count() {
        let record = table
            .row(row)
            .into_iter()
            .map(|cell| cell.map(Value::as_display).unwrap_or_default());
        writer
            .write_record(record)
            .with_context(|| format!("Writing row {}", row + 2))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing output {path:?}"))?;
    Ok(())
}

pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, contents).with_context(|| format!("Writing {path:?}"))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("Creating directory {parent:?}")),
        _ => Ok(()),
    }
}
