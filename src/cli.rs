use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Validate, clean and join tabular batch data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Gate, enforce schema, normalize status and flag missing values in raw orders
    Clean(CleanArgs),
    /// Parse timestamps, join users and winsorize amounts from clean outputs
    Analytics(AnalyticsArgs),
    /// Run the clean and analytics stages back to back
    Run(RunArgs),
    /// Print a missingness report for any CSV file
    Missingness(MissingnessArgs),
    /// Print the effective pipeline configuration as YAML
    Config(ConfigArgs),
}

/// Options shared by every command that reads CSV input.
#[derive(Debug, Clone, Args)]
pub struct InputOptions {
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Pipeline configuration YAML (defaults reproduce the orders/users pipeline)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw orders CSV
    #[arg(long)]
    pub orders: PathBuf,
    /// Raw users CSV
    #[arg(long)]
    pub users: PathBuf,
    /// Directory receiving orders_clean.csv and users.csv
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: PathBuf,
    /// Directory receiving the missingness report (.qmd and .json)
    #[arg(long = "reports-dir")]
    pub reports_dir: PathBuf,
    #[command(flatten)]
    pub input: InputOptions,
}

#[derive(Debug, Args)]
pub struct AnalyticsArgs {
    /// Clean orders CSV written by `clean`
    #[arg(long)]
    pub orders: PathBuf,
    /// Users CSV written by `clean`
    #[arg(long)]
    pub users: PathBuf,
    /// Destination analytics CSV
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    #[command(flatten)]
    pub input: InputOptions,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Raw orders CSV
    #[arg(long)]
    pub orders: PathBuf,
    /// Raw users CSV
    #[arg(long)]
    pub users: PathBuf,
    /// Directory receiving the clean tables and analytics_table.csv
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: PathBuf,
    /// Directory receiving the missingness report (.qmd and .json)
    #[arg(long = "reports-dir")]
    pub reports_dir: PathBuf,
    #[command(flatten)]
    pub input: InputOptions,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum ReportFormat {
    #[default]
    Table,
    Markdown,
    Json,
}

#[derive(Debug, Args)]
pub struct MissingnessArgs {
    /// Input CSV file to analyze ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: ReportFormat,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Configuration file to load and validate before printing
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn run_command_parses_flattened_input_options() {
        let cli = Cli::try_parse_from([
            "csv-curate",
            "run",
            "--orders",
            "orders.csv",
            "--users",
            "users.csv",
            "-o",
            "out",
            "--reports-dir",
            "reports",
            "--delimiter",
            "semicolon",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.input.delimiter, Some(b';'));
                assert!(args.input.config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
