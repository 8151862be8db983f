pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod frame;
pub mod io_utils;
pub mod join;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod schema;
pub mod table;
pub mod transform;

use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use encoding_rs::Encoding;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, InputOptions, ReportFormat},
    config::PipelineConfig,
    frame::Table,
    io_utils::MissingPolicy,
    pipeline::{CleanOutput, build_analytics, clean_orders},
    report::{DEFAULT_REPORT_TITLE, render_missingness_document, render_missingness_json},
    transform::{MissingnessReport, missingness_report},
};

pub const ORDERS_CLEAN_FILE: &str = "orders_clean.csv";
pub const USERS_FILE: &str = "users.csv";
pub const ANALYTICS_FILE: &str = "analytics_table.csv";
pub const MISSINGNESS_REPORT_STEM: &str = "missingness_orders";

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_curate", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => {
            let ctx = InputContext::new(&args.input)?;
            handle_clean(&ctx, &args.orders, &args.users, &args.out_dir, &args.reports_dir)
                .map(|_| ())
        }
        Commands::Analytics(args) => {
            let ctx = InputContext::new(&args.input)?;
            let orders = ctx.read(&args.orders, MissingPolicy::EmptyOnly)?;
            let users = ctx.read(&args.users, MissingPolicy::EmptyOnly)?;
            handle_analytics(&ctx, &orders, &users, &args.output)
        }
        Commands::Run(args) => {
            let ctx = InputContext::new(&args.input)?;
            let clean = handle_clean(
                &ctx,
                &args.orders,
                &args.users,
                &args.out_dir,
                &args.reports_dir,
            )?;
            handle_analytics(
                &ctx,
                &clean.orders_clean,
                &clean.users,
                &args.out_dir.join(ANALYTICS_FILE),
            )
        }
        Commands::Missingness(args) => handle_missingness(&args),
        Commands::Config(args) => {
            let config = PipelineConfig::load_or_default(args.config.as_deref())?;
            print!("{}", config.to_yaml_string()?);
            Ok(())
        }
    }
}

/// Resolved reader settings and configuration for one invocation.
struct InputContext {
    delimiter: Option<u8>,
    encoding: &'static Encoding,
    config: PipelineConfig,
}

impl InputContext {
    fn new(options: &InputOptions) -> Result<Self> {
        let encoding = io_utils::resolve_encoding(options.input_encoding.as_deref())?;
        let config = PipelineConfig::load_or_default(options.config.as_deref())?;
        if let Some(path) = &options.config {
            info!("Loaded pipeline config from {path:?}");
        }
        Ok(Self {
            delimiter: options.delimiter,
            encoding,
            config,
        })
    }

    fn read(&self, path: &Path, missing: MissingPolicy) -> Result<Table> {
        let delimiter = io_utils::resolve_input_delimiter(path, self.delimiter);
        debug!(
            "Reading '{}' with delimiter '{}' and encoding {}",
            path.display(),
            printable_delimiter(delimiter),
            self.encoding.name()
        );
        io_utils::read_table(path, delimiter, self.encoding, missing)
            .with_context(|| format!("Reading table from {path:?}"))
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        let delimiter = io_utils::resolve_input_delimiter(path, self.delimiter);
        io_utils::write_table(table, path, delimiter)
            .with_context(|| format!("Writing table to {path:?}"))?;
        info!(
            "Wrote {} row(s) x {} column(s) to {path:?}",
            table.row_count(),
            table.column_count()
        );
        Ok(())
    }
}

fn handle_clean(
    ctx: &InputContext,
    orders_path: &Path,
    users_path: &Path,
    out_dir: &Path,
    reports_dir: &Path,
) -> Result<CleanOutput> {
    info!("Loading raw inputs");
    let orders_raw = ctx.read(orders_path, MissingPolicy::Tokens)?;
    let users = ctx.read(users_path, MissingPolicy::Tokens)?;
    let output = clean_orders(&orders_raw, &users, &ctx.config).context("Cleaning orders")?;

    let (qmd_path, json_path) = report_paths(reports_dir);
    io_utils::write_text(
        &qmd_path,
        &render_missingness_document(DEFAULT_REPORT_TITLE, &output.report),
    )?;
    io_utils::write_text(&json_path, &render_missingness_json(&output.report)?)?;
    info!("Wrote missingness report: {qmd_path:?}, {json_path:?}");

    ctx.write(&output.orders_clean, &out_dir.join(ORDERS_CLEAN_FILE))?;
    ctx.write(&output.users, &out_dir.join(USERS_FILE))?;
    Ok(output)
}

fn handle_analytics(
    ctx: &InputContext,
    orders_clean: &Table,
    users: &Table,
    output: &Path,
) -> Result<()> {
    let analytics =
        build_analytics(orders_clean, users, &ctx.config).context("Building analytics table")?;
    ctx.write(&analytics.table, output)
}

fn handle_missingness(args: &cli::MissingnessArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let input = io_utils::read_table(&args.input, delimiter, encoding, MissingPolicy::Tokens)
        .with_context(|| format!("Reading table from {:?}", args.input))?;
    let report = missingness_report(&input);
    match args.format {
        ReportFormat::Table => {
            table::print_table(&MissingnessReport::headers(), &report.render_rows())
        }
        ReportFormat::Markdown => print!(
            "{}",
            table::render_markdown_table(&MissingnessReport::headers(), &report.render_rows())
        ),
        ReportFormat::Json => println!("{}", render_missingness_json(&report)?),
    }
    Ok(())
}

pub fn report_paths(reports_dir: &Path) -> (PathBuf, PathBuf) {
    (
        reports_dir.join(format!("{MISSINGNESS_REPORT_STEM}.qmd")),
        reports_dir.join(format!("{MISSINGNESS_REPORT_STEM}.json")),
    )
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
