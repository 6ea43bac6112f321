pub mod accumulator;
pub mod cli;
pub mod config;
pub mod container;
pub mod dump;
pub mod encoding;
pub mod error;
pub mod export;
pub mod extract;
pub mod model;
pub mod preview;
pub mod table;
pub mod tokenizer;
pub mod tool;

use std::{
    env,
    fs::File,
    io::{self, BufWriter, Write},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, SourceArgs},
    config::{ExtractOptions, FULL_ROW_LIMIT},
    model::SourceFormat,
};

pub use crate::{
    config::DEFAULT_ROW_LIMIT,
    error::ExtractError,
    extract::{extract, extract_with, list_tables, read_full_table, read_table},
    model::{ParsedDatabase, Row, TableData, TableExtract, Value},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("table_extract", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => handle_extract(&args),
        Commands::Tables(args) => handle_tables(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Export(args) => export::execute(&args),
    }
}

fn handle_extract(args: &cli::ExtractArgs) -> Result<()> {
    let mut options = resolve_options(&args.source)?;
    if args.full {
        options.row_limit = FULL_ROW_LIMIT;
    } else if let Some(limit) = args.limit {
        options.row_limit = limit;
    }
    if let Some(rows) = args.preview_rows {
        options.preview_rows = rows;
    }
    debug!("Extraction options: {options:?}");

    let input = &args.source.input;
    let format = resolve_format(&args.source)?;
    let parsed = extract::extract_with(input, format, &options.mdb_tools(), &options)
        .with_context(|| format!("Extracting {input:?}"))?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    write_json(writer, &parsed, args.compact)?;
    if let Some(path) = &args.output {
        info!(
            "Wrote {} table(s) with {} record(s) to {path:?}",
            parsed.tables.len(),
            parsed.total_records
        );
    }
    Ok(())
}

fn handle_tables(args: &cli::TablesArgs) -> Result<()> {
    let options = resolve_options(&args.source)?;
    let input = &args.source.input;
    let format = resolve_format(&args.source)?;
    let tables = extract::list_tables_with(input, format, &options.mdb_tools(), &options)
        .with_context(|| format!("Listing tables in {input:?}"))?;
    let mut stdout = io::stdout().lock();
    for table in &tables {
        writeln!(stdout, "{table}")?;
    }
    info!("Found {} table(s) in {input:?}", tables.len());
    Ok(())
}

fn write_json<W: Write>(mut writer: W, parsed: &ParsedDatabase, compact: bool) -> Result<()> {
    let serialized = if compact {
        serde_json::to_writer(&mut writer, parsed)
    } else {
        serde_json::to_writer_pretty(&mut writer, parsed)
    };
    serialized.context("Serializing extraction result")?;
    writeln!(writer)?;
    writer.flush().context("Flushing extraction result")
}

pub(crate) fn resolve_options(source: &SourceArgs) -> Result<ExtractOptions> {
    let mut options = ExtractOptions::resolve(source.config.as_deref())?;
    if let Some(label) = &source.dump_encoding {
        options.dump_encoding = label.clone();
    }
    if !source.container_encodings.is_empty() {
        options.container_encodings = source
            .container_encodings
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
    }
    // Surface bad labels here; the library falls back to defaults instead.
    options.dump_encoding()?;
    options.container_candidates()?;
    Ok(options)
}

pub(crate) fn resolve_format(source: &SourceArgs) -> Result<SourceFormat> {
    match source.format {
        Some(format) => Ok(format.into()),
        None => Ok(SourceFormat::from_path(&source.input)?),
    }
}
