//! Extraction dispatcher: picks the parser path from the declared format and
//! assembles the uniform [`ParsedDatabase`].

use std::{
    collections::HashSet,
    fs::{self, File},
    io::BufReader,
    path::Path,
};

use chrono::Utc;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};

use crate::{
    accumulator::RowAccumulator,
    config::{ExtractOptions, FULL_ROW_LIMIT},
    container::{self, ContainerSource},
    dump::DumpScanner,
    encoding,
    error::ExtractError,
    model::{ParsedDatabase, SourceFormat, TableData, TableExtract},
};

const BACKUP_NOTE: &str = "Backup images must be restored into a database server before their \
                           tables can be read; only file metadata was recorded.";

/// Extracts every table of `path`, choosing the path from its extension.
pub fn extract(path: &Path, options: &ExtractOptions) -> Result<ParsedDatabase, ExtractError> {
    let format = SourceFormat::from_path(path)?;
    let tools = options.mdb_tools();
    extract_with(path, format, &tools, options)
}

/// Extraction with an explicit format and container source.
pub fn extract_with(
    path: &Path,
    format: SourceFormat,
    source: &dyn ContainerSource,
    options: &ExtractOptions,
) -> Result<ParsedDatabase, ExtractError> {
    let metadata = fs::metadata(path).map_err(|err| ExtractError::io(path, err))?;
    info!("Extracting {:?} as {format}", path);

    let mut accumulator = RowAccumulator::new(options.row_limit);
    let mut note = None;
    let tables = match format {
        SourceFormat::Container => {
            let encodings = container_candidates(options);
            let names = container::list_container_tables(source, path, &encodings);
            let mut tables = Vec::with_capacity(names.len());
            for name in unique(names) {
                let data = container::read_container_table(
                    source,
                    path,
                    &name,
                    accumulator.limit(),
                    &encodings,
                );
                accumulator.record(data.rows.len());
                tables.push(TableExtract::from_data(name, data, options.preview_rows));
            }
            tables
        }
        SourceFormat::Dump => {
            let text = read_dump(path, dump_encoding(options))?;
            let scanner = DumpScanner::new(&text);
            let mut tables = Vec::new();
            for definition in scanner.tables() {
                let mut sink = accumulator.table(&definition.name, definition.columns);
                scanner.collect_rows(&mut sink);
                let data = accumulator.finish(sink);
                tables.push(TableExtract::from_data(
                    definition.name,
                    data,
                    options.preview_rows,
                ));
            }
            tables
        }
        SourceFormat::BackupStub => {
            note = Some(BACKUP_NOTE.to_string());
            Vec::new()
        }
    };

    let parsed = ParsedDatabase {
        file_name: file_name(path),
        file_size: metadata.len(),
        file_type: format,
        total_records: accumulator.total_records(),
        tables,
        parsed_at: Utc::now(),
        note,
    };
    info!(
        "Extracted {} table(s) and {} record(s) from {:?}",
        parsed.tables.len(),
        parsed.total_records,
        path
    );
    Ok(parsed)
}

/// Table names of `path` in declared order.
pub fn list_tables(path: &Path, options: &ExtractOptions) -> Result<Vec<String>, ExtractError> {
    let format = SourceFormat::from_path(path)?;
    list_tables_with(path, format, &options.mdb_tools(), options)
}

pub fn list_tables_with(
    path: &Path,
    format: SourceFormat,
    source: &dyn ContainerSource,
    options: &ExtractOptions,
) -> Result<Vec<String>, ExtractError> {
    match format {
        SourceFormat::Container => Ok(container::list_container_tables(
            source,
            path,
            &container_candidates(options),
        )),
        SourceFormat::Dump => {
            let text = read_dump(path, dump_encoding(options))?;
            Ok(DumpScanner::new(&text)
                .tables()
                .into_iter()
                .map(|definition| definition.name)
                .collect())
        }
        SourceFormat::BackupStub => Ok(Vec::new()),
    }
}

/// Reads up to `limit` rows of one table.
pub fn read_table(
    path: &Path,
    table: &str,
    limit: usize,
    options: &ExtractOptions,
) -> Result<TableData, ExtractError> {
    let format = SourceFormat::from_path(path)?;
    read_table_with(path, format, table, limit, &options.mdb_tools(), options)
}

/// Reads one table with the full-materialization cap.
pub fn read_full_table(
    path: &Path,
    table: &str,
    options: &ExtractOptions,
) -> Result<TableData, ExtractError> {
    read_table(path, table, FULL_ROW_LIMIT, options)
}

pub fn read_table_with(
    path: &Path,
    format: SourceFormat,
    table: &str,
    limit: usize,
    source: &dyn ContainerSource,
    options: &ExtractOptions,
) -> Result<TableData, ExtractError> {
    match format {
        SourceFormat::Container => Ok(container::read_container_table(
            source,
            path,
            table,
            limit,
            &container_candidates(options),
        )),
        SourceFormat::Dump => {
            let text = read_dump(path, dump_encoding(options))?;
            Ok(DumpScanner::new(&text).read_table(table, limit))
        }
        SourceFormat::BackupStub => Ok(TableData::empty()),
    }
}

fn read_dump(path: &Path, encoding: &'static Encoding) -> Result<String, ExtractError> {
    let file = File::open(path).map_err(|err| ExtractError::io(path, err))?;
    encoding::read_lossy(BufReader::new(file), encoding).map_err(|err| ExtractError::io(path, err))
}

// Misconfigured labels fall back to the built-in lists rather than failing
// the extraction.
fn container_candidates(options: &ExtractOptions) -> Vec<&'static Encoding> {
    options.container_candidates().unwrap_or_else(|err| {
        warn!("{err:#}; using default container encodings");
        encoding::CONTAINER_CANDIDATES.to_vec()
    })
}

fn dump_encoding(options: &ExtractOptions) -> &'static Encoding {
    options.dump_encoding().unwrap_or_else(|err| {
        warn!("{err:#}; decoding dump as UTF-8");
        UTF_8
    })
}

fn unique(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| {
            let fresh = seen.insert(name.clone());
            if !fresh {
                debug!("Skipping duplicate table '{name}'");
            }
            fresh
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
