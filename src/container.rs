//! Desktop-database container files (`.mdb`, `.accdb`).
//!
//! The binary format is never parsed here. Tables are discovered and exported
//! through the [`TableLister`] and [`RowExporter`] capabilities, which hand
//! back raw bytes; this module decodes them and parses the delimited export.
//! [`MdbTools`] implements both by shelling out to `mdb-tables` and
//! `mdb-export`.
//!
//! Every failure here is recovered: a listing failure yields no tables and an
//! export failure yields an empty table, so one bad table never aborts its
//! siblings.

use std::{path::Path, time::Duration};

use encoding_rs::Encoding;
use log::{debug, warn};

use crate::{
    encoding,
    model::{Row, TableData, Value},
    tool::{ToolCommand, ToolError},
};

pub trait TableLister {
    /// Raw output listing one table name per line.
    fn list_tables(&self, path: &Path) -> Result<Vec<u8>, ToolError>;
}

pub trait RowExporter {
    /// Raw delimited export of one table, header row first.
    fn export_table(&self, path: &Path, table: &str) -> Result<Vec<u8>, ToolError>;
}

/// Both container capabilities behind one object.
pub trait ContainerSource: TableLister + RowExporter {}

impl<T: TableLister + RowExporter> ContainerSource for T {}

#[derive(Debug, Clone)]
pub struct MdbTools {
    pub tables_program: String,
    pub export_program: String,
    pub list_timeout: Duration,
    pub export_timeout: Duration,
}

impl Default for MdbTools {
    fn default() -> Self {
        Self {
            tables_program: "mdb-tables".to_string(),
            export_program: "mdb-export".to_string(),
            list_timeout: Duration::from_secs(30),
            export_timeout: Duration::from_secs(60),
        }
    }
}

impl TableLister for MdbTools {
    fn list_tables(&self, path: &Path) -> Result<Vec<u8>, ToolError> {
        ToolCommand::new(&self.tables_program)
            .arg("-1")
            .arg(path)
            .run(self.list_timeout)
    }
}

impl RowExporter for MdbTools {
    fn export_table(&self, path: &Path, table: &str) -> Result<Vec<u8>, ToolError> {
        ToolCommand::new(&self.export_program)
            .arg(path)
            .arg(table)
            .run(self.export_timeout)
    }
}

/// Table names in the order the lister reports them. Duplicates are kept.
pub fn list_container_tables<L: TableLister + ?Sized>(
    lister: &L,
    path: &Path,
    encodings: &[&'static Encoding],
) -> Vec<String> {
    let output = match lister.list_tables(path) {
        Ok(output) => output,
        Err(err) => {
            warn!("Listing tables in {path:?} failed: {err}");
            return Vec::new();
        }
    };
    if output.iter().all(u8::is_ascii_whitespace) {
        warn!("Table listing for {path:?} was empty");
        return Vec::new();
    }
    let Some(decoded) = encoding::resolve_first(&output, encodings) else {
        warn!("Table listing for {path:?} matched none of the candidate encodings");
        return Vec::new();
    };
    debug!("Decoded table listing as {}", decoded.encoding.name());
    decoded
        .text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads up to `limit` data rows of `table`. Any failure yields an empty
/// table.
pub fn read_container_table<E: RowExporter + ?Sized>(
    exporter: &E,
    path: &Path,
    table: &str,
    limit: usize,
    encodings: &[&'static Encoding],
) -> TableData {
    let output = match exporter.export_table(path, table) {
        Ok(output) => output,
        Err(err) => {
            warn!("Exporting table '{table}' from {path:?} failed: {err}");
            return TableData::empty();
        }
    };
    if output.is_empty() {
        warn!("Export of table '{table}' produced no output");
        return TableData::empty();
    }
    let Some(decoded) = encoding::resolve_first(&output, encodings) else {
        warn!("Export of table '{table}' matched none of the candidate encodings");
        return TableData::empty();
    };
    debug!(
        "Decoded export of '{table}' as {}",
        decoded.encoding.name()
    );
    parse_export(&decoded.text, limit)
}

/// Parses delimited export text: the first record names the columns, the
/// following records (up to `limit`) are data. Empty cells become
/// [`Value::Null`].
pub fn parse_export(text: &str, limit: usize) -> TableData {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = match reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect::<Vec<_>>(),
        Err(err) => {
            warn!("Export header could not be parsed: {err}");
            return TableData::empty();
        }
    };

    let mut data = TableData {
        columns,
        rows: Vec::new(),
        truncated: false,
    };
    let mut skipped = 0usize;
    for (idx, record) in reader.records().enumerate() {
        if data.rows.len() >= limit {
            data.truncated = true;
            break;
        }
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                debug!("Skipping export row {}: {err}", idx + 2);
                skipped += 1;
                continue;
            }
        };
        let width = record.len().max(data.columns.len());
        let values = (0..width)
            .map(|col| record.get(col).map_or(Value::Null, Value::infer))
            .collect();
        data.rows.push(Row::bind(&data.columns, values));
    }
    if skipped > 0 {
        warn!("Skipped {skipped} unreadable export row(s)");
    }
    data
}
