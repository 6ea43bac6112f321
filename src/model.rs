//! Uniform table model shared by every extraction path.
//!
//! A [`ParsedDatabase`] is built fresh per extraction call and is serialized
//! by the caller as:
//!
//! ```json
//! { "file_name": "plant.sql", "file_size": 2048, "file_type": "dump",
//!   "tables": [ { "table_name": "sensors", "columns": ["id", "state"],
//!                 "row_count": 2, "preview": [ {"id": 1, "state": "ok"} ],
//!                 "full_rows_available": false } ],
//!   "total_records": 2, "parsed_at": "2024-05-06T14:30:00Z" }
//! ```

use std::{fmt, path::Path};

use chrono::{DateTime, Utc};
use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Container,
    BackupStub,
    Dump,
}

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Result<Self, ExtractError> {
        let lowered = ext.trim_start_matches('.').to_ascii_lowercase();
        match lowered.as_str() {
            "mdb" | "accdb" => Ok(SourceFormat::Container),
            "sql" | "mysql" => Ok(SourceFormat::Dump),
            "bak" => Ok(SourceFormat::BackupStub),
            _ => Err(ExtractError::UnsupportedFormat(format!(".{lowered}"))),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Container => "container",
            SourceFormat::BackupStub => "backup_stub",
            SourceFormat::Dump => "dump",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell. Serializes as JSON `null`, a number, or a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Types an unquoted literal: integer, then float, else text. Empty input
    /// is null.
    pub fn infer(raw: &str) -> Value {
        if raw.is_empty() {
            return Value::Null;
        }
        if let Ok(parsed) = raw.parse::<i64>() {
            return Value::Integer(parsed);
        }
        match raw.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() && looks_numeric(raw) => Value::Float(parsed),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

// Rejects "inf", "NaN" and friends that `f64::from_str` accepts.
fn looks_numeric(raw: &str) -> bool {
    raw.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Ordered mapping from column key to value, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    /// Binds `values` to `columns` by position. Values past the known
    /// columns are keyed by their zero-based index.
    pub fn bind(columns: &[String], values: Vec<Value>) -> Self {
        let cells = values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| {
                let key = columns
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| idx.to_string());
                (key, value)
            })
            .collect();
        Row { cells }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (key, value) in &self.cells {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Rows read from one table by a per-table read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// True when the row limit stopped the read before the source ran out.
    pub truncated: bool,
}

impl TableData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Column keys for rendering: declared columns, widened with positional
    /// keys when rows carry more cells than the header names.
    pub fn headers(&self) -> Vec<String> {
        let width = self
            .rows
            .iter()
            .map(Row::len)
            .max()
            .unwrap_or(0)
            .max(self.columns.len());
        (0..width)
            .map(|idx| {
                self.columns
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| idx.to_string())
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableExtract {
    pub table_name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub preview: Vec<Row>,
    pub full_rows_available: bool,
}

impl TableExtract {
    pub fn from_data(table_name: String, data: TableData, preview_rows: usize) -> Self {
        let row_count = data.rows.len();
        let preview = data.rows.into_iter().take(preview_rows).collect();
        TableExtract {
            table_name,
            columns: data.columns,
            row_count,
            preview,
            full_rows_available: data.truncated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDatabase {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: SourceFormat,
    pub tables: Vec<TableExtract>,
    pub total_records: usize,
    pub parsed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ParsedDatabase {
    pub fn table(&self, name: &str) -> Option<&TableExtract> {
        self.tables.iter().find(|table| table.table_name == name)
    }
}
