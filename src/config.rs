use std::{env, fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::{container::MdbTools, encoding};

/// Row cap for preview and analysis extraction.
pub const DEFAULT_ROW_LIMIT: usize = 1000;
/// Row cap for explicit full-table materialization.
pub const FULL_ROW_LIMIT: usize = 100_000;
pub const PREVIEW_ROWS: usize = 10;

pub const MDB_TABLES_ENV: &str = "TABLE_EXTRACT_MDB_TABLES";
pub const MDB_EXPORT_ENV: &str = "TABLE_EXTRACT_MDB_EXPORT";

/// Tunables for one extraction call.
///
/// Loaded from defaults, then an optional YAML file, then the
/// `TABLE_EXTRACT_MDB_*` environment overrides; CLI flags are applied last by
/// the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractOptions {
    pub row_limit: usize,
    pub preview_rows: usize,
    pub list_timeout_secs: u64,
    pub export_timeout_secs: u64,
    pub container_encodings: Vec<String>,
    pub dump_encoding: String,
    pub mdb_tables: String,
    pub mdb_export: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
            preview_rows: PREVIEW_ROWS,
            list_timeout_secs: 30,
            export_timeout_secs: 60,
            container_encodings: encoding::CONTAINER_CANDIDATES
                .iter()
                .map(|enc| enc.name().to_ascii_lowercase())
                .collect(),
            dump_encoding: "utf-8".to_string(),
            mdb_tables: "mdb-tables".to_string(),
            mdb_export: "mdb-export".to_string(),
        }
    }
}

impl ExtractOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let options = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        Ok(options)
    }

    /// Defaults or `path`, with environment overrides applied.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut options = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        options.apply_env();
        Ok(options)
    }

    pub fn apply_env(&mut self) {
        if let Some(program) = env::var_os(MDB_TABLES_ENV).filter(|value| !value.is_empty()) {
            self.mdb_tables = program.to_string_lossy().into_owned();
        }
        if let Some(program) = env::var_os(MDB_EXPORT_ENV).filter(|value| !value.is_empty()) {
            self.mdb_export = program.to_string_lossy().into_owned();
        }
    }

    pub fn container_candidates(&self) -> Result<Vec<&'static Encoding>> {
        encoding::resolve_labels(&self.container_encodings)
            .context("Resolving container encodings")
    }

    pub fn dump_encoding(&self) -> Result<&'static Encoding> {
        encoding::resolve_label(&self.dump_encoding).context("Resolving dump encoding")
    }

    pub fn mdb_tools(&self) -> MdbTools {
        MdbTools {
            tables_program: self.mdb_tables.clone(),
            export_program: self.mdb_export.clone(),
            list_timeout: Duration::from_secs(self.list_timeout_secs),
            export_timeout: Duration::from_secs(self.export_timeout_secs),
        }
    }
}
