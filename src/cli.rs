use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::SourceFormat;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Extract tables from legacy database containers and SQL dumps",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract every table into the uniform JSON table model
    Extract(ExtractArgs),
    /// List the tables a file declares
    Tables(TablesArgs),
    /// Show the first rows of one table as an aligned text table
    Preview(PreviewArgs),
    /// Write one table as CSV
    Export(ExportArgs),
}

/// Options shared by every command.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Container (.mdb/.accdb), dump (.sql/.mysql) or backup (.bak) file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Treat the input as this format instead of deriving it from the extension
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// YAML file with extraction options
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Character encoding of dump files (defaults to utf-8)
    #[arg(long = "dump-encoding")]
    pub dump_encoding: Option<String>,
    /// Candidate encodings for container exports, tried in order
    #[arg(long = "container-encodings", value_delimiter = ',')]
    pub container_encodings: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Destination JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Maximum rows captured per table
    #[arg(long)]
    pub limit: Option<usize>,
    /// Capture up to the full-extraction cap instead of the preview cap
    #[arg(long, conflicts_with = "limit")]
    pub full: bool,
    /// Rows included in each table preview
    #[arg(long = "preview-rows")]
    pub preview_rows: Option<usize>,
    /// Emit single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Args)]
pub struct TablesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Table to preview
    #[arg(short = 't', long = "table")]
    pub table: String,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Table to export
    #[arg(short = 't', long = "table")]
    pub table: String,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Maximum rows to export (defaults to the full-extraction cap)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum FormatArg {
    Container,
    Dump,
    Backup,
}

impl From<FormatArg> for SourceFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Container => SourceFormat::Container,
            FormatArg::Dump => SourceFormat::Dump,
            FormatArg::Backup => SourceFormat::BackupStub,
        }
    }
}
