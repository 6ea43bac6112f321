use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures surfaced to callers of the extraction entry points.
///
/// Everything else (tool failures, undecodable output, malformed statements)
/// is absorbed into reduced row or table counts and only logged.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file format '{0}'")]
    UnsupportedFormat(String),

    #[error("Reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }
}
