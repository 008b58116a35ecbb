//! Plugin-level error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced during plugin initialization and housekeeping.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },
    #[error("telemetry error: {0}")]
    Telemetry(#[from] csv::Error),
    #[error("failed to patch {count} budget site(s)")]
    Patch { count: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
