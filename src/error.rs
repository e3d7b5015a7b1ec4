//! Error types for the extraction pipeline.

use overtime_types::selection::ContentKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OvertimeError {
    #[error("Selection has no nodes")]
    EmptySelection,
    #[error("Ambiguous selection: {0}")]
    AmbiguousSelection(String),
    #[error("Selection content {0:?} is not supported by this evaluator")]
    UnsupportedSelection(ContentKind),
    #[error("Snapshot carries more than one time step where exactly one was requested")]
    MoreThanOneIndices,
    #[error("Extraction was interrupted")]
    Interrupted,
    #[error("Collective operation failed: {0}")]
    Collective(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "toml")]
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[cfg(feature = "toml")]
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OvertimeError>;
