use std::path::PathBuf;

use thiserror::Error;

use crate::detection::EngineError;
use crate::detection::summary::SummaryError;

/// Errors raised by the predict and train workflows.
#[derive(Debug, Error)]
pub enum PlcError {
    /// An argument failed validation before any external call was made.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A detection summary could not be turned into class counts.
    #[error("malformed detection summary: {0}")]
    MalformedSummary(#[from] SummaryError),

    /// The wrapped detection toolkit failed. The inner error is passed through as-is.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Two rows with the same image name were added to one table.
    #[error("duplicate row for image '{0}'")]
    DuplicateRow(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A results table file could not be read back.
    #[error("invalid table file {path} (line {line}): {reason}")]
    Table {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl PlcError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlcError>;
