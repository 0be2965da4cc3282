use std::path::PathBuf;
use thiserror::Error;
use xgbcv_core::ModelError;

/// Errors raised while reading the training table.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("training file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}, column {column}: invalid number {value:?}")]
    InvalidNumber {
        line: u64,
        column: usize,
        value: String,
    },

    #[error("line {line}: label must be a finite number, got {value:?}")]
    InvalidLabel { line: u64, value: String },

    #[error("line {line}: expected {expected} columns, got {found}")]
    Ragged {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: expected a label and at least one feature")]
    TooFewColumns { line: u64 },

    #[error("dataset is empty")]
    Empty,

    #[error("{labels} labels for {rows} feature rows")]
    RowCountMismatch { labels: usize, rows: usize },
}

/// Errors returned by the training driver.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("training error: {0}")]
    Training(String),

    #[error("cross-validation error: {0}")]
    CrossValidation(String),

    #[error("failed to prepare model directory {}: {source}", .path.display())]
    ModelDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model persistence error: {0}")]
    Persist(#[from] ModelError),
}
