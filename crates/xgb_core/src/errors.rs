//! Error types for model handling

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating, encoding, writing or loading a model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("Model artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Model artifact is corrupt: {0}")]
    Corrupt(String),

    #[error("Model artifact is incompatible: {0}")]
    Incompatible(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
