//! xgbcv core: boosted tree models and their on-disk artifact
//!
//! Modules:
//! - `gbdt`: tree ensemble types, objectives and inference
//! - `artifact`: the `xgboost-model` file written by training and read by the loader
//! - `errors`: error types shared by both

pub mod artifact;
pub mod errors;
pub mod gbdt;

pub use artifact::{load_model, model_path, save_model, MODEL_FILE_NAME};
pub use errors::ModelError;
pub use gbdt::{Model, ModelMetadata, Node, Objective, Tree};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
