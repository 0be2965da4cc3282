//! xgbcv trainer: cross-validated gradient boosting for training containers
//!
//! Resolves hyperparameters and channel paths, reads the training table,
//! cross-validates a boosted tree ensemble and persists the refit model as
//! `<model_dir>/xgboost-model`.

pub mod args;
pub mod cart;
pub mod cv;
pub mod dataset;
pub mod deterministic;
pub mod driver;
pub mod errors;
pub mod trainer;

use tracing::Level;
use tracing_subscriber::EnvFilter;

pub use args::{parse_known_args, EnvSource, Hyperparameters, ProcessEnv, ResolvedArgs};
pub use cv::{CrossValidator, CvOutcome, KFoldCrossValidator};
pub use dataset::Dataset;
pub use driver::{TrainingDriver, TrainingReport};
pub use errors::{DatasetError, TrainerError};
pub use trainer::{GbdtConfig, GbdtTrainer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when `verbose`.
pub fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fallback = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
}
