//! Training entrypoint
//!
//! Resolves hyperparameters from flags and the container environment,
//! cross-validates and writes `<model_dir>/xgboost-model`.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use xgbcv_trainer::{init_logging, parse_known_args, KFoldCrossValidator, ProcessEnv, TrainingDriver};

fn main() -> Result<()> {
    let args = match parse_known_args(std::env::args_os(), &ProcessEnv) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };

    init_logging(args.verbose)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to set tracing subscriber")?;

    info!("xgbcv trainer v{}", env!("CARGO_PKG_VERSION"));
    if !args.discarded.is_empty() {
        warn!("Ignoring unrecognized arguments: {}", args.discarded.join(" "));
    }

    let hyperparameters = serde_json::to_string(&args.hyperparameters)
        .context("Failed to serialize hyperparameters")?;
    info!("Hyperparameters: {}", hyperparameters);
    info!("Training channel: {}", args.train_dir.display());
    info!("Model directory: {}", args.model_dir.display());

    let driver = TrainingDriver::new(KFoldCrossValidator);
    let report = driver.run(&args).context("Training failed")?;

    debug!(fold_scores = ?report.fold_scores, "per-fold RMSE");
    info!("✓ Training completed successfully");
    info!("  Rows: {} ({} features)", report.rows, report.feature_count);
    info!("  Model: {}", report.model_path.display());
    info!("  Hash: {}", report.model_hash);

    Ok(())
}
