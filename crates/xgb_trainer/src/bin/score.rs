//! Load a persisted model and print one prediction per input row.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use xgbcv_core::load_model;
use xgbcv_trainer::args::{path_or_env, ProcessEnv, DEFAULT_MODEL_DIR, MODEL_DIR_ENV};
use xgbcv_trainer::dataset::read_feature_rows;
use xgbcv_trainer::init_logging;

#[derive(Parser, Debug)]
#[command(name = "score")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score a headerless feature CSV with a trained xgboost-model", long_about = None)]
struct Args {
    /// Headerless CSV of feature rows (no label column)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory holding xgboost-model [env: SM_MODEL_DIR]
    #[arg(long = "model_dir")]
    model_dir: Option<PathBuf>,

    /// Print raw margins instead of transformed predictions
    #[arg(long)]
    margin: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to set tracing subscriber")?;

    let model_dir = path_or_env(args.model_dir, &ProcessEnv, MODEL_DIR_ENV, DEFAULT_MODEL_DIR);

    let model = load_model(&model_dir)
        .with_context(|| format!("Failed to load model from {}", model_dir.display()))?;
    info!(
        "Loaded {} model with {} trees over {} features",
        model.objective,
        model.num_trees(),
        model.feature_count
    );

    let rows = read_feature_rows(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    for (i, row) in rows.iter().enumerate() {
        if row.len() != model.feature_count {
            anyhow::bail!(
                "Row {}: expected {} features, got {}",
                i + 1,
                model.feature_count,
                row.len()
            );
        }
        let value = if args.margin {
            model.predict_margin(row)
        } else {
            model.predict(row)
        };
        println!("{}", value);
    }

    Ok(())
}
