//! Train-and-persist driver
//!
//! Loads `<train_dir>/train.csv`, cross-validates, reports the fold metric
//! and writes the fitted model to `<model_dir>/xgboost-model`. The table is
//! loaded before `model_dir` is touched, so a bad input never leaves a
//! partial artifact behind.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use xgbcv_core::save_model;

use crate::args::{Hyperparameters, ResolvedArgs};
use crate::cv::CrossValidator;
use crate::dataset::Dataset;
use crate::errors::TrainerError;

/// Name of the training table inside the training channel
pub const TRAIN_FILE_NAME: &str = "train.csv";

/// Summary of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model_path: PathBuf,
    pub k_fold_avg: f64,
    pub fold_scores: Vec<f64>,
    pub model_hash: String,
    pub rows: usize,
    pub feature_count: usize,
}

pub struct TrainingDriver<V> {
    validator: V,
}

impl<V: CrossValidator> TrainingDriver<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    /// Run with the resolved command line
    pub fn run(&self, args: &ResolvedArgs) -> Result<TrainingReport, TrainerError> {
        self.train_and_persist(&args.hyperparameters, &args.train_dir, &args.model_dir)
    }

    pub fn train_and_persist(
        &self,
        params: &Hyperparameters,
        train_dir: &Path,
        model_dir: &Path,
    ) -> Result<TrainingReport, TrainerError> {
        let train_path = train_dir.join(TRAIN_FILE_NAME);
        info!("Loading training table from: {}", train_path.display());
        let table = Dataset::from_csv(&train_path)?;
        info!(
            "Loaded {} rows with {} features",
            table.len(),
            table.feature_count
        );
        for (i, stats) in table.feature_stats().iter().enumerate() {
            tracing::debug!(
                feature = i,
                min = stats.min,
                max = stats.max,
                missing = stats.missing,
                "feature statistics"
            );
        }

        let outcome = self.validator.cross_validate(&table, params)?;

        // Scraped from stdout by the training platform's metric definitions.
        println!("RMSE average across folds: {}", outcome.k_fold_avg);
        info!(
            k_fold_avg = outcome.k_fold_avg,
            folds = outcome.fold_scores.len(),
            "cross-validation complete"
        );

        fs::create_dir_all(model_dir).map_err(|source| TrainerError::ModelDir {
            path: model_dir.to_path_buf(),
            source,
        })?;
        let model_path = save_model(model_dir, &outcome.model)?;
        let model_hash = outcome.model.hash_hex()?;
        info!("Stored trained model at {}", model_path.display());

        Ok(TrainingReport {
            model_path,
            k_fold_avg: outcome.k_fold_avg,
            fold_scores: outcome.fold_scores,
            model_hash,
            rows: table.len(),
            feature_count: table.feature_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::CvOutcome;
    use std::cell::Cell;
    use tempfile::tempdir;
    use xgbcv_core::{load_model, Model, Node, Objective, Tree, MODEL_FILE_NAME};

    /// Returns a fixed model and counts invocations
    struct StubValidator {
        calls: Cell<usize>,
        fail: bool,
    }

    impl StubValidator {
        fn ok() -> Self {
            Self { calls: Cell::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: Cell::new(0), fail: true }
        }
    }

    impl CrossValidator for StubValidator {
        fn cross_validate(&self, table: &Dataset, _params: &Hyperparameters) -> Result<CvOutcome, TrainerError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(TrainerError::CrossValidation("stub failure".to_string()));
            }
            let tree = Tree::new(vec![
                Node::internal(0, 0, 0.5, 1, 2),
                Node::leaf(1, -1.0),
                Node::leaf(2, 1.0),
            ]);
            Ok(CvOutcome {
                model: Model::new(Objective::SquaredError, 0.0, table.feature_count, vec![tree]),
                k_fold_avg: 0.25,
                fold_scores: vec![0.2, 0.3],
            })
        }
    }

    fn write_train_csv(dir: &Path) {
        fs::write(dir.join(TRAIN_FILE_NAME), "1,0\n0,1\n1,0\n0,1\n").unwrap();
    }

    #[test]
    fn test_success_writes_single_artifact() -> anyhow::Result<()> {
        let train = tempdir()?;
        let model_dir = tempdir()?;
        write_train_csv(train.path());

        let stub = StubValidator::ok();
        let report = TrainingDriver::new(&stub).train_and_persist(
            &Hyperparameters::default(),
            train.path(),
            model_dir.path(),
        )?;

        assert_eq!(stub.calls.get(), 1);
        assert_eq!(report.model_path, model_dir.path().join(MODEL_FILE_NAME));
        assert_eq!(report.k_fold_avg, 0.25);
        assert_eq!(report.rows, 4);
        let names: Vec<_> = fs::read_dir(model_dir.path())?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<std::io::Result<_>>()?;
        assert_eq!(names, vec![MODEL_FILE_NAME]);

        let loaded = load_model(model_dir.path())?;
        assert_eq!(loaded.predict(&[0.0]), -1.0);
        assert_eq!(loaded.hash_hex()?, report.model_hash);
        Ok(())
    }

    #[test]
    fn test_missing_table_fails_before_write() -> anyhow::Result<()> {
        let train = tempdir()?;
        let root = tempdir()?;
        let model_dir = root.path().join("model");

        let stub = StubValidator::ok();
        let err = TrainingDriver::new(&stub)
            .train_and_persist(&Hyperparameters::default(), train.path(), &model_dir)
            .unwrap_err();

        assert!(matches!(err, TrainerError::Dataset(_)));
        assert_eq!(stub.calls.get(), 0);
        assert!(!model_dir.exists());
        Ok(())
    }

    #[test]
    fn test_validator_failure_leaves_model_dir_empty() -> anyhow::Result<()> {
        let train = tempdir()?;
        let model_dir = tempdir()?;
        write_train_csv(train.path());

        let stub = StubValidator::failing();
        let err = TrainingDriver::new(&stub)
            .train_and_persist(&Hyperparameters::default(), train.path(), model_dir.path())
            .unwrap_err();

        assert!(matches!(err, TrainerError::CrossValidation(_)));
        assert_eq!(fs::read_dir(model_dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_unwritable_model_dir_fails() -> anyhow::Result<()> {
        let train = tempdir()?;
        write_train_csv(train.path());
        // A regular file where the model directory should be
        let blocker = train.path().join("not-a-dir");
        fs::write(&blocker, b"")?;

        let stub = StubValidator::ok();
        let err = TrainingDriver::new(&stub)
            .train_and_persist(&Hyperparameters::default(), train.path(), &blocker)
            .unwrap_err();

        assert!(matches!(err, TrainerError::ModelDir { .. }));
        Ok(())
    }
}
