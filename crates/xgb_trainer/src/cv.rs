//! K-fold cross-validation
//!
//! The driver only depends on the [`CrossValidator`] trait; the binary uses
//! [`KFoldCrossValidator`], tests can substitute their own.

use tracing::{debug, info};
use xgbcv_core::Model;

use crate::args::Hyperparameters;
use crate::dataset::Dataset;
use crate::deterministic::kfold_partitions;
use crate::errors::TrainerError;
use crate::trainer::{rmse, GbdtTrainer};

/// Result of a cross-validated fit
#[derive(Debug, Clone)]
pub struct CvOutcome {
    /// Model to persist
    pub model: Model,
    /// Mean held-out RMSE across folds
    pub k_fold_avg: f64,
    /// Held-out RMSE per fold, in fold order
    pub fold_scores: Vec<f64>,
}

/// Fits a model on a table and reports an average fold metric
pub trait CrossValidator {
    fn cross_validate(&self, table: &Dataset, params: &Hyperparameters) -> Result<CvOutcome, TrainerError>;
}

impl<T: CrossValidator + ?Sized> CrossValidator for &T {
    fn cross_validate(&self, table: &Dataset, params: &Hyperparameters) -> Result<CvOutcome, TrainerError> {
        (**self).cross_validate(table, params)
    }
}

/// Seeded K-fold cross-validation of the GBDT trainer.
///
/// Each fold is scored by a model trained on the other K-1 folds; the
/// returned model is refit on the whole table.
#[derive(Debug, Default, Clone, Copy)]
pub struct KFoldCrossValidator;

impl CrossValidator for KFoldCrossValidator {
    fn cross_validate(&self, table: &Dataset, params: &Hyperparameters) -> Result<CvOutcome, TrainerError> {
        let k = params.k;
        if k < 2 {
            return Err(TrainerError::CrossValidation(format!(
                "K must be at least 2, got {}",
                k
            )));
        }
        if k > table.len() {
            return Err(TrainerError::CrossValidation(format!(
                "K = {} exceeds the {} rows in the training table",
                k,
                table.len()
            )));
        }

        let trainer = GbdtTrainer::new(params.gbdt_config());
        let folds = kfold_partitions(table.len(), k, params.seed);

        let mut fold_scores = Vec::with_capacity(k);
        for (fold_idx, holdout) in folds.iter().enumerate() {
            let train_idx: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, fold)| fold.iter().copied())
                .collect();

            let model = trainer.train(&table.subset(&train_idx))?;
            let score = rmse(&model, &table.subset(holdout));
            debug!(
                fold = fold_idx + 1,
                train_rows = train_idx.len(),
                holdout_rows = holdout.len(),
                rmse = score,
                "fold scored"
            );
            fold_scores.push(score);
        }

        let k_fold_avg = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        if !k_fold_avg.is_finite() {
            return Err(TrainerError::CrossValidation(format!(
                "average fold RMSE is not finite: {}",
                k_fold_avg
            )));
        }

        info!(rows = table.len(), "refitting on the full training table");
        let model = trainer.train(table)?;

        Ok(CvOutcome {
            model,
            k_fold_avg,
            fold_scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_table(rows: usize) -> Dataset {
        Dataset::new(
            (0..rows).map(|i| 2.0 * i as f64 + 1.0).collect(),
            (0..rows).map(|i| vec![i as f64]).collect(),
        )
        .unwrap()
    }

    fn params(k: usize) -> Hyperparameters {
        Hyperparameters {
            k,
            num_round: 20,
            eta: 0.3,
            max_depth: 3,
            ..Hyperparameters::default()
        }
    }

    #[test]
    fn test_average_is_mean_of_folds() -> anyhow::Result<()> {
        let outcome = KFoldCrossValidator.cross_validate(&linear_table(20), &params(4))?;

        assert_eq!(outcome.fold_scores.len(), 4);
        let mean = outcome.fold_scores.iter().sum::<f64>() / 4.0;
        assert!((outcome.k_fold_avg - mean).abs() < 1e-12);
        assert!(outcome.fold_scores.iter().all(|s| s.is_finite() && *s >= 0.0));
        Ok(())
    }

    #[test]
    fn test_final_model_is_fit_on_all_rows() -> anyhow::Result<()> {
        let outcome = KFoldCrossValidator.cross_validate(&linear_table(12), &params(3))?;
        assert_eq!(outcome.model.metadata.training_rows, 12);
        assert_eq!(outcome.model.trees.len(), 20);
        Ok(())
    }

    #[test]
    fn test_same_seed_same_scores() -> anyhow::Result<()> {
        let table = linear_table(15);
        let a = KFoldCrossValidator.cross_validate(&table, &params(5))?;
        let b = KFoldCrossValidator.cross_validate(&table, &params(5))?;
        assert_eq!(a.fold_scores, b.fold_scores);
        assert_eq!(a.model.trees, b.model.trees);
        Ok(())
    }

    #[test]
    fn test_k_bounds() {
        let table = linear_table(4);
        for k in [0, 1, 5] {
            assert!(matches!(
                KFoldCrossValidator.cross_validate(&table, &params(k)),
                Err(TrainerError::CrossValidation(_))
            ));
        }
        assert!(KFoldCrossValidator.cross_validate(&table, &params(4)).is_ok());
    }

    #[test]
    fn test_overflowing_errors_are_rejected() {
        // Squared residuals between ±1e308 overflow to infinity
        let table = Dataset::new(
            vec![1e308, -1e308, 1e308, -1e308],
            (0..4).map(|i| vec![i as f64]).collect(),
        )
        .unwrap();
        let p = Hyperparameters {
            max_depth: 0,
            ..params(2)
        };

        assert!(KFoldCrossValidator.cross_validate(&table, &p).is_err());
    }

    #[test]
    fn test_training_failure_propagates() {
        let mut p = params(2);
        p.eta = -1.0;
        assert!(matches!(
            KFoldCrossValidator.cross_validate(&linear_table(6), &p),
            Err(TrainerError::Training(_))
        ));
    }
}
