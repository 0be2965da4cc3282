//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Second-order boosting: each round fits one regression tree to the
//! gradients and hessians of the objective at the current margins.

use serde::Serialize;
use xgbcv_core::gbdt::{Model, ModelMetadata, Objective, Tree};

use crate::cart::{CartBuilder, TreeConfig};
use crate::dataset::Dataset;
use crate::errors::TrainerError;

/// GBDT training configuration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GbdtConfig {
    pub num_round: usize,
    pub max_depth: usize,
    pub eta: f64,
    pub objective: Objective,
    pub min_child_weight: f64,
    pub lambda: f64,
    pub gamma: f64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            num_round: 10,
            max_depth: 6,
            eta: 0.3,
            objective: Objective::SquaredError,
            min_child_weight: 1.0,
            lambda: 1.0,
            gamma: 0.0,
        }
    }
}

impl GbdtConfig {
    pub fn validate(&self) -> Result<(), TrainerError> {
        let check = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(TrainerError::Training(what.to_string()))
            }
        };
        check(self.eta.is_finite() && self.eta > 0.0, "eta must be a positive number")?;
        check(self.lambda.is_finite() && self.lambda >= 0.0, "lambda must be non-negative")?;
        check(self.gamma.is_finite() && self.gamma >= 0.0, "gamma must be non-negative")?;
        check(
            self.min_child_weight.is_finite() && self.min_child_weight >= 0.0,
            "min_child_weight must be non-negative",
        )
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_child_weight: self.min_child_weight,
            lambda: self.lambda,
            gamma: self.gamma,
            eta: self.eta,
        }
    }
}

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GbdtConfig {
        &self.config
    }

    /// Train a GBDT model on the given dataset
    pub fn train(&self, dataset: &Dataset) -> Result<Model, TrainerError> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(TrainerError::Training("cannot train on an empty table".to_string()));
        }

        let objective = self.config.objective;
        for (row, &label) in dataset.labels.iter().enumerate() {
            objective
                .check_label(label)
                .map_err(|e| TrainerError::Training(format!("row {}: {}", row + 1, e)))?;
        }

        let base_margin = objective.base_margin(dataset.label_mean());
        if !base_margin.is_finite() {
            return Err(TrainerError::Training(format!(
                "base margin is not finite: {}",
                base_margin
            )));
        }
        let mut margins = vec![base_margin; dataset.len()];
        let mut trees = Vec::new();

        for round in 0..self.config.num_round {
            let (gradients, hessians) = self.calculate_gradients_hessians(&dataset.labels, &margins);

            let builder = CartBuilder::new(&dataset.features, &gradients, &hessians, self.config.tree_config());
            let tree = builder.build();

            self.update_margins(&tree, &dataset.features, &mut margins);
            tracing::debug!(
                round = round + 1,
                nodes = tree.nodes.len(),
                "boosting round complete"
            );

            trees.push(tree);
        }

        let model = Model::new(objective, base_margin, dataset.feature_count, trees);
        let metadata = ModelMetadata {
            num_round: self.config.num_round,
            max_depth: self.config.max_depth,
            eta: self.config.eta,
            training_rows: dataset.len(),
            ..model.metadata.clone()
        };

        let model = model.with_metadata(metadata);
        model
            .validate()
            .map_err(|e| TrainerError::Training(format!("fitted model is unusable: {}", e)))?;
        Ok(model)
    }

    fn calculate_gradients_hessians(&self, labels: &[f64], margins: &[f64]) -> (Vec<f64>, Vec<f64>) {
        labels
            .iter()
            .zip(margins)
            .map(|(&label, &margin)| self.config.objective.gradient(margin, label))
            .unzip()
    }

    fn update_margins(&self, tree: &Tree, features: &[Vec<f64>], margins: &mut [f64]) {
        for (margin, row) in margins.iter_mut().zip(features) {
            *margin += tree.evaluate(row);
        }
    }
}

/// Root mean squared error of the model's predictions against the labels
pub fn rmse(model: &Model, dataset: &Dataset) -> f64 {
    if dataset.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = dataset
        .features
        .iter()
        .zip(&dataset.labels)
        .map(|(row, &label)| {
            let err = model.predict(row) - label;
            err * err
        })
        .sum();
    (sum_sq / dataset.len() as f64).sqrt()
}
