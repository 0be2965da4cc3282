//! Boosted tree ensemble
//!
//! A model is a base margin plus the sum of its trees' leaf weights, mapped
//! through the objective's output transform. Leaf weights already carry the
//! learning-rate shrinkage applied during training.

use super::objective::Objective;
use super::tree::Tree;
use crate::errors::{ModelError, Result};
use serde::{Deserialize, Serialize};

/// Model format version written into every artifact
pub const MODEL_VERSION: u32 = 1;

/// Training provenance stored alongside the trees
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    /// Unix timestamp (seconds) of model creation
    pub created_at: i64,
    pub num_round: usize,
    pub max_depth: usize,
    pub eta: f64,
    pub training_rows: usize,
}

/// Gradient boosted tree ensemble
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub version: u32,
    pub objective: Objective,
    /// Initial margin added before any tree output
    pub base_margin: f64,
    pub feature_count: usize,
    pub trees: Vec<Tree>,
    pub metadata: ModelMetadata,
}

impl Model {
    pub fn new(objective: Objective, base_margin: f64, feature_count: usize, trees: Vec<Tree>) -> Self {
        Self {
            version: MODEL_VERSION,
            objective,
            base_margin,
            feature_count,
            trees,
            metadata: ModelMetadata {
                created_at: chrono::Utc::now().timestamp(),
                ..ModelMetadata::default()
            },
        }
    }

    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if !self.base_margin.is_finite() {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid base margin: {}",
                self.base_margin
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Raw ensemble output before the objective transform
    pub fn predict_margin(&self, features: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_margin, |sum, tree| sum + tree.evaluate(features))
    }

    /// Prediction in the objective's output space
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.objective.transform(self.predict_margin(features))
    }

    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Encode the model body with bincode
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Blake3 hash of the encoded model
    pub fn hash(&self) -> Result<[u8; 32]> {
        let bytes = self.encode()?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }

    /// Compute model hash as hex string
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hex::encode(self.hash()?))
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::tree::Node;

    fn create_test_model() -> Model {
        let tree1 = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2),
            Node::leaf(1, 100.0),
            Node::leaf(2, 200.0),
        ]);
        let tree2 = Tree::new(vec![
            Node::internal(0, 1, 30.0, 1, 2),
            Node::leaf(1, -50.0),
            Node::leaf(2, 50.0),
        ]);

        Model::new(Objective::SquaredError, 0.5, 2, vec![tree1, tree2])
    }

    #[test]
    fn test_model_creation() {
        let model = create_test_model();
        assert_eq!(model.version, MODEL_VERSION);
        assert_eq!(model.num_trees(), 2);
        assert!(model.metadata.created_at > 0);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_model_inference() {
        let model = create_test_model();
        // Tree 1 left (100), tree 2 left (-50), plus base margin
        assert_eq!(model.predict(&[30.0, 20.0]), 50.5);
        // Tree 1 right (200), tree 2 right (50)
        assert_eq!(model.predict(&[60.0, 40.0]), 250.5);
        assert_eq!(model.predict_batch(&[vec![30.0, 20.0], vec![60.0, 40.0]]), vec![50.5, 250.5]);
    }

    #[test]
    fn test_logistic_output_is_probability() {
        let mut model = create_test_model();
        model.objective = Objective::BinaryLogistic;
        model.base_margin = 0.0;
        model.trees.clear();
        assert_eq!(model.predict(&[0.0, 0.0]), 0.5);
    }

    #[test]
    fn test_hash_deterministic() {
        let model1 = create_test_model();
        let model2 = model1.clone();

        let hash1 = model1.hash_hex().unwrap();
        assert_eq!(hash1, model2.hash_hex().unwrap());
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_changes_with_model() {
        let model1 = create_test_model();
        let mut model2 = model1.clone();
        model2.trees[0].nodes[1] = Node::leaf(1, 999.0);

        assert_ne!(model1.hash_hex().unwrap(), model2.hash_hex().unwrap());
    }

    #[test]
    fn test_model_validation() {
        let mut invalid = create_test_model();
        invalid.version = 999;
        assert!(invalid.validate().is_err());

        let mut invalid = create_test_model();
        invalid.base_margin = f64::NAN;
        assert!(invalid.validate().is_err());

        let mut invalid = create_test_model();
        invalid.feature_count = 1;
        assert!(invalid.validate().is_err());
    }
}
