//! Gradient boosted decision tree ensembles
//!
//! - `tree`: flat-array regression trees and traversal
//! - `objective`: loss functions and output transforms
//! - `model`: the ensemble, its metadata, encoding and hashing
//!
//! # Usage
//!
//! ```rust
//! use xgbcv_core::gbdt::{Model, Node, Objective, Tree};
//!
//! let tree = Tree::new(vec![
//!     Node::internal(0, 0, 5.0, 1, 2),
//!     Node::leaf(1, -1.0),
//!     Node::leaf(2, 1.0),
//! ]);
//! let model = Model::new(Objective::SquaredError, 10.0, 1, vec![tree]);
//!
//! assert_eq!(model.predict(&[3.0]), 9.0);
//! assert_eq!(model.predict(&[7.0]), 11.0);
//! ```

pub mod model;
pub mod objective;
pub mod tree;

pub use model::{Model, ModelMetadata, MODEL_VERSION};
pub use objective::Objective;
pub use tree::{Node, Tree};
