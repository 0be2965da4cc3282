//! Regression tree builder
//!
//! Exact-greedy tree construction over first and second order gradient
//! statistics. Rows with a missing feature value always go to the right
//! child, matching `Tree::evaluate`.

use xgbcv_core::gbdt::{Node, Tree};

use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    /// Shrinkage applied to leaf weights
    pub eta: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_child_weight: 1.0,
            lambda: 1.0,
            gamma: 0.0,
            eta: 0.3,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, gain: f64) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct GradStats {
    grad: f64,
    hess: f64,
}

impl GradStats {
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
    }

    fn minus(self, other: GradStats) -> GradStats {
        GradStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
        }
    }
}

/// Build a regression tree using the exact-greedy algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    gradients: &'a [f64],
    hessians: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: TreeConfig,
    ) -> Self {
        assert_eq!(features.len(), gradients.len());
        assert_eq!(features.len(), hessians.len());

        let feature_count = features.first().map(Vec::len).unwrap_or(0);

        Self {
            config,
            features,
            gradients,
            hessians,
            feature_count,
        }
    }

    /// Build tree over all rows
    pub fn build(&self) -> Tree {
        let indices: Vec<usize> = (0..self.features.len()).collect();
        self.build_on(&indices)
    }

    /// Build tree over the given rows only
    pub fn build_on(&self, indices: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(indices, 0, &mut nodes);
        Tree::new(nodes)
    }

    fn build_node(&self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current_idx = nodes.len() as i32;
        let totals = self.sum_stats(indices);

        let split = if depth >= self.config.max_depth || indices.len() < 2 {
            None
        } else {
            self.find_best_split(indices, totals)
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current_idx, self.leaf_weight(totals)));
            return current_idx;
        };

        let (left_indices, right_indices) = self.split_rows(indices, split.feature_idx, split.threshold);

        // Reserve space for current node, children are patched in below
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes);

        let node = &mut nodes[current_idx as usize];
        node.left = left_idx;
        node.right = right_idx;

        current_idx
    }

    /// Scan every feature's sorted values and keep the highest-gain split
    fn find_best_split(&self, indices: &[usize], totals: GradStats) -> Option<SplitCandidate> {
        let mut best_split: Option<SplitCandidate> = None;

        for feature_idx in 0..self.feature_count {
            let mut present: Vec<(f64, usize)> = Vec::with_capacity(indices.len());
            for &idx in indices {
                let value = self.features[idx][feature_idx];
                if !value.is_nan() {
                    present.push((value, idx));
                }
            }
            if present.is_empty() {
                continue;
            }
            present.sort_by(|a, b| a.0.total_cmp(&b.0));

            let has_missing = present.len() < indices.len();
            let mut left = GradStats::default();

            for (pos, &(value, idx)) in present.iter().enumerate() {
                left.add(self.gradients[idx], self.hessians[idx]);

                let boundary = match present.get(pos + 1) {
                    Some(&(next, _)) => next > value,
                    // Splitting at the max only separates the missing rows
                    None => has_missing,
                };
                if !boundary {
                    continue;
                }

                let right = totals.minus(left);
                if left.hess < self.config.min_child_weight || right.hess < self.config.min_child_weight {
                    continue;
                }

                let gain = self.split_gain(left, right, totals);
                if gain <= 0.0 {
                    continue;
                }

                let candidate = SplitCandidate::new(feature_idx, value, gain);
                best_split = match best_split {
                    Some(current) if !candidate.beats(&current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }

        best_split
    }

    fn split_rows(&self, indices: &[usize], feature_idx: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .copied()
            .partition(|&idx| self.features[idx][feature_idx] <= threshold)
    }

    /// Gain = ½[G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ)] − γ
    fn split_gain(&self, left: GradStats, right: GradStats, parent: GradStats) -> f64 {
        0.5 * (self.score(left) + self.score(right) - self.score(parent)) - self.config.gamma
    }

    fn score(&self, stats: GradStats) -> f64 {
        let denom = stats.hess + self.config.lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        stats.grad * stats.grad / denom
    }

    fn sum_stats(&self, indices: &[usize]) -> GradStats {
        let mut stats = GradStats::default();
        for &idx in indices {
            stats.add(self.gradients[idx], self.hessians[idx]);
        }
        stats
    }

    /// Optimal leaf weight −G/(H+λ), shrunk by eta
    fn leaf_weight(&self, stats: GradStats) -> f64 {
        let denom = stats.hess + self.config.lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -stats.grad / denom * self.config.eta
    }
}
