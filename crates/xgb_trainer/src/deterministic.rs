//! Deterministic utilities for reproducible training
//!
//! Provides a seeded LCG, the fold partitioning built on it, and the
//! tie-breaking order used when two splits have equal gain.

use std::cmp::Ordering;
use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses the glibc `rand()` constants
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 1103515245;
    const INCREMENT: u64 = 12345;
    const MODULUS: u64 = 1 << 31;

    pub fn new(seed: u64) -> Self {
        Self {
            state: Wrapping(seed % Self::MODULUS),
        }
    }

    /// Generate next value in range [0, 2^31)
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Generate value in range [0, max)
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }
}

/// Seeded Fisher-Yates permutation of `0..n`
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = LcgRng::new(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.next_range(i + 1);
        indices.swap(i, j);
    }
    indices
}

/// Partition a seeded permutation of `0..n` into `k` folds.
///
/// Fold sizes differ by at most one; the first `n % k` folds take the extra
/// row. Every index appears in exactly one fold.
pub fn kfold_partitions(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    if k == 0 {
        return Vec::new();
    }

    let indices = shuffled_indices(n, seed);
    let base = n / k;
    let extra = n % k;

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        folds.push(indices[start..start + size].to_vec());
        start += size;
    }
    folds
}

/// Deterministic tie-breaker for split selection
/// Orders by (feature_idx, threshold); lower wins
#[derive(Debug, Clone, Copy)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: f64,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: f64) -> Self {
        Self {
            feature_idx,
            threshold,
        }
    }
}

impl Ord for SplitTieBreaker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.feature_idx
            .cmp(&other.feature_idx)
            .then_with(|| self.threshold.total_cmp(&other.threshold))
    }
}

impl PartialOrd for SplitTieBreaker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SplitTieBreaker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplitTieBreaker {}
