//! Hamming cost implementation

use crate::costs::CostFunction;

/// Hamming distance to a fixed binary ground truth
///
/// For binary vectors, `Σ|y′_i − y_i| = Σ y′_i + Σ y_i (1 − 2 y′_i)`, which
/// is linear in y with coefficients `1 − 2 y′_i` and offset `Σ y′_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct HammingCosts {
    coefficients: Vec<f64>,
    offset: f64,
}

impl HammingCosts {
    /// Derive the decomposition from a binary ground truth
    pub fn new(ground_truth: &[f64]) -> Self {
        Self {
            coefficients: ground_truth.iter().map(|&y| 1.0 - 2.0 * y).collect(),
            offset: ground_truth.iter().sum(),
        }
    }
}

impl CostFunction for HammingCosts {
    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn offset(&self) -> f64 {
        self.offset
    }
}
