//! Cost function trait definition

use crate::utils::linalg::dot;

/// Cost function that is linear in the candidate output
///
/// For a fixed ground truth y′, the cost of a binary candidate y is
/// `Δ(y′, y) = ⟨coefficients, y⟩ + offset`. Loss-augmented inference relies
/// on this shape: the cost folds into the linear objective handed to the
/// structured solver.
pub trait CostFunction {
    /// Per-component coefficients g
    fn coefficients(&self) -> &[f64];

    /// Constant offset b
    fn offset(&self) -> f64;

    /// Evaluate `⟨g, y⟩ + b` for a candidate output
    fn evaluate(&self, y: &[f64]) -> f64 {
        dot(self.coefficients(), y) + self.offset()
    }
}
