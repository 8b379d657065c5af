//! Core traits for structured SVM training

use crate::core::{Bundle, MasterSolution, Result};
use crate::solver::{Constraints, LinearObjective, Solution};

/// Convex objective that can be evaluated together with a subgradient
///
/// This is the only thing the bundle method knows about the function it
/// minimizes. Implementations may keep mutable scratch state between calls,
/// which is why evaluation takes `&mut self`: a single oracle must not be
/// evaluated by two callers at once.
pub trait LossOracle {
    /// Compute the value and a subgradient at `weights`
    fn value_and_gradient(&mut self, weights: &[f64]) -> Result<(f64, Vec<f64>)>;
}

impl<O: LossOracle + ?Sized> LossOracle for &mut O {
    fn value_and_gradient(&mut self, weights: &[f64]) -> Result<(f64, Vec<f64>)> {
        (**self).value_and_gradient(weights)
    }
}

impl<O: LossOracle + ?Sized> LossOracle for Box<O> {
    fn value_and_gradient(&mut self, weights: &[f64]) -> Result<(f64, Vec<f64>)> {
        (**self).value_and_gradient(weights)
    }
}

/// Solver for linear objectives over binary vectors under linear constraints
///
/// The constraint set is fixed when the solver is created; only the
/// objective changes between calls to [`StructuredSolver::solve`].
pub trait StructuredSolver {
    /// Create a solver over `num_variables` binary variables
    fn create(num_variables: usize, constraints: &Constraints) -> Result<Self>
    where
        Self: Sized;

    /// Number of binary variables
    fn num_variables(&self) -> usize;

    /// Find an optimal assignment for the given objective
    fn solve(&mut self, objective: &LinearObjective) -> Result<Solution>;
}

/// Solver for the bundle method's master problem
///
/// Minimizes `λ/2‖w‖² + ξ` subject to `ξ ≥ a_i + ⟨g_i, w⟩` for every plane
/// in the bundle. The bundle only ever grows between calls, so solvers are
/// free to warm-start from their previous solution.
pub trait QuadraticSolver {
    /// Solve the master problem over all planes currently in `bundle`
    fn solve(&mut self, bundle: &Bundle, regularizer_weight: f64) -> Result<MasterSolution>;

    /// Drop any state carried over from earlier solves before a new bundle
    /// is started
    fn reset(&mut self) {}
}
