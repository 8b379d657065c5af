//! Bundle method for regularized risk minimization
//!
//! Minimizes `λ/2‖w‖² + f(w)` for a convex, possibly non-smooth `f` that is
//! only accessible through a [`LossOracle`]. Every evaluation contributes a
//! cutting plane to a growing bundle; the next point is the minimizer of the
//! regularized piecewise-linear model spanned by the bundle. The model
//! minimum is a lower bound and the best evaluated objective an upper bound
//! on the optimum, and the method stops once the two are within `eps`.

use crate::core::{
    Bundle, BundleConfig, BundleOutcome, CuttingPlane, IterationRecord, LossOracle,
    QuadraticSolver, Result, StructSVMError, Termination,
};
use crate::solver::SimplexQpSolver;
use crate::utils::linalg::norm_squared;
use crate::utils::validation::all_finite;
use log::{debug, info, warn};

/// Bundle method driver
pub struct BundleMethod<O: LossOracle, Q: QuadraticSolver = SimplexQpSolver> {
    oracle: O,
    dims: usize,
    config: BundleConfig,
    master: Q,
}

impl<O: LossOracle> BundleMethod<O> {
    /// Create a bundle method over weight vectors of dimension `dims`
    pub fn new(oracle: O, dims: usize, regularizer_weight: f64, eps: f64) -> Result<Self> {
        let config = BundleConfig {
            regularizer_weight,
            eps,
            ..BundleConfig::default()
        };
        Self::with_config(oracle, dims, config)
    }

    /// Create a bundle method from a full configuration
    pub fn with_config(oracle: O, dims: usize, config: BundleConfig) -> Result<Self> {
        config.validate()?;
        let master = SimplexQpSolver::new(config.master.clone());
        Ok(Self {
            oracle,
            dims,
            config,
            master,
        })
    }
}

impl<O: LossOracle, Q: QuadraticSolver> BundleMethod<O, Q> {
    /// Replace the master problem solver
    pub fn with_master_solver<R: QuadraticSolver>(self, master: R) -> BundleMethod<O, R> {
        BundleMethod {
            oracle: self.oracle,
            dims: self.dims,
            config: self.config,
            master,
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }

    /// Run at most `max_iterations` oracle evaluations starting from zero
    ///
    /// Running out of iterations is not an error; it is reported through
    /// [`BundleOutcome::termination`].
    pub fn run(&mut self, max_iterations: usize) -> Result<BundleOutcome> {
        let lambda = self.config.regularizer_weight;
        let eps = self.config.eps;

        self.master.reset();
        let mut bundle = Bundle::new(self.dims);

        let mut weights = vec![0.0; self.dims];
        let mut best_weights = weights.clone();
        let mut best_value = f64::INFINITY;
        let mut lower_bound = f64::NEG_INFINITY;
        let mut gap = f64::INFINITY;
        let mut history = Vec::new();
        let mut termination = Termination::MaxIterationsReached;

        for iteration in 1..=max_iterations {
            let (value, gradient) = self.oracle.value_and_gradient(&weights)?;
            if gradient.len() != self.dims {
                return Err(StructSVMError::DimensionMismatch {
                    expected: self.dims,
                    actual: gradient.len(),
                });
            }
            if !(value.is_finite() && all_finite(&gradient)) {
                return Err(StructSVMError::OptimizationError(format!(
                    "Oracle returned a non-finite value or gradient at iteration {iteration}"
                )));
            }

            let objective = value + 0.5 * lambda * norm_squared(&weights);
            if objective < best_value {
                best_value = objective;
                best_weights.clone_from(&weights);
            }

            bundle.push(CuttingPlane::from_evaluation(value, gradient, &weights))?;
            let solution = self.master.solve(&bundle, lambda)?;

            // Every earlier bound stays valid for the grown bundle
            lower_bound = lower_bound.max(solution.lower_bound);
            gap = best_value - lower_bound;
            weights = solution.weights;

            debug!(
                "Iteration {iteration}: value {value}, upper bound {best_value}, lower bound {lower_bound}, gap {gap:e}"
            );
            history.push(IterationRecord {
                iteration,
                value,
                upper_bound: best_value,
                lower_bound,
                gap,
            });

            if gap <= eps {
                termination = Termination::Converged;
                info!("Bundle method converged after {iteration} iterations (gap {gap:e})");
                break;
            }
        }

        if termination == Termination::MaxIterationsReached && max_iterations > 0 {
            warn!(
                "Bundle method stopped after {max_iterations} iterations with gap {gap:e} (eps {eps:e})"
            );
        }

        Ok(BundleOutcome {
            weights,
            best_weights,
            best_value,
            lower_bound,
            gap,
            iterations: history.len(),
            termination,
            history,
        })
    }

    /// Run the bundle method and return the final weight vector
    pub fn optimize(&mut self, max_iterations: usize) -> Result<Vec<f64>> {
        Ok(self.run(max_iterations)?.weights)
    }
}

/// Oracle backed by a closure returning value and gradient
pub struct FnOracle<F> {
    f: F,
}

impl<F> FnOracle<F>
where
    F: FnMut(&[f64]) -> (f64, Vec<f64>),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> LossOracle for FnOracle<F>
where
    F: FnMut(&[f64]) -> (f64, Vec<f64>),
{
    fn value_and_gradient(&mut self, weights: &[f64]) -> Result<(f64, Vec<f64>)> {
        Ok((self.f)(weights))
    }
}

/// Wrap a closure as a [`LossOracle`]
pub fn from_fn<F>(f: F) -> FnOracle<F>
where
    F: FnMut(&[f64]) -> (f64, Vec<f64>),
{
    FnOracle::new(f)
}
