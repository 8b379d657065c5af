//! Master problem solver for the bundle method
//!
//! The master problem
//!
//! ```text
//! min_{w, ξ}  λ/2 ‖w‖² + ξ    s.t.  ξ ≥ a_i + ⟨g_i, w⟩  for all planes i
//! ```
//!
//! is solved through its dual over the probability simplex,
//!
//! ```text
//! max_{α ≥ 0, Σα = 1}  Σ α_i a_i − 1/(2λ) ‖Σ α_i g_i‖²,    w = −(1/λ) Σ α_i g_i,
//! ```
//!
//! with sequential minimal optimization: each step moves mass between the
//! pair of multipliers that violates the optimality conditions the most.
//! The equality constraint Σα = 1 plays the role the bias constraint plays
//! in the SVM dual, and the step along the pair has a closed form.

use crate::cache::{CacheStats, GramCache};
use crate::core::{
    Bundle, MasterConfig, MasterSolution, QuadraticSolver, Result, StructSVMError,
};
use crate::utils::linalg::{axpy, dot, norm_squared};
use log::{trace, warn};

/// Dual SMO solver for the master problem
///
/// Keeps the multipliers of the previous solve. Since the bundle is
/// append-only, the previous multipliers padded with zeros are a feasible
/// starting point whose dual value equals the previous lower bound, so the
/// lower bounds reported across successive solves never decrease.
pub struct SimplexQpSolver {
    config: MasterConfig,
    cache: GramCache,
    alpha: Vec<f64>,
}

impl SimplexQpSolver {
    /// Create a solver with the given configuration
    pub fn new(config: MasterConfig) -> Self {
        let cache = GramCache::with_memory_limit(config.cache_size);
        Self {
            config,
            cache,
            alpha: Vec::new(),
        }
    }

    /// Dual multipliers of the last solve, one per plane
    pub fn multipliers(&self) -> &[f64] {
        &self.alpha
    }

    /// Statistics of the Gram cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Pad the previous multipliers for the current bundle size
    fn warm_start(&mut self, n: usize) {
        if self.alpha.len() > n {
            // Bundle was swapped for a smaller one; cached products are stale
            self.reset();
        }
        if self.alpha.is_empty() {
            self.alpha.push(1.0);
        }
        self.alpha.resize(n, 0.0);
    }

    /// Run pair updates until the dual gap is within tolerance
    ///
    /// `grad[k] = a_k − (1/λ) Σ_l α_l K_kl` is the partial derivative of
    /// the dual objective; at the optimum it is maximal and equal on every
    /// plane with positive multiplier.
    fn optimize_pairs(&mut self, gram: &[f64], grad: &mut [f64], lambda: f64) -> (usize, f64) {
        let n = grad.len();
        let alpha = &mut self.alpha;
        let mut iterations = 0;

        loop {
            let (i, max_grad) = grad
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(best_k, best), (k, &g)| {
                    if g > best {
                        (k, g)
                    } else {
                        (best_k, best)
                    }
                });
            let weighted: f64 = alpha.iter().zip(grad.iter()).map(|(a, g)| a * g).sum();
            let gap = max_grad - weighted;

            if gap <= self.config.tolerance_abs + self.config.tolerance_rel * weighted.abs() {
                return (iterations, gap);
            }
            if iterations >= self.config.max_iterations {
                warn!(
                    "Master problem stopped after {iterations} iterations with dual gap {gap:e}"
                );
                return (iterations, gap);
            }

            // Plane with positive mass and the smallest derivative
            let mut j = None;
            let mut min_grad = f64::INFINITY;
            for k in 0..n {
                if alpha[k] > 0.0 && grad[k] < min_grad {
                    min_grad = grad[k];
                    j = Some(k);
                }
            }
            let j = match j {
                Some(j) if j != i => j,
                _ => return (iterations, gap),
            };

            let eta = (gram[i * n + i] + gram[j * n + j] - 2.0 * gram[i * n + j]) / lambda;
            let alpha_j_old = alpha[j];
            let delta = if eta > 0.0 {
                alpha_j_old.min((grad[i] - grad[j]) / eta)
            } else {
                // Identical gradients: plane i dominates plane j everywhere
                alpha_j_old
            };

            alpha[i] += delta;
            alpha[j] = if delta >= alpha_j_old {
                0.0
            } else {
                alpha_j_old - delta
            };

            let scale = delta / lambda;
            for (k, g) in grad.iter_mut().enumerate() {
                *g -= scale * (gram[i * n + k] - gram[j * n + k]);
            }

            iterations += 1;
        }
    }
}

impl Default for SimplexQpSolver {
    fn default() -> Self {
        Self::new(MasterConfig::default())
    }
}

impl QuadraticSolver for SimplexQpSolver {
    fn solve(&mut self, bundle: &Bundle, regularizer_weight: f64) -> Result<MasterSolution> {
        let lambda = regularizer_weight;
        if !(lambda.is_finite() && lambda > 0.0) {
            return Err(StructSVMError::InvalidParameter(format!(
                "Regularizer weight must be positive and finite, got: {lambda}"
            )));
        }

        let n = bundle.len();
        if n == 0 {
            return Err(StructSVMError::OptimizationError(
                "master problem needs at least one cutting plane".to_string(),
            ));
        }

        self.warm_start(n);

        let gram = self.cache.gram_matrix(bundle);
        let planes = bundle.planes();

        let mut grad: Vec<f64> = (0..n)
            .map(|k| {
                let k_alpha: f64 = (0..n).map(|l| self.alpha[l] * gram[k * n + l]).sum();
                planes[k].offset - k_alpha / lambda
            })
            .collect();

        let (iterations, gap) = self.optimize_pairs(&gram, &mut grad, lambda);

        let mut weights = vec![0.0; bundle.dims()];
        for (plane, &a) in planes.iter().zip(&self.alpha) {
            if a > 0.0 {
                axpy(-a / lambda, &plane.gradient, &mut weights);
            }
        }

        let regularizer = 0.5 * lambda * norm_squared(&weights);
        let slack = bundle.model_value(&weights);
        let offsets: Vec<f64> = planes.iter().map(|p| p.offset).collect();
        let lower_bound = dot(&self.alpha, &offsets) - regularizer;

        trace!(
            "master problem: {n} planes, {iterations} iterations, dual gap {gap:e}, lower bound {lower_bound}"
        );

        if !(lower_bound.is_finite() && slack.is_finite()) {
            return Err(StructSVMError::OptimizationError(format!(
                "master problem produced non-finite bounds (slack {slack}, lower bound {lower_bound})"
            )));
        }

        Ok(MasterSolution {
            weights,
            slack,
            objective: regularizer + slack,
            lower_bound,
            iterations,
        })
    }

    fn reset(&mut self) {
        self.alpha.clear();
        self.cache.clear();
    }
}
