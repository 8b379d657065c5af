//! Core type definitions for structured SVM training

use crate::core::{Result, StructSVMError};
use crate::utils::linalg::dot;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Dense feature matrix Φ with one row per feature and one column per
/// output component
///
/// `Φ·y` embeds a binary output `y` into feature space, `Φᵗ·w` projects a
/// weight vector onto the output components.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    n_features: usize,
    n_variables: usize,
    /// Row-major storage
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Create a matrix from row-major data
    pub fn new(n_features: usize, n_variables: usize, data: Vec<f64>) -> Result<Self> {
        let expected = n_features * n_variables;
        if data.len() != expected {
            return Err(StructSVMError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            n_features,
            n_variables,
            data,
        })
    }

    /// Create a matrix from its rows, one row per feature
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_features = rows.len();
        let n_variables = rows.first().map_or(0, Vec::len);

        let mut data = Vec::with_capacity(n_features * n_variables);
        for row in rows {
            if row.len() != n_variables {
                return Err(StructSVMError::DimensionMismatch {
                    expected: n_variables,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }

        Ok(Self {
            n_features,
            n_variables,
            data,
        })
    }

    /// Create an all-zero matrix
    pub fn zeros(n_features: usize, n_variables: usize) -> Self {
        Self {
            n_features,
            n_variables,
            data: vec![0.0; n_features * n_variables],
        }
    }

    /// Number of features (rows), i.e. the dimension of the weight vector
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of output components (columns)
    pub fn n_variables(&self) -> usize {
        self.n_variables
    }

    /// Entry for feature `f` and output component `v`
    pub fn get(&self, f: usize, v: usize) -> f64 {
        self.data[f * self.n_variables + v]
    }

    /// Set the entry for feature `f` and output component `v`
    pub fn set(&mut self, f: usize, v: usize, value: f64) {
        self.data[f * self.n_variables + v] = value;
    }

    /// Row of feature `f`
    pub fn row(&self, f: usize) -> &[f64] {
        &self.data[f * self.n_variables..(f + 1) * self.n_variables]
    }

    /// Compute `Φ·y`
    pub fn mul_vec(&self, y: &[f64]) -> Result<Vec<f64>> {
        if y.len() != self.n_variables {
            return Err(StructSVMError::DimensionMismatch {
                expected: self.n_variables,
                actual: y.len(),
            });
        }
        Ok((0..self.n_features).map(|f| dot(self.row(f), y)).collect())
    }

    /// Compute `Φᵗ·w`
    pub fn transpose_mul(&self, w: &[f64]) -> Result<Vec<f64>> {
        if w.len() != self.n_features {
            return Err(StructSVMError::DimensionMismatch {
                expected: self.n_features,
                actual: w.len(),
            });
        }

        let mut result = vec![0.0; self.n_variables];
        for (f, &w_f) in w.iter().enumerate() {
            if w_f == 0.0 {
                continue;
            }
            for (r, &phi) in result.iter_mut().zip(self.row(f)) {
                *r += w_f * phi;
            }
        }
        Ok(result)
    }
}

/// Affine lower bound `a + ⟨g, w⟩` on a convex function
#[derive(Clone, Debug, PartialEq)]
pub struct CuttingPlane {
    /// Intercept a
    pub offset: f64,
    /// Subgradient g
    pub gradient: Vec<f64>,
}

impl CuttingPlane {
    /// Create a plane from intercept and gradient
    pub fn new(offset: f64, gradient: Vec<f64>) -> Self {
        Self { offset, gradient }
    }

    /// Create the plane touching the function at `point`, where it has
    /// `value` and subgradient `gradient`
    pub fn from_evaluation(value: f64, gradient: Vec<f64>, point: &[f64]) -> Self {
        let offset = value - dot(&gradient, point);
        Self { offset, gradient }
    }

    /// Evaluate the plane at `w`
    pub fn evaluate(&self, w: &[f64]) -> f64 {
        self.offset + dot(&self.gradient, w)
    }

    /// Dimension of the gradient
    pub fn dim(&self) -> usize {
        self.gradient.len()
    }
}

/// Append-only collection of cutting planes
///
/// The maximum over all planes is a piecewise-linear model that bounds the
/// objective from below. Planes are never removed.
#[derive(Clone, Debug)]
pub struct Bundle {
    dims: usize,
    planes: Vec<CuttingPlane>,
}

impl Bundle {
    /// Create an empty bundle for weight vectors of dimension `dims`
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            planes: Vec::new(),
        }
    }

    /// Append a plane
    pub fn push(&mut self, plane: CuttingPlane) -> Result<()> {
        if plane.dim() != self.dims {
            return Err(StructSVMError::DimensionMismatch {
                expected: self.dims,
                actual: plane.dim(),
            });
        }
        self.planes.push(plane);
        Ok(())
    }

    /// Dimension of the weight vector
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of planes
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// Check if the bundle has no planes yet
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// All planes in insertion order
    pub fn planes(&self) -> &[CuttingPlane] {
        &self.planes
    }

    /// Plane `i`
    pub fn get(&self, i: usize) -> Option<&CuttingPlane> {
        self.planes.get(i)
    }

    /// Value of the piecewise-linear model at `w` (−∞ for an empty bundle)
    pub fn model_value(&self, w: &[f64]) -> f64 {
        self.planes
            .iter()
            .map(|plane| plane.evaluate(w))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Result of solving the master problem
#[derive(Debug, Clone)]
pub struct MasterSolution {
    /// Minimizer w of the master problem
    pub weights: Vec<f64>,
    /// Optimal slack ξ, the model value at `weights`
    pub slack: f64,
    /// Master objective `λ/2‖w‖² + ξ` at `weights`
    pub objective: f64,
    /// Certified lower bound on the master optimum
    pub lower_bound: f64,
    /// Number of inner solver iterations
    pub iterations: usize,
}

/// How a bundle method run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Duality gap fell below the tolerance
    Converged,
    /// Iteration budget exhausted before reaching the tolerance
    MaxIterationsReached,
}

/// Bounds recorded after one bundle iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Oracle value at the evaluated point
    pub value: f64,
    /// Best regularized objective observed so far
    pub upper_bound: f64,
    /// Master problem lower bound
    pub lower_bound: f64,
    pub gap: f64,
}

/// Result of a bundle method run
#[derive(Debug, Clone)]
pub struct BundleOutcome {
    /// Minimizer of the last master problem
    pub weights: Vec<f64>,
    /// Evaluated point with the lowest regularized objective
    pub best_weights: Vec<f64>,
    /// Regularized objective at `best_weights` (the final upper bound)
    pub best_value: f64,
    /// Final lower bound
    pub lower_bound: f64,
    /// Final duality gap
    pub gap: f64,
    /// Number of oracle evaluations
    pub iterations: usize,
    pub termination: Termination,
    pub history: Vec<IterationRecord>,
}

impl BundleOutcome {
    /// Check whether the gap tolerance was met
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Configuration for the master problem solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// Absolute tolerance on the master duality gap
    pub tolerance_abs: f64,
    /// Tolerance relative to the master objective
    pub tolerance_rel: f64,
    /// Maximum number of pair updates per solve
    pub max_iterations: usize,
    /// Inner product cache size in bytes
    pub cache_size: usize,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            tolerance_abs: 1e-10,
            tolerance_rel: 1e-12,
            max_iterations: 100_000,
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Configuration for the bundle method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Regularizer weight λ
    pub regularizer_weight: f64,
    /// Tolerance on the duality gap
    pub eps: f64,
    /// Maximum number of oracle evaluations
    pub max_iterations: usize,
    pub master: MasterConfig,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            regularizer_weight: 1e-3,
            eps: 1e-5,
            max_iterations: 1000,
            master: MasterConfig::default(),
        }
    }
}

impl BundleConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.regularizer_weight.is_finite() && self.regularizer_weight > 0.0) {
            return Err(StructSVMError::InvalidParameter(format!(
                "Regularizer weight must be positive and finite, got: {}",
                self.regularizer_weight
            )));
        }
        if !(self.eps.is_finite() && self.eps >= 0.0) {
            return Err(StructSVMError::InvalidParameter(format!(
                "Tolerance must be non-negative and finite, got: {}",
                self.eps
            )));
        }
        if !(self.master.tolerance_abs >= 0.0 && self.master.tolerance_rel >= 0.0) {
            return Err(StructSVMError::InvalidParameter(format!(
                "Master tolerances must be non-negative, got: {} / {}",
                self.master.tolerance_abs, self.master.tolerance_rel
            )));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(StructSVMError::IoError)?;
        let reader = BufReader::new(file);

        let config: Self = serde_json::from_reader(reader).map_err(|e| {
            StructSVMError::ParseError(format!("Failed to parse configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as JSON
    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(StructSVMError::IoError)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, self).map_err(|e| {
            StructSVMError::SerializationError(format!("Failed to serialize configuration: {e}"))
        })
    }
}
