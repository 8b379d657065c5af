//! High-level API for structured SVM training and prediction
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use structsvm::api::{StructuredSVM, TrainingExample};
//! use structsvm::core::FeatureMatrix;
//! use structsvm::solver::{Constraints, LinearConstraint, Relation};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Exactly one of the two output components is active
//! let constraints: Constraints = vec![LinearConstraint::with_terms(
//!     vec![(0, 1.0), (1, 1.0)],
//!     Relation::Equal,
//!     1.0,
//! )]
//! .into_iter()
//! .collect();
//! let features = FeatureMatrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]])?;
//! let example = TrainingExample::new(features.clone(), vec![1.0, 0.0], constraints.clone());
//!
//! let model = StructuredSVM::new()
//!     .with_regularizer_weight(1e-2)
//!     .with_epsilon(1e-6)
//!     .train_examples(&[example])?;
//!
//! let prediction = model.predict(&features, &constraints)?;
//! assert_eq!(prediction, vec![1.0, 0.0]);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    BundleConfig, BundleOutcome, FeatureMatrix, IterationRecord, LossOracle, Result,
    StructSVMError, StructuredSolver, Termination,
};
use crate::costs::{CostFunction, LinearCosts};
use crate::loss::{LossSum, SoftMarginLoss};
use crate::optimizer::BundleMethod;
use crate::solver::{BranchAndBound, Constraints, LinearObjective, Sense};
use crate::utils::linalg::dot;
use crate::utils::validation::check_dimension;
use log::info;
use serde::{Deserialize, Serialize};

/// High-level structured SVM trainer with builder pattern
#[derive(Debug, Clone)]
pub struct StructuredSVM {
    config: BundleConfig,
    average: bool,
}

impl StructuredSVM {
    /// Create a trainer with default parameters
    pub fn new() -> Self {
        Self {
            config: BundleConfig::default(),
            average: true,
        }
    }

    /// Set regularizer weight λ
    pub fn with_regularizer_weight(mut self, regularizer_weight: f64) -> Self {
        self.config.regularizer_weight = regularizer_weight;
        self
    }

    /// Set convergence tolerance on the duality gap
    pub fn with_epsilon(mut self, eps: f64) -> Self {
        self.config.eps = eps;
        self
    }

    /// Set maximum number of bundle iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: BundleConfig) -> Self {
        self.config = config;
        self
    }

    /// Average the loss over training examples instead of summing it
    pub fn with_averaging(mut self, average: bool) -> Self {
        self.average = average;
        self
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Minimize `λ/2‖w‖² + oracle(w)` over weight vectors of dimension `dims`
    pub fn train<O: LossOracle>(&self, oracle: O, dims: usize) -> Result<TrainedModel> {
        let mut method = BundleMethod::with_config(oracle, dims, self.config.clone())?;
        let outcome = method.run(self.config.max_iterations)?;
        Ok(TrainedModel::from_outcome(outcome, self.config.clone()))
    }

    /// Train on a set of examples sharing one feature dimension
    pub fn train_examples(&self, examples: &[TrainingExample]) -> Result<TrainedModel> {
        let dims = match examples.first() {
            Some(example) => example.features.n_features(),
            None => {
                return Err(StructSVMError::InvalidParameter(
                    "Training needs at least one example".to_string(),
                ))
            }
        };

        let mut risk = LossSum::new(dims).with_averaging(self.average);
        for example in examples {
            check_dimension(dims, example.features.n_features())?;
            risk.push(example.loss()?);
        }

        info!(
            "Training on {} examples with {} features (λ = {}, eps = {})",
            examples.len(),
            dims,
            self.config.regularizer_weight,
            self.config.eps
        );
        self.train(risk, dims)
    }
}

impl Default for StructuredSVM {
    fn default() -> Self {
        Self::new()
    }
}

/// One training example: features, binary ground truth and the constraints
/// that define its valid outputs
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub features: FeatureMatrix,
    pub ground_truth: Vec<f64>,
    pub constraints: Constraints,
    /// Cost function, Hamming distance when absent
    pub costs: Option<LinearCosts>,
}

impl TrainingExample {
    pub fn new(features: FeatureMatrix, ground_truth: Vec<f64>, constraints: Constraints) -> Self {
        Self {
            features,
            ground_truth,
            constraints,
            costs: None,
        }
    }

    /// Use a custom cost function
    pub fn with_costs<C: CostFunction + ?Sized>(mut self, costs: &C) -> Self {
        self.costs = Some(LinearCosts::from(costs));
        self
    }

    /// Soft margin loss of this example
    pub fn loss(&self) -> Result<SoftMarginLoss> {
        SoftMarginLoss::new(
            &self.constraints,
            self.features.clone(),
            self.ground_truth.clone(),
            self.costs.as_ref().map(|c| c as &dyn CostFunction),
        )
    }
}

/// Serializable record of how training went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub termination: Termination,
    /// Best regularized objective observed, if any point was evaluated
    pub upper_bound: Option<f64>,
    pub lower_bound: Option<f64>,
    pub gap: Option<f64>,
    pub history: Vec<IterationRecord>,
}

impl From<&BundleOutcome> for TrainingSummary {
    fn from(outcome: &BundleOutcome) -> Self {
        let finite = |v: f64| if v.is_finite() { Some(v) } else { None };
        Self {
            iterations: outcome.iterations,
            termination: outcome.termination,
            upper_bound: finite(outcome.best_value),
            lower_bound: finite(outcome.lower_bound),
            gap: finite(outcome.gap),
            history: outcome.history.clone(),
        }
    }
}

/// Trained weight vector with prediction interface
///
/// Weights score outputs as costs: the prediction for an input is the
/// feasible output of lowest `⟨Φᵗw, y⟩`.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    weights: Vec<f64>,
    summary: TrainingSummary,
    config: BundleConfig,
}

impl TrainedModel {
    pub(crate) fn from_outcome(outcome: BundleOutcome, config: BundleConfig) -> Self {
        let summary = TrainingSummary::from(&outcome);
        Self {
            weights: outcome.weights,
            summary,
            config,
        }
    }

    /// Reassemble a model from stored parts
    pub fn from_parts(weights: Vec<f64>, summary: TrainingSummary, config: BundleConfig) -> Self {
        Self {
            weights,
            summary,
            config,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn converged(&self) -> bool {
        self.summary.termination == Termination::Converged
    }

    /// Cost `⟨Φᵗw, y⟩` the model assigns to output `y`
    pub fn score(&self, features: &FeatureMatrix, y: &[f64]) -> Result<f64> {
        check_dimension(features.n_variables(), y.len())?;
        Ok(dot(&self.projected_costs(features)?, y))
    }

    /// Predict the lowest-cost output satisfying `constraints`
    pub fn predict(&self, features: &FeatureMatrix, constraints: &Constraints) -> Result<Vec<f64>> {
        self.predict_with::<BranchAndBound>(features, constraints)
    }

    /// Predict with a custom structured-output backend
    pub fn predict_with<S: StructuredSolver>(
        &self,
        features: &FeatureMatrix,
        constraints: &Constraints,
    ) -> Result<Vec<f64>> {
        let costs = self.projected_costs(features)?;
        let objective = LinearObjective::with_coefficients(costs, 0.0, Sense::Minimize);
        let mut solver = S::create(features.n_variables(), constraints)?;
        Ok(solver.solve(&objective)?.assignment)
    }

    /// Soft margin loss of an example under the trained weights
    pub fn loss(&self, example: &TrainingExample) -> Result<f64> {
        let (value, _) = example.loss()?.value_and_gradient(&self.weights)?;
        Ok(value)
    }

    /// Compare predictions against the ground truth of `examples`
    pub fn evaluate(&self, examples: &[TrainingExample]) -> Result<EvaluationMetrics> {
        let mut metrics = EvaluationMetrics::default();
        for example in examples {
            let prediction = self.predict(&example.features, &example.constraints)?;
            let distance = prediction
                .iter()
                .zip(&example.ground_truth)
                .filter(|(p, t)| p != t)
                .count();

            metrics.n_examples += 1;
            metrics.n_components += example.ground_truth.len();
            metrics.hamming_errors += distance;
            if distance == 0 {
                metrics.exact_matches += 1;
            }
        }
        Ok(metrics)
    }

    fn projected_costs(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        check_dimension(self.weights.len(), features.n_features())?;
        features.transpose_mul(&self.weights)
    }
}

/// Prediction quality over a set of examples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationMetrics {
    pub n_examples: usize,
    /// Predictions equal to the ground truth in every component
    pub exact_matches: usize,
    pub n_components: usize,
    /// Mispredicted components over all examples
    pub hamming_errors: usize,
}

impl EvaluationMetrics {
    /// Fraction of examples predicted exactly
    pub fn accuracy(&self) -> f64 {
        if self.n_examples == 0 {
            0.0
        } else {
            self.exact_matches as f64 / self.n_examples as f64
        }
    }

    /// Fraction of mispredicted components
    pub fn hamming_loss(&self) -> f64 {
        if self.n_components == 0 {
            0.0
        } else {
            self.hamming_errors as f64 / self.n_components as f64
        }
    }
}
