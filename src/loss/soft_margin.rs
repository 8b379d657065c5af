//! Structured hinge loss with loss-augmented inference
//!
//! For a weight vector w, features Φ and ground truth y′, the loss is
//!
//! ```text
//! L(w) = max_y  ⟨Φᵗw, y′⟩ − ⟨Φᵗw, y⟩ + Δ(y′, y)
//! ```
//!
//! over all binary y satisfying the output constraints. Weights score
//! outputs as costs, so the loss vanishes once the ground truth is cheaper
//! than every other output by a margin of Δ. With a linear Δ the inner
//! maximization is a single linear program over binary variables, handed
//! to a [`StructuredSolver`].

use crate::core::{FeatureMatrix, LossOracle, Result, StructSVMError, StructuredSolver};
use crate::costs::{CostFunction, HammingCosts, LinearCosts};
use crate::solver::{BranchAndBound, Constraints, LinearObjective, Sense};
use crate::utils::linalg::{dot, sub};
use crate::utils::validation::{check_dimension, validate_binary};
use log::debug;

/// Structured soft-margin loss of a single training example
///
/// Owns one solver instance and one objective that are rewritten in place on
/// every evaluation. Evaluation therefore takes `&mut self`; concurrent
/// training runs need their own instances.
pub struct SoftMarginLoss<S: StructuredSolver = BranchAndBound> {
    features: FeatureMatrix,
    ground_truth: Vec<f64>,
    costs: LinearCosts,
    /// Φ·y′
    ground_truth_features: Vec<f64>,
    solver: S,
    objective: LinearObjective,
    last_output: Option<Vec<f64>>,
}

impl SoftMarginLoss<BranchAndBound> {
    /// Create the loss with the built-in branch-and-bound backend
    ///
    /// `costs` defaults to the Hamming distance to `ground_truth`.
    pub fn new(
        constraints: &Constraints,
        features: FeatureMatrix,
        ground_truth: Vec<f64>,
        costs: Option<&dyn CostFunction>,
    ) -> Result<Self> {
        Self::with_solver(constraints, features, ground_truth, costs)
    }
}

impl<S: StructuredSolver> SoftMarginLoss<S> {
    /// Create the loss with a custom structured-output backend
    pub fn with_solver(
        constraints: &Constraints,
        features: FeatureMatrix,
        ground_truth: Vec<f64>,
        costs: Option<&dyn CostFunction>,
    ) -> Result<Self> {
        validate_binary(&ground_truth)?;
        check_dimension(ground_truth.len(), features.n_variables())?;

        let costs = match costs {
            Some(costs) => LinearCosts::from(costs),
            None => LinearCosts::from(&HammingCosts::new(&ground_truth)),
        };
        check_dimension(ground_truth.len(), costs.coefficients().len())?;

        let ground_truth_features = features.mul_vec(&ground_truth)?;
        let solver = S::create(ground_truth.len(), constraints)?;
        check_dimension(ground_truth.len(), solver.num_variables())?;

        let objective = LinearObjective::with_coefficients(
            vec![0.0; ground_truth.len()],
            0.0,
            Sense::Maximize,
        );

        Ok(Self {
            features,
            ground_truth,
            costs,
            ground_truth_features,
            solver,
            objective,
            last_output: None,
        })
    }

    /// Dimension of the weight vector (number of feature rows)
    pub fn dims(&self) -> usize {
        self.features.n_features()
    }

    /// Number of binary output components
    pub fn num_variables(&self) -> usize {
        self.ground_truth.len()
    }

    pub fn ground_truth(&self) -> &[f64] {
        &self.ground_truth
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    /// Linear decomposition of the cost function in use
    pub fn costs(&self) -> &LinearCosts {
        &self.costs
    }

    /// Most violating output found by the last evaluation
    pub fn last_output(&self) -> Option<&[f64]> {
        self.last_output.as_deref()
    }
}

impl<S: StructuredSolver> LossOracle for SoftMarginLoss<S> {
    fn value_and_gradient(&mut self, weights: &[f64]) -> Result<(f64, Vec<f64>)> {
        check_dimension(self.features.n_features(), weights.len())?;

        // Per-component scores of the outputs
        let projected = self.features.transpose_mul(weights)?;
        let ground_truth_score = dot(&projected, &self.ground_truth);

        for (i, (cost, score)) in self
            .costs
            .coefficients()
            .iter()
            .zip(projected.iter())
            .enumerate()
        {
            self.objective.set_coefficient(i, cost - score);
        }
        self.objective.set_constant(ground_truth_score + self.costs.offset());

        debug!(
            "Loss-augmented inference: projected costs {:?}, constant {}",
            projected,
            self.objective.constant()
        );

        let solution = self.solver.solve(&self.objective)?;
        if solution.assignment.len() != self.ground_truth.len() {
            return Err(StructSVMError::DimensionMismatch {
                expected: self.ground_truth.len(),
                actual: solution.assignment.len(),
            });
        }

        let violator_features = self.features.mul_vec(&solution.assignment)?;
        let gradient = sub(&self.ground_truth_features, &violator_features);

        debug!(
            "Soft margin loss {} at most violating output {:?}",
            solution.value, solution.assignment
        );

        self.last_output = Some(solution.assignment);
        Ok((solution.value, gradient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{LinearConstraint, Relation, Solution};
    use approx::assert_abs_diff_eq;

    /// Two groups of two components, exactly one active per group
    fn one_of_each_pair() -> Constraints {
        vec![
            LinearConstraint::with_terms(vec![(0, 1.0), (1, 1.0)], Relation::Equal, 1.0),
            LinearConstraint::with_terms(vec![(2, 1.0), (3, 1.0)], Relation::Equal, 1.0),
        ]
        .into_iter()
        .collect()
    }

    fn identity(n: usize) -> FeatureMatrix {
        let mut features = FeatureMatrix::zeros(n, n);
        for i in 0..n {
            features.set(i, i, 1.0);
        }
        features
    }

    fn identity_loss() -> SoftMarginLoss {
        SoftMarginLoss::new(
            &one_of_each_pair(),
            identity(4),
            vec![1.0, 0.0, 0.0, 1.0],
            None,
        )
        .unwrap()
    }

    fn mixed_loss() -> SoftMarginLoss {
        let features = FeatureMatrix::from_rows(vec![
            vec![1.0, 0.0, 1.0, 0.0],
            vec![0.0, 1.0, 0.0, 1.0],
            vec![0.5, -0.5, 0.25, 0.75],
        ])
        .unwrap();
        SoftMarginLoss::new(&one_of_each_pair(), features, vec![1.0, 0.0, 0.0, 1.0], None)
            .unwrap()
    }

    #[test]
    fn test_loss_at_zero_weights_is_max_hamming() {
        let mut loss = identity_loss();
        let (value, gradient) = loss.value_and_gradient(&[0.0; 4]).unwrap();

        assert_abs_diff_eq!(value, 4.0, epsilon = 1e-12);
        assert_eq!(gradient, vec![1.0, -1.0, -1.0, 1.0]);
        assert_eq!(loss.last_output(), Some(&[0.0, 1.0, 1.0, 0.0][..]));
    }

    #[test]
    fn test_loss_vanishes_with_margin() {
        let mut loss = identity_loss();
        let (value, gradient) = loss.value_and_gradient(&[-3.0, 3.0, 3.0, -3.0]).unwrap();

        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-12);
        assert_eq!(gradient, vec![0.0; 4]);
        assert_eq!(loss.last_output(), Some(loss.ground_truth()));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let mut loss = mixed_loss();
        let w = [0.2, -0.4, 0.3];

        let first = loss.value_and_gradient(&w).unwrap();
        let second = loss.value_and_gradient(&w).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_known_value_and_gradient() {
        let mut loss = mixed_loss();
        let (value, gradient) = loss.value_and_gradient(&[0.2, -0.4, 0.3]).unwrap();

        assert_abs_diff_eq!(value, 4.45, epsilon = 1e-12);
        assert_abs_diff_eq!(gradient[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gradient[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gradient[2], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let mut loss = mixed_loss();
        let w = vec![0.2, -0.4, 0.3];
        let h = 1e-6;

        let (_, gradient) = loss.value_and_gradient(&w).unwrap();

        for k in 0..w.len() {
            let mut forward = w.clone();
            forward[k] += h;
            let mut backward = w.clone();
            backward[k] -= h;

            let (up, _) = loss.value_and_gradient(&forward).unwrap();
            let (down, _) = loss.value_and_gradient(&backward).unwrap();
            let numeric = (up - down) / (2.0 * h);

            assert_abs_diff_eq!(numeric, gradient[k], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_gradient_is_subgradient() {
        let mut loss = mixed_loss();
        let w = [0.2, -0.4, 0.3];
        let (value, gradient) = loss.value_and_gradient(&w).unwrap();

        let probes = [
            [0.0, 0.0, 0.0],
            [1.0, -1.0, 2.0],
            [-2.0, 0.5, -1.0],
            [3.0, 3.0, 3.0],
        ];
        for v in probes {
            let (probe_value, _) = loss.value_and_gradient(&v).unwrap();
            let step: Vec<f64> = v.iter().zip(w.iter()).map(|(a, b)| a - b).collect();
            assert!(probe_value >= value + dot(&gradient, &step) - 1e-12);
        }
    }

    #[test]
    fn test_custom_costs() {
        let zero = LinearCosts::new(vec![0.0; 4], 0.0);
        let mut loss = SoftMarginLoss::new(
            &one_of_each_pair(),
            identity(4),
            vec![1.0, 0.0, 0.0, 1.0],
            Some(&zero),
        )
        .unwrap();

        // Without a margin the ground truth itself is a maximizer
        let (value, _) = loss.value_and_gradient(&[0.0; 4]).unwrap();
        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-12);
        assert_eq!(loss.costs(), &zero);
    }

    #[test]
    fn test_infeasible_constraints_propagate() {
        let constraints: Constraints =
            vec![LinearConstraint::with_terms(vec![(0, 1.0), (1, 1.0)], Relation::Equal, 3.0)]
                .into_iter()
                .collect();
        let mut loss =
            SoftMarginLoss::new(&constraints, identity(2), vec![1.0, 0.0], None).unwrap();

        let err = loss.value_and_gradient(&[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, StructSVMError::Infeasible(_)));
    }

    #[test]
    fn test_construction_validation() {
        let constraints = one_of_each_pair();

        let err = SoftMarginLoss::new(&constraints, identity(4), vec![1.0, 0.5, 0.0, 1.0], None)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            StructSVMError::NonBinaryGroundTruth { index: 1, .. }
        ));

        let err = SoftMarginLoss::new(&constraints, identity(3), vec![1.0, 0.0, 0.0, 1.0], None)
            .err()
            .unwrap();
        assert!(matches!(err, StructSVMError::DimensionMismatch { .. }));

        let short = LinearCosts::new(vec![1.0; 3], 0.0);
        let err = SoftMarginLoss::new(
            &constraints,
            identity(4),
            vec![1.0, 0.0, 0.0, 1.0],
            Some(&short),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            StructSVMError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));

        let out_of_range: Constraints =
            vec![LinearConstraint::with_terms(vec![(7, 1.0)], Relation::LessEqual, 1.0)]
                .into_iter()
                .collect();
        let err = SoftMarginLoss::new(&out_of_range, identity(4), vec![1.0, 0.0, 0.0, 1.0], None)
            .err()
            .unwrap();
        assert!(matches!(err, StructSVMError::InvalidConstraint(_)));
    }

    #[test]
    fn test_weight_dimension_checked() {
        let mut loss = mixed_loss();
        let err = loss.value_and_gradient(&[0.0; 4]).unwrap_err();
        assert!(matches!(
            err,
            StructSVMError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    /// Backend that ignores the objective and always returns the same output
    struct FixedOutput {
        output: Vec<f64>,
    }

    impl StructuredSolver for FixedOutput {
        fn create(num_variables: usize, _constraints: &Constraints) -> Result<Self> {
            let mut output = vec![0.0; num_variables];
            if let Some(first) = output.first_mut() {
                *first = 1.0;
            }
            Ok(Self { output })
        }

        fn num_variables(&self) -> usize {
            self.output.len()
        }

        fn solve(&mut self, objective: &LinearObjective) -> Result<Solution> {
            let value = objective.evaluate(&self.output);
            Ok(Solution::new(self.output.clone(), value))
        }
    }

    #[test]
    fn test_custom_backend() {
        let mut loss = SoftMarginLoss::<FixedOutput>::with_solver(
            &Constraints::new(),
            identity(2),
            vec![0.0, 1.0],
            None,
        )
        .unwrap();

        // y* = [1, 0]: Hamming 2, scores cancel at w = 0
        let (value, gradient) = loss.value_and_gradient(&[0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(value, 2.0, epsilon = 1e-12);
        assert_eq!(gradient, vec![-1.0, 1.0]);
    }
}
