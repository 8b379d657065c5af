//! Depth-first branch and bound over binary assignments
//!
//! Default [`StructuredSolver`] backend. Variables are fixed in index order;
//! a subtree is cut when its optimistic objective bound cannot beat the
//! incumbent or when some constraint can no longer be satisfied by any
//! completion of the partial assignment.

use crate::core::{Result, StructSVMError, StructuredSolver};
use crate::solver::linear::{Constraints, LinearObjective, Relation, Sense, Solution};
use log::trace;

/// Feasibility tolerance for constraint checks
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// Dense copy of one constraint with precomputed activity ranges
#[derive(Debug, Clone)]
struct DenseConstraint {
    coefficients: Vec<f64>,
    relation: Relation,
    value: f64,
    /// suffix_min[i] = Σ_{j ≥ i} min(0, c_j)
    suffix_min: Vec<f64>,
    /// suffix_max[i] = Σ_{j ≥ i} max(0, c_j)
    suffix_max: Vec<f64>,
}

impl DenseConstraint {
    fn new(coefficients: Vec<f64>, relation: Relation, value: f64) -> Self {
        let n = coefficients.len();
        let mut suffix_min = vec![0.0; n + 1];
        let mut suffix_max = vec![0.0; n + 1];
        for i in (0..n).rev() {
            suffix_min[i] = suffix_min[i + 1] + coefficients[i].min(0.0);
            suffix_max[i] = suffix_max[i + 1] + coefficients[i].max(0.0);
        }
        Self {
            coefficients,
            relation,
            value,
            suffix_min,
            suffix_max,
        }
    }

    /// Check whether some completion of variables `depth..` can satisfy
    /// the constraint, given the activity of the fixed prefix
    fn can_be_satisfied(&self, activity: f64, depth: usize) -> bool {
        let lowest = activity + self.suffix_min[depth];
        let highest = activity + self.suffix_max[depth];
        match self.relation {
            Relation::LessEqual => lowest <= self.value + FEASIBILITY_TOLERANCE,
            Relation::GreaterEqual => highest >= self.value - FEASIBILITY_TOLERANCE,
            Relation::Equal => {
                lowest <= self.value + FEASIBILITY_TOLERANCE
                    && highest >= self.value - FEASIBILITY_TOLERANCE
            }
        }
    }
}

/// Mutable state of one search
struct SearchState {
    /// Objective coefficients in maximization form
    gains: Vec<f64>,
    /// optimistic[i] = Σ_{j ≥ i} max(0, gains_j)
    optimistic: Vec<f64>,
    assignment: Vec<f64>,
    activities: Vec<f64>,
    current: f64,
    best: Option<(f64, Vec<f64>)>,
    nodes: usize,
}

/// Exact solver for binary linear programs by branch and bound
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    num_variables: usize,
    constraints: Vec<DenseConstraint>,
    last_nodes: usize,
}

impl BranchAndBound {
    /// Create a solver over `num_variables` binary variables
    pub fn new(num_variables: usize, constraints: &Constraints) -> Result<Self> {
        constraints.validate(num_variables)?;

        let constraints = constraints
            .iter()
            .map(|constraint| {
                let mut coefficients = vec![0.0; num_variables];
                for &(variable, coefficient) in constraint.terms() {
                    coefficients[variable] += coefficient;
                }
                DenseConstraint::new(coefficients, constraint.relation(), constraint.value())
            })
            .collect();

        Ok(Self {
            num_variables,
            constraints,
            last_nodes: 0,
        })
    }

    /// Number of search nodes visited by the last call to `solve`
    pub fn last_nodes(&self) -> usize {
        self.last_nodes
    }

    fn search(&self, state: &mut SearchState, depth: usize) {
        state.nodes += 1;

        let feasible = self
            .constraints
            .iter()
            .zip(&state.activities)
            .all(|(constraint, &activity)| constraint.can_be_satisfied(activity, depth));
        if !feasible {
            return;
        }

        if depth == self.num_variables {
            let improves = match &state.best {
                Some((best, _)) => state.current > *best,
                None => true,
            };
            if improves {
                state.best = Some((state.current, state.assignment.clone()));
            }
            return;
        }

        if let Some((best, _)) = &state.best {
            if state.current + state.optimistic[depth] <= *best {
                return;
            }
        }

        let gain = state.gains[depth];
        let order = if gain > 0.0 { [1.0, 0.0] } else { [0.0, 1.0] };

        for value in order {
            state.assignment[depth] = value;
            if value == 1.0 {
                state.current += gain;
                for (activity, constraint) in state.activities.iter_mut().zip(&self.constraints) {
                    *activity += constraint.coefficients[depth];
                }
            }

            self.search(state, depth + 1);

            if value == 1.0 {
                state.current -= gain;
                for (activity, constraint) in state.activities.iter_mut().zip(&self.constraints) {
                    *activity -= constraint.coefficients[depth];
                }
            }
            state.assignment[depth] = 0.0;
        }
    }
}

impl StructuredSolver for BranchAndBound {
    fn create(num_variables: usize, constraints: &Constraints) -> Result<Self> {
        Self::new(num_variables, constraints)
    }

    fn num_variables(&self) -> usize {
        self.num_variables
    }

    fn solve(&mut self, objective: &LinearObjective) -> Result<Solution> {
        if objective.num_variables() != self.num_variables {
            return Err(StructSVMError::DimensionMismatch {
                expected: self.num_variables,
                actual: objective.num_variables(),
            });
        }
        if !objective.coefficients().iter().all(|c| c.is_finite()) {
            return Err(StructSVMError::OptimizationError(
                "objective has non-finite coefficients".to_string(),
            ));
        }

        let gains: Vec<f64> = match objective.sense() {
            Sense::Maximize => objective.coefficients().to_vec(),
            Sense::Minimize => objective.coefficients().iter().map(|c| -c).collect(),
        };

        let n = self.num_variables;
        let mut optimistic = vec![0.0; n + 1];
        for i in (0..n).rev() {
            optimistic[i] = optimistic[i + 1] + gains[i].max(0.0);
        }

        let mut state = SearchState {
            gains,
            optimistic,
            assignment: vec![0.0; n],
            activities: vec![0.0; self.constraints.len()],
            current: 0.0,
            best: None,
            nodes: 0,
        };

        self.search(&mut state, 0);
        self.last_nodes = state.nodes;
        trace!("branch and bound visited {} nodes", state.nodes);

        match state.best {
            Some((_, assignment)) => {
                let value = objective.evaluate(&assignment);
                Ok(Solution::new(assignment, value))
            }
            None => Err(StructSVMError::Infeasible(format!(
                "no binary assignment of {n} variables satisfies the {} constraints",
                self.constraints.len()
            ))),
        }
    }
}
