//! Linear objectives and constraints over binary output vectors

use crate::core::{Result, StructSVMError};
use serde::{Deserialize, Serialize};

/// Optimization direction of a linear objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Maximize,
    Minimize,
}

/// Linear objective `⟨c, y⟩ + constant`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearObjective {
    coefficients: Vec<f64>,
    constant: f64,
    sense: Sense,
}

impl LinearObjective {
    /// Create an all-zero objective over `num_variables` variables
    pub fn new(num_variables: usize) -> Self {
        Self {
            coefficients: vec![0.0; num_variables],
            constant: 0.0,
            sense: Sense::Minimize,
        }
    }

    /// Create an objective from its coefficients
    pub fn with_coefficients(coefficients: Vec<f64>, constant: f64, sense: Sense) -> Self {
        Self {
            coefficients,
            constant,
            sense,
        }
    }

    pub fn set_coefficient(&mut self, i: usize, value: f64) {
        self.coefficients[i] = value;
    }

    pub fn set_constant(&mut self, constant: f64) {
        self.constant = constant;
    }

    pub fn set_sense(&mut self, sense: Sense) {
        self.sense = sense;
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn num_variables(&self) -> usize {
        self.coefficients.len()
    }

    /// Objective value of an assignment
    pub fn evaluate(&self, y: &[f64]) -> f64 {
        self.constant
            + self
                .coefficients
                .iter()
                .zip(y)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}

/// Relation between the left- and right-hand side of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    LessEqual,
    Equal,
    GreaterEqual,
}

/// Sparse linear constraint `Σ c_i y_i (≤ | = | ≥) value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    terms: Vec<(usize, f64)>,
    relation: Relation,
    value: f64,
}

impl LinearConstraint {
    /// Create an empty `≤ 0` constraint
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            relation: Relation::LessEqual,
            value: 0.0,
        }
    }

    /// Create a constraint from its terms
    pub fn with_terms(terms: Vec<(usize, f64)>, relation: Relation, value: f64) -> Self {
        Self {
            terms,
            relation,
            value,
        }
    }

    /// Set the coefficient of `y_variable`, replacing an existing term
    pub fn set_coefficient(&mut self, variable: usize, coefficient: f64) {
        match self.terms.iter_mut().find(|(v, _)| *v == variable) {
            Some(term) => term.1 = coefficient,
            None => self.terms.push((variable, coefficient)),
        }
    }

    pub fn set_relation(&mut self, relation: Relation) {
        self.relation = relation;
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn terms(&self) -> &[(usize, f64)] {
        &self.terms
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Left-hand side for an assignment
    pub fn activity(&self, y: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, c)| c * y[i]).sum()
    }

    /// Check the constraint for an assignment, with tolerance `tol`
    pub fn is_satisfied(&self, y: &[f64], tol: f64) -> bool {
        let lhs = self.activity(y);
        match self.relation {
            Relation::LessEqual => lhs <= self.value + tol,
            Relation::Equal => (lhs - self.value).abs() <= tol,
            Relation::GreaterEqual => lhs >= self.value - tol,
        }
    }
}

impl Default for LinearConstraint {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered set of linear constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    constraints: Vec<LinearConstraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter()
    }

    /// Check that all constraints refer to existing variables and carry
    /// finite numbers
    pub fn validate(&self, num_variables: usize) -> Result<()> {
        for (k, constraint) in self.constraints.iter().enumerate() {
            if !constraint.value.is_finite() {
                return Err(StructSVMError::InvalidConstraint(format!(
                    "constraint {k} has non-finite right-hand side {}",
                    constraint.value
                )));
            }
            for &(variable, coefficient) in &constraint.terms {
                if variable >= num_variables {
                    return Err(StructSVMError::InvalidConstraint(format!(
                        "constraint {k} refers to variable {variable}, but there are only {num_variables}"
                    )));
                }
                if !coefficient.is_finite() {
                    return Err(StructSVMError::InvalidConstraint(format!(
                        "constraint {k} has non-finite coefficient {coefficient} for variable {variable}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check all constraints for an assignment
    pub fn is_satisfied(&self, y: &[f64], tol: f64) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied(y, tol))
    }
}

impl FromIterator<LinearConstraint> for Constraints {
    fn from_iter<I: IntoIterator<Item = LinearConstraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

/// Optimal assignment returned by a structured solver
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Assignment, one 0.0/1.0 entry per variable
    pub assignment: Vec<f64>,
    /// Objective value at `assignment`
    pub value: f64,
}

impl Solution {
    pub fn new(assignment: Vec<f64>, value: f64) -> Self {
        Self { assignment, value }
    }

    /// Indices of the variables set to one
    pub fn selected(&self) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| if v > 0.5 { Some(i) } else { None })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_evaluate() {
        let mut objective = LinearObjective::new(3);
        objective.set_coefficient(0, 2.0);
        objective.set_coefficient(2, -1.0);
        objective.set_constant(0.5);
        objective.set_sense(Sense::Maximize);

        assert_eq!(objective.evaluate(&[1.0, 1.0, 1.0]), 1.5);
        assert_eq!(objective.evaluate(&[0.0, 0.0, 0.0]), 0.5);
        assert_eq!(objective.sense(), Sense::Maximize);
        assert_eq!(objective.num_variables(), 3);
    }

    #[test]
    fn test_constraint_relations() {
        let y = [1.0, 0.0, 1.0];

        let mut constraint = LinearConstraint::new();
        constraint.set_coefficient(0, 1.0);
        constraint.set_coefficient(2, 1.0);
        constraint.set_value(2.0);

        constraint.set_relation(Relation::LessEqual);
        assert!(constraint.is_satisfied(&y, 1e-9));
        constraint.set_relation(Relation::Equal);
        assert!(constraint.is_satisfied(&y, 1e-9));
        constraint.set_relation(Relation::GreaterEqual);
        assert!(constraint.is_satisfied(&y, 1e-9));

        constraint.set_value(1.0);
        assert!(constraint.is_satisfied(&y, 1e-9));
        constraint.set_relation(Relation::Equal);
        assert!(!constraint.is_satisfied(&y, 1e-9));
        constraint.set_relation(Relation::LessEqual);
        assert!(!constraint.is_satisfied(&y, 1e-9));
    }

    #[test]
    fn test_constraint_set_coefficient_overwrites() {
        let mut constraint = LinearConstraint::new();
        constraint.set_coefficient(1, 1.0);
        constraint.set_coefficient(1, 3.0);
        assert_eq!(constraint.terms(), &[(1, 3.0)]);
    }

    #[test]
    fn test_constraints_validate() {
        let mut constraints = Constraints::new();
        constraints.add(LinearConstraint::with_terms(
            vec![(0, 1.0), (1, 1.0)],
            Relation::Equal,
            1.0,
        ));
        assert!(constraints.validate(2).is_ok());

        let result = constraints.validate(1);
        assert!(matches!(result, Err(StructSVMError::InvalidConstraint(_))));

        let nan: Constraints = vec![LinearConstraint::with_terms(
            vec![(0, f64::NAN)],
            Relation::LessEqual,
            1.0,
        )]
        .into_iter()
        .collect();
        assert!(nan.validate(1).is_err());

        let inf_rhs: Constraints = vec![LinearConstraint::with_terms(
            vec![(0, 1.0)],
            Relation::LessEqual,
            f64::INFINITY,
        )]
        .into_iter()
        .collect();
        assert!(inf_rhs.validate(1).is_err());
    }

    #[test]
    fn test_solution_selected() {
        let solution = Solution::new(vec![0.0, 1.0, 1.0, 0.0], 3.0);
        assert_eq!(solution.selected(), vec![1, 2]);
    }
}
