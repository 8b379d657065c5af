//! Empirical risk over several training examples

use crate::core::{LossOracle, Result, StructSVMError};
use crate::utils::linalg::axpy;

/// Sum of loss oracles sharing one weight vector
///
/// With averaging enabled the value and gradient are divided by the number
/// of terms, which keeps the scale of λ independent of the dataset size.
pub struct LossSum<O: LossOracle = Box<dyn LossOracle>> {
    dims: usize,
    terms: Vec<O>,
    average: bool,
}

impl<O: LossOracle> LossSum<O> {
    /// Create an empty sum over weight vectors of dimension `dims`
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            terms: Vec::new(),
            average: false,
        }
    }

    /// Divide value and gradient by the number of terms
    pub fn with_averaging(mut self, average: bool) -> Self {
        self.average = average;
        self
    }

    pub fn push(&mut self, term: O) {
        self.terms.push(term);
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[O] {
        &self.terms
    }
}

impl<O: LossOracle> LossOracle for LossSum<O> {
    fn value_and_gradient(&mut self, weights: &[f64]) -> Result<(f64, Vec<f64>)> {
        let mut value = 0.0;
        let mut gradient = vec![0.0; self.dims];

        for term in &mut self.terms {
            let (term_value, term_gradient) = term.value_and_gradient(weights)?;
            if term_gradient.len() != self.dims {
                return Err(StructSVMError::DimensionMismatch {
                    expected: self.dims,
                    actual: term_gradient.len(),
                });
            }
            value += term_value;
            axpy(1.0, &term_gradient, &mut gradient);
        }

        if self.average && !self.terms.is_empty() {
            let scale = 1.0 / self.terms.len() as f64;
            value *= scale;
            gradient.iter_mut().for_each(|g| *g *= scale);
        }

        Ok((value, gradient))
    }
}

impl<O: LossOracle> Extend<O> for LossSum<O> {
    fn extend<I: IntoIterator<Item = O>>(&mut self, iter: I) {
        self.terms.extend(iter);
    }
}
