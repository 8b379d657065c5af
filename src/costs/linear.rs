//! User-supplied linear costs

use crate::costs::CostFunction;
use serde::{Deserialize, Serialize};

/// Linear cost function with caller-provided coefficients and offset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearCosts {
    coefficients: Vec<f64>,
    offset: f64,
}

impl LinearCosts {
    /// Create costs `⟨coefficients, y⟩ + offset`
    pub fn new(coefficients: Vec<f64>, offset: f64) -> Self {
        Self {
            coefficients,
            offset,
        }
    }

    pub fn set_coefficients(&mut self, coefficients: Vec<f64>) {
        self.coefficients = coefficients;
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }
}

impl CostFunction for LinearCosts {
    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn offset(&self) -> f64 {
        self.offset
    }
}

/// Capture any cost function as plain linear costs
impl<C: CostFunction + ?Sized> From<&C> for LinearCosts {
    fn from(costs: &C) -> Self {
        Self::new(costs.coefficients().to_vec(), costs.offset())
    }
}
