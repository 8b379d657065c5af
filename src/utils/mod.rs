//! Utility functions for dense vectors and input validation

/// Dense vector arithmetic
pub mod linalg {
    /// Inner product of two equally long slices
    pub fn dot(x: &[f64], y: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), y.len());
        x.iter().zip(y).map(|(a, b)| a * b).sum()
    }

    /// Squared L2 norm
    pub fn norm_squared(x: &[f64]) -> f64 {
        x.iter().map(|&v| v * v).sum()
    }

    /// `y += alpha * x`
    pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), y.len());
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi += alpha * xi;
        }
    }

    /// Element-wise difference `x - y`
    pub fn sub(x: &[f64], y: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), y.len());
        x.iter().zip(y).map(|(a, b)| a - b).collect()
    }
}

/// Input validation helpers
pub mod validation {
    use crate::core::{Result, StructSVMError};

    /// Check that every entry is exactly 0 or 1
    pub fn validate_binary(values: &[f64]) -> Result<()> {
        match values
            .iter()
            .enumerate()
            .find(|(_, &v)| v != 0.0 && v != 1.0)
        {
            Some((index, &value)) => Err(StructSVMError::NonBinaryGroundTruth { index, value }),
            None => Ok(()),
        }
    }

    /// Check that a slice has the expected length
    pub fn check_dimension(expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(StructSVMError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }

    /// Check that every entry is finite
    pub fn all_finite(values: &[f64]) -> bool {
        values.iter().all(|v| v.is_finite())
    }
}
