//! Model serialization and persistence
//!
//! Trained weight vectors are stored as JSON together with the training
//! summary and the parameters they were trained with.

use crate::api::{TrainedModel, TrainingSummary};
use crate::core::{BundleConfig, Result, StructSVMError};
use crate::utils::validation::{all_finite, check_dimension};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Serializable representation of a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableModel {
    /// Weight vector
    pub weights: Vec<f64>,
    /// How training went
    pub summary: TrainingSummary,
    /// Model metadata
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Dimension of the weight vector
    pub dims: usize,
    /// Training parameters used
    pub training_params: BundleConfig,
    /// Creation timestamp
    pub created_at: String,
}

impl SerializableModel {
    /// Create a serializable model from a trained model
    pub fn from_trained_model(model: &TrainedModel) -> Self {
        Self {
            weights: model.weights().to_vec(),
            summary: model.summary().clone(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                dims: model.weights().len(),
                training_params: model.config().clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(StructSVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| StructSVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(StructSVMError::IoError)?;
        let reader = BufReader::new(file);
        let model = serde_json::from_reader(reader)
            .map_err(|e| StructSVMError::ParseError(format!("Failed to parse model: {e}")))?;
        Ok(model)
    }

    /// Convert back to a trained model
    pub fn to_trained_model(&self) -> Result<TrainedModel> {
        check_dimension(self.metadata.dims, self.weights.len())?;
        if !all_finite(&self.weights) {
            return Err(StructSVMError::ParseError(
                "Model contains non-finite weights".to_string(),
            ));
        }
        self.metadata.training_params.validate()?;

        Ok(TrainedModel::from_parts(
            self.weights.clone(),
            self.summary.clone(),
            self.metadata.training_params.clone(),
        ))
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== Structured SVM Model Summary ===");
        println!("Dimensions: {}", self.metadata.dims);
        println!("Iterations: {}", self.summary.iterations);
        println!("Termination: {:?}", self.summary.termination);
        if let Some(gap) = self.summary.gap {
            println!("Duality Gap: {gap:e}");
        }
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Training Parameters:");
        println!(
            "  Regularizer Weight: {}",
            self.metadata.training_params.regularizer_weight
        );
        println!("  Epsilon: {}", self.metadata.training_params.eps);
        println!(
            "  Max Iterations: {}",
            self.metadata.training_params.max_iterations
        );
    }
}

/// Save a trained model as JSON
pub fn save_model<P: AsRef<Path>>(model: &TrainedModel, path: P) -> Result<()> {
    SerializableModel::from_trained_model(model).save_to_file(path)
}

/// Load a trained model saved with [`save_model`]
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
    SerializableModel::load_from_file(path)?.to_trained_model()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StructuredSVM;
    use crate::optimizer::from_fn;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn quadratic_model(max_iterations: usize) -> TrainedModel {
        StructuredSVM::new()
            .with_regularizer_weight(1e-4)
            .with_epsilon(1e-5)
            .with_max_iterations(max_iterations)
            .train(
                from_fn(|x: &[f64]| ((x[0] - 1.0).powi(2), vec![2.0 * (x[0] - 1.0)])),
                1,
            )
            .expect("Training should succeed")
    }

    #[test]
    fn test_model_serialization() -> Result<()> {
        let model = quadratic_model(100);
        let serializable = SerializableModel::from_trained_model(&model);

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        serializable.save_to_file(temp_file.path())?;

        let loaded = SerializableModel::load_from_file(temp_file.path())?;
        assert_eq!(loaded.weights, model.weights());
        assert_eq!(&loaded.summary, model.summary());
        assert_eq!(&loaded.metadata.training_params, model.config());
        assert_eq!(loaded.metadata.library_version, env!("CARGO_PKG_VERSION"));
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.metadata.created_at).is_ok());

        let restored = loaded.to_trained_model()?;
        assert_eq!(restored.weights(), model.weights());
        assert!(restored.converged());
        Ok(())
    }

    #[test]
    fn test_untrained_model_round_trip() -> Result<()> {
        let model = quadratic_model(0);

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        save_model(&model, temp_file.path())?;
        let restored = load_model(temp_file.path())?;

        assert_eq!(restored.weights(), &[0.0]);
        assert_eq!(restored.summary().gap, None);
        Ok(())
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "{{\"weights\": [1.0").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        assert!(matches!(
            SerializableModel::load_from_file(temp_file.path()),
            Err(StructSVMError::ParseError(_))
        ));
        assert!(matches!(
            load_model("/nonexistent/model.json"),
            Err(StructSVMError::IoError(_))
        ));
    }

    #[test]
    fn test_inconsistent_model_rejected() {
        let mut serializable = SerializableModel::from_trained_model(&quadratic_model(5));
        serializable.metadata.dims = 3;
        assert!(matches!(
            serializable.to_trained_model(),
            Err(StructSVMError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }
}
