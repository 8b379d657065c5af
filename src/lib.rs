//! Structured SVM training with a bundle method
//!
//! Structured-output models are trained by minimizing a regularized
//! structured hinge loss. The loss is evaluated by loss-augmented inference
//! over binary outputs subject to linear constraints, and minimized by a
//! bundle method that only needs values and subgradients.

pub mod api;
pub mod cache;
pub mod core;
pub mod costs;
pub mod loss;
pub mod optimizer;
pub mod persistence;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, StructuredSVM, TrainedModel, TrainingExample};
pub use crate::cache::{CacheStats, GramCache};
pub use crate::core::{Result, StructSVMError};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::costs::{CostFunction, HammingCosts, LinearCosts};
pub use crate::loss::{LossSum, SoftMarginLoss};
pub use crate::optimizer::{from_fn, BundleMethod, FnOracle};
pub use crate::solver::{
    BranchAndBound, Constraints, LinearConstraint, LinearObjective, Relation, Sense,
    SimplexQpSolver, Solution,
};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
