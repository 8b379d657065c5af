//! Loss oracles for structured SVM training

pub mod soft_margin;
pub mod sum;

pub use self::soft_margin::*;
pub use self::sum::*;
