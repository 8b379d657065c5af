//! Solver backends
//!
//! Two problems are solved repeatedly while training:
//!
//! * loss-augmented inference, a linear objective over binary variables
//!   subject to linear constraints ([`BranchAndBound`])
//! * the bundle master problem, a quadratic program over the cutting
//!   planes collected so far ([`SimplexQpSolver`])

pub mod branch_bound;
pub mod linear;
pub mod master;

pub use self::branch_bound::*;
pub use self::linear::*;
pub use self::master::*;
