//! Cost functions Δ(y′, y) with a linear decomposition over binary outputs

pub mod hamming;
pub mod linear;
pub mod traits;

pub use self::hamming::*;
pub use self::linear::*;
pub use self::traits::*;
