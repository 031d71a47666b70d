//! DPGMM math utilities.

pub mod math;

pub use math::stable::*;
pub use math::normal::*;
pub use math::linalg::{self, LinalgError, SpdFactor};
pub use math::gaussian;
pub use math::student_t;
pub use math::wishart;
