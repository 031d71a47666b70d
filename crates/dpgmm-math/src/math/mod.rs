//! Core math modules.

pub mod stable;
pub mod normal;
pub mod linalg;
pub mod gaussian;
pub mod student_t;
pub mod wishart;
