//! Dirichlet process Gaussian mixture density estimation.
//!
//! This library provides:
//! - The probit coordinate change between a bounded box and `ℝᴰ`
//! - Online NIW sufficient statistics and the Student-t predictive
//! - One-pass DPGMM and hierarchical (HDPGMM) estimators
//! - Immutable, serialisable [`Draw`]s and a [`Density`] interface with
//!   Monte Carlo utilities
//! - Session configuration loading, structured logging and CLI exit codes
//!
//! The binary entry point is in `main.rs`.
//!
//! ```ignore
//! use dpgmm_core::{Bounds, Dpgmm};
//!
//! let bounds = Bounds::new(&[[10.0, 50.0]])?;
//! let mut session = Dpgmm::new(bounds, None, None)?.with_seed(42);
//! let draw = session.density_from_samples(&samples)?;
//! println!("{}", draw.pdf(&[30.0])?);
//! ```

pub mod config;
pub mod density;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod mixture;
pub mod prior;
pub mod suffstats;
pub mod transform;

pub use density::{
    median_pdf, monte_carlo_entropy, monte_carlo_expectation, percentile_pdf, sample_from_draws,
    Density, ExternalDensity,
};
pub use error::{MixtureError, Result};
pub use mixture::{ConcentrationSampler, Component, Dpgmm, Draw, DrawKind, DrawRecord, Hdpgmm};
pub use prior::{NiwPrior, PriorBuilder};
pub use suffstats::{ClusterStats, NiwPosterior, StudentT};
pub use transform::Bounds;
