//! Dirichlet process Gaussian mixtures.
//!
//! - [`Dpgmm`]: one-pass sequential assignment of points in probit space.
//! - [`Hdpgmm`]: the same algorithm where every observation is a set of
//!   candidate [`Draw`]s from a lower-level fit.
//! - [`ConcentrationSampler`]: Metropolis-Hastings update of `α`.

pub mod concentration;
pub mod dpgmm;
pub mod draw;
pub mod hierarchical;

pub use concentration::ConcentrationSampler;
pub use dpgmm::Dpgmm;
pub use draw::{Component, Draw, DrawKind, DrawRecord};
pub use hierarchical::Hdpgmm;

use dpgmm_math::normalize_log_weights;
use rand::Rng;

/// Index drawn from the categorical distribution `probs` (summing to one).
///
/// Rounding slack at the top end goes to the last outcome with positive
/// probability.
pub(crate) fn sample_categorical<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    let u: f64 = rng.random();
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (i, &p) in probs.iter().enumerate() {
        if p > 0.0 {
            last_positive = i;
        }
        acc += p;
        if u < acc {
            return i;
        }
    }
    last_positive
}

/// Chinese-restaurant choice among `scores` (existing clusters first, the
/// new-cluster score last). Returns `None` to open a new cluster.
///
/// When no score is finite the point opens a new cluster.
pub(crate) fn choose_cluster<R: Rng + ?Sized>(scores: &[f64], rng: &mut R) -> Option<usize> {
    let new_slot = scores.len().saturating_sub(1);
    if new_slot == 0 {
        return None;
    }
    let choice = match normalize_log_weights(scores) {
        Some(probs) => sample_categorical(&probs, rng),
        None => new_slot,
    };
    (choice < new_slot).then_some(choice)
}
