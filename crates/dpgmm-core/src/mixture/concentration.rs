//! Metropolis-Hastings update of the Dirichlet process concentration `α`.
//!
//! Full conditional given `K` clusters over `n` points:
//!
//! ```text
//! log p(α | K, n) = lnΓ(α) − lnΓ(α + n) + K·ln α − 1/α   (+ const)
//! ```
//!
//! Proposals are a symmetric uniform random walk `α' = α + w·(U − ½)`;
//! non-positive proposals are rejected outright.

use dpgmm_config::SamplerSection;
use dpgmm_math::log_gamma;
use rand::Rng;

/// Default number of proposals per update.
pub const DEFAULT_MH_STEPS: usize = 1000;

/// Default random-walk width.
pub const DEFAULT_STEP_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcentrationSampler {
    steps: usize,
    width: f64,
}

impl Default for ConcentrationSampler {
    fn default() -> Self {
        Self {
            steps: DEFAULT_MH_STEPS,
            width: DEFAULT_STEP_WIDTH,
        }
    }
}

impl ConcentrationSampler {
    /// `steps` is floored at one; a non-positive or non-finite width falls
    /// back to the default.
    pub fn new(steps: usize, width: f64) -> Self {
        Self {
            steps: steps.max(1),
            width: if width > 0.0 && width.is_finite() {
                width
            } else {
                DEFAULT_STEP_WIDTH
            },
        }
    }

    pub fn from_section(section: &SamplerSection) -> Self {
        Self::new(section.mh_steps, section.mh_step_width)
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Unnormalised log full conditional; `−∞` for `α ≤ 0`.
    pub fn log_target(alpha: f64, n_clusters: usize, n_points: usize) -> f64 {
        if !(alpha > 0.0) {
            return f64::NEG_INFINITY;
        }
        log_gamma(alpha) - log_gamma(alpha + n_points as f64) + n_clusters as f64 * alpha.ln()
            - 1.0 / alpha
    }

    /// Run the chain for `steps` proposals starting from `alpha`.
    ///
    /// With no points absorbed there is nothing to condition on and `alpha`
    /// is returned unchanged.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        alpha: f64,
        n_clusters: usize,
        n_points: usize,
        rng: &mut R,
    ) -> f64 {
        if n_points == 0 {
            return alpha;
        }
        let mut current = alpha;
        let mut current_lp = Self::log_target(current, n_clusters, n_points);
        for _ in 0..self.steps {
            let proposal = current + self.width * (rng.random::<f64>() - 0.5);
            if proposal <= 0.0 {
                continue;
            }
            let proposal_lp = Self::log_target(proposal, n_clusters, n_points);
            let log_ratio = proposal_lp - current_lp;
            if log_ratio >= 0.0 || rng.random::<f64>().ln() < log_ratio {
                current = proposal;
                current_lp = proposal_lp;
            }
        }
        current
    }
}
