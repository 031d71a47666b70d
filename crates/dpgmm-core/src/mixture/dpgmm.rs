//! One-pass DPGMM in probit space.
//!
//! Points are assigned in arrival order by the Chinese-restaurant rule:
//!
//! ```text
//! existing k:  log n_k + log t(y | ν_n − D + 1, μ_n, Λ_n (k_n + 1) / (k_n (ν_n − D + 1)))
//! new:         log α   + log t(y | prior predictive)
//! ```
//!
//! Earlier assignments are never revisited, so the result depends on the
//! order of the input. [`Dpgmm::density_from_samples`] shuffles before each
//! pass; independent passes give independent posterior-predictive draws.

use super::concentration::ConcentrationSampler;
use super::draw::{Component, Draw, DrawKind};
use super::choose_cluster;
use crate::error::{MixtureError, Result};
use crate::logging::{event_names, Stage};
use crate::prior::{NiwPrior, PriorBuilder};
use crate::suffstats::{ClusterStats, NiwPosterior, StudentT};
use crate::transform::Bounds;
use dpgmm_config::SessionConfig;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

/// Initial concentration when none is given.
pub const DEFAULT_ALPHA0: f64 = 1.0;

#[derive(Debug, Clone)]
struct Cluster {
    stats: ClusterStats,
    /// `None` when the posterior scale failed to factor (non-finite input).
    predictive: Option<StudentT>,
}

impl Cluster {
    fn seeded(y: &DVector<f64>, prior: &NiwPrior) -> Self {
        let mut c = Self {
            stats: ClusterStats::seeded(y),
            predictive: None,
        };
        c.refresh(prior);
        c
    }

    fn absorb(&mut self, y: &DVector<f64>, prior: &NiwPrior) {
        self.stats.push(y);
        self.refresh(prior);
    }

    fn refresh(&mut self, prior: &NiwPrior) {
        self.predictive = self.stats.posterior(prior).predictive().ok();
    }

    fn score(&self, y: &DVector<f64>) -> f64 {
        match &self.predictive {
            Some(t) => (self.stats.n() as f64).ln() + t.log_pdf(y),
            None => f64::NAN,
        }
    }
}

/// A DPGMM estimation session.
#[derive(Debug)]
pub struct Dpgmm {
    bounds: Bounds,
    prior: NiwPrior,
    prior_predictive: StudentT,
    alpha: f64,
    sampler: ConcentrationSampler,
    clusters: Vec<Cluster>,
    n_points: usize,
    sealed: bool,
    rng: StdRng,
}

impl Dpgmm {
    /// New empty session. Without a prior the default
    /// `(1e-2, 0.2²·I, D + 2, 0)` is used.
    pub fn new(bounds: Bounds, prior: Option<NiwPrior>, alpha0: Option<f64>) -> Result<Self> {
        let prior = match prior {
            Some(p) => p,
            None => NiwPrior::default_for(bounds.dim())?,
        };
        bounds.check_dim(prior.dim())?;
        let alpha = alpha0.unwrap_or(DEFAULT_ALPHA0);
        if !(alpha > 0.0 && alpha.is_finite()) {
            return Err(MixtureError::InvalidPrior(format!(
                "alpha0 must be positive, got {}",
                alpha
            )));
        }
        let prior_predictive = NiwPosterior::from_prior(&prior).predictive()?;
        Ok(Self {
            bounds,
            prior,
            prior_predictive,
            alpha,
            sampler: ConcentrationSampler::default(),
            clusters: Vec::new(),
            n_points: 0,
            sealed: false,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Session configured from a `SessionConfig`; `samples` feed the prior
    /// recipe when `prior.from_samples` is set.
    pub fn from_session(
        bounds: Bounds,
        config: &SessionConfig,
        samples: Option<&[Vec<f64>]>,
    ) -> Result<Self> {
        let mut rng = match config.sampler.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut builder = PriorBuilder::from_section(&config.prior, bounds.dim());
        if let (true, Some(samples)) = (config.prior.from_samples, samples) {
            builder = builder.samples(samples);
        }
        let prior = builder.build(&bounds, &mut rng)?;
        let mut session = Self::new(bounds, Some(prior), Some(config.sampler.alpha0))?
            .with_sampler(ConcentrationSampler::from_section(&config.sampler));
        session.rng = rng;
        Ok(session)
    }

    /// Reseed the session generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_sampler(mut self, sampler: ConcentrationSampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn prior(&self) -> &NiwPrior {
        &self.prior
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(|c| c.stats.n()).collect()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Mark the session final. Further points or builds fail with
    /// [`MixtureError::UseAfterBuild`] until [`Dpgmm::initialise`].
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Drop all clusters, optionally switching bounds and/or prior.
    ///
    /// `α` is kept so that successive draws form one chain. New bounds of a
    /// different dimension without a new prior fall back to the default prior.
    pub fn initialise(&mut self, bounds: Option<Bounds>, prior: Option<NiwPrior>) -> Result<()> {
        let bounds = bounds.unwrap_or_else(|| self.bounds.clone());
        let prior = match prior {
            Some(p) => p,
            None if self.prior.dim() == bounds.dim() => self.prior.clone(),
            None => NiwPrior::default_for(bounds.dim())?,
        };
        bounds.check_dim(prior.dim())?;
        self.prior_predictive = NiwPosterior::from_prior(&prior).predictive()?;
        self.bounds = bounds;
        self.prior = prior;
        self.clusters.clear();
        self.n_points = 0;
        self.sealed = false;
        Ok(())
    }

    /// Assign one natural-space point.
    ///
    /// Points on or outside the bounds are not rejected: their probit
    /// coordinates are non-finite and poison whichever cluster receives them.
    pub fn add_new_point(&mut self, x: &[f64]) -> Result<()> {
        self.ensure_open()?;
        self.bounds.check_dim(x.len())?;
        let y = self.bounds.to_probit(x);
        if y.iter().any(|v| !v.is_finite()) {
            warn!(
                event = event_names::POINT_OUT_OF_BOUNDS,
                stage = %Stage::Fit,
                point = ?x,
                "sample is not strictly inside the bounds; probit coordinates are non-finite"
            );
        }
        self.assign(&y);
        Ok(())
    }

    fn assign(&mut self, y: &DVector<f64>) {
        let mut scores: Vec<f64> = self.clusters.iter().map(|c| c.score(y)).collect();
        scores.push(self.alpha.ln() + self.prior_predictive.log_pdf(y));
        match choose_cluster(&scores, &mut self.rng) {
            Some(k) => {
                self.clusters[k].absorb(y, &self.prior);
                trace!(
                    event = event_names::POINT_ASSIGNED,
                    cluster = k,
                    size = self.clusters[k].stats.n(),
                    "joined cluster"
                );
            }
            None => {
                self.clusters.push(Cluster::seeded(y, &self.prior));
                trace!(
                    event = event_names::POINT_ASSIGNED,
                    cluster = self.clusters.len() - 1,
                    "opened cluster"
                );
            }
        }
        self.n_points += 1;
    }

    /// Snapshot the current clusters as a [`Draw`] without changing state.
    ///
    /// Component `k` has the posterior mean, the posterior expected
    /// covariance and weight `n_k / N`. An empty session yields the prior as
    /// a single component.
    pub fn build_mixture(&self) -> Result<Draw> {
        self.ensure_open()?;
        let components = if self.clusters.is_empty() {
            vec![Component::new(
                1.0,
                self.prior.mean().clone(),
                self.prior.expected_cov().clone(),
            )?]
        } else {
            self.clusters
                .iter()
                .map(|c| {
                    let post = c.stats.posterior(&self.prior);
                    let cov = post.expected_cov();
                    Component::new(c.stats.n() as f64, post.mean, cov)
                })
                .collect::<Result<Vec<_>>>()?
        };
        Draw::from_components(
            components,
            self.bounds.clone(),
            DrawKind::Single,
            self.n_points,
            self.alpha,
        )
    }

    /// One Metropolis-Hastings update of `α` given the current partition.
    pub fn update_alpha(&mut self) -> f64 {
        self.alpha = self
            .sampler
            .sample(self.alpha, self.clusters.len(), self.n_points, &mut self.rng);
        self.alpha
    }

    /// Shuffle, assign every sample, build, update `α`, reset.
    pub fn density_from_samples(&mut self, samples: &[Vec<f64>]) -> Result<Draw> {
        self.ensure_open()?;
        for s in samples {
            self.bounds.check_dim(s.len())?;
        }
        for i in self.shuffled_order(samples.len()) {
            self.add_new_point(&samples[i])?;
        }
        let draw = self.build_mixture()?;
        let alpha = self.update_alpha();
        debug!(
            event = event_names::DRAW_COMPLETE,
            stage = %Stage::Fit,
            points = draw.n_points(),
            clusters = draw.n_clusters(),
            alpha,
            "draw complete"
        );
        self.initialise(None, None)?;
        Ok(draw)
    }

    /// Like [`Dpgmm::density_from_samples`], but builds a draw after every
    /// `every` points (and after the last one), tracing how the
    /// reconstruction evolves within a single pass.
    pub fn reconstruction_history(
        &mut self,
        samples: &[Vec<f64>],
        every: usize,
    ) -> Result<Vec<Draw>> {
        self.ensure_open()?;
        for s in samples {
            self.bounds.check_dim(s.len())?;
        }
        let every = every.max(1);
        let mut history = Vec::with_capacity(samples.len() / every + 1);
        for (step, i) in self.shuffled_order(samples.len()).into_iter().enumerate() {
            self.add_new_point(&samples[i])?;
            if (step + 1) % every == 0 {
                history.push(self.build_mixture()?);
            }
        }
        if samples.len() % every != 0 || samples.is_empty() {
            history.push(self.build_mixture()?);
        }
        self.update_alpha();
        debug!(
            event = event_names::HISTORY_COMPLETE,
            stage = %Stage::Fit,
            snapshots = history.len(),
            "reconstruction history complete"
        );
        self.initialise(None, None)?;
        Ok(history)
    }

    fn shuffled_order(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);
        order
    }

    fn ensure_open(&self) -> Result<()> {
        if self.sealed {
            return Err(MixtureError::UseAfterBuild);
        }
        Ok(())
    }
}
