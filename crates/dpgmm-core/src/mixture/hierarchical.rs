//! Hierarchical DPGMM: a mixture over population-level Gaussians fitted to
//! per-event density estimates.
//!
//! Each observation is an *event*: a set of candidate [`Draw`]s from a
//! lower-level fit. Cluster parameters `(μ, Σ)` are integrated by Monte Carlo
//! over a fixed bank of draws from the NIW prior. For a bank entry `j` the
//! event likelihood is
//!
//! ```text
//! L_x[j] = mean_d Σ_c w_dc N(m_dc; μ_j, Σ_j + C_dc)
//! ```
//!
//! and a cluster keeps `log L_D[j]`, the sum of `log L_x[j]` over its events.
//! Assignment scores:
//!
//! ```text
//! existing k:  lme(L_D + L_x) − lme(L_D) + log n_k
//! new:         lme(L_x) + log α
//! ```
//!
//! where `lme` is log-mean-exp over the bank.

use super::concentration::ConcentrationSampler;
use super::draw::{Component, Draw, DrawKind};
use super::choose_cluster;
use super::dpgmm::DEFAULT_ALPHA0;
use crate::error::{MixtureError, Result};
use crate::logging::{event_names, Stage};
use crate::prior::{NiwPrior, PriorBuilder};
use crate::transform::Bounds;
use dpgmm_config::SessionConfig;
use dpgmm_math::gaussian::mvn_log_pdf;
use dpgmm_math::wishart::sample_niw;
use dpgmm_math::{log_mean_exp, log_sum_exp, normalize_log_weights, SpdFactor};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

/// Default size of the Monte Carlo bank.
pub const DEFAULT_MC_DRAWS: usize = 2000;

#[derive(Debug, Clone)]
struct HierCluster {
    n: usize,
    log_l_d: Vec<f64>,
}

/// A hierarchical estimation session.
#[derive(Debug)]
pub struct Hdpgmm {
    bounds: Bounds,
    prior: NiwPrior,
    alpha: f64,
    sampler: ConcentrationSampler,
    mc_draws: usize,
    bank: Vec<(DVector<f64>, DMatrix<f64>)>,
    clusters: Vec<HierCluster>,
    n_events: usize,
    sealed: bool,
    rng: StdRng,
}

impl Hdpgmm {
    pub fn new(
        bounds: Bounds,
        prior: Option<NiwPrior>,
        alpha0: Option<f64>,
        mc_draws: Option<usize>,
    ) -> Result<Self> {
        Self::with_rng(bounds, prior, alpha0, mc_draws, StdRng::from_os_rng())
    }

    /// Validate, then fill the bank once from `rng`.
    fn with_rng(
        bounds: Bounds,
        prior: Option<NiwPrior>,
        alpha0: Option<f64>,
        mc_draws: Option<usize>,
        rng: StdRng,
    ) -> Result<Self> {
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
        let mc_draws = mc_draws.unwrap_or(DEFAULT_MC_DRAWS);
        if mc_draws == 0 {
            return Err(MixtureError::InvalidPrior(
                "at least one Monte Carlo draw is required".to_string(),
            ));
        }
        let mut session = Self {
            bounds,
            prior,
            alpha,
            sampler: ConcentrationSampler::default(),
            mc_draws,
            bank: Vec::new(),
            clusters: Vec::new(),
            n_events: 0,
            sealed: false,
            rng,
        };
        session.refresh_bank()?;
        Ok(session)
    }

    pub fn from_session(bounds: Bounds, config: &SessionConfig) -> Result<Self> {
        let mut rng = match config.sampler.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let prior = PriorBuilder::from_section(&config.prior, bounds.dim()).build(&bounds, &mut rng)?;
        Ok(Self::with_rng(
            bounds,
            Some(prior),
            Some(config.sampler.alpha0),
            Some(config.hierarchical.mc_draws),
            rng,
        )?
        .with_sampler(ConcentrationSampler::from_section(&config.sampler)))
    }

    /// Reseed and regenerate the Monte Carlo bank.
    pub fn with_seed(mut self, seed: u64) -> Result<Self> {
        self.rng = StdRng::seed_from_u64(seed);
        self.refresh_bank()?;
        Ok(self)
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

    pub fn mc_draws(&self) -> usize {
        self.mc_draws
    }

    pub fn n_events(&self) -> usize {
        self.n_events
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(|c| c.n).collect()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    fn refresh_bank(&mut self) -> Result<()> {
        let mut bank = Vec::with_capacity(self.mc_draws);
        for _ in 0..self.mc_draws {
            bank.push(sample_niw(
                self.prior.k(),
                self.prior.mean(),
                self.prior.df(),
                self.prior.scale(),
                &mut self.rng,
            )?);
        }
        self.bank = bank;
        Ok(())
    }

    /// Drop all clusters and redraw the Monte Carlo bank. `α` is kept.
    pub fn initialise(&mut self, bounds: Option<Bounds>, prior: Option<NiwPrior>) -> Result<()> {
        let bounds = bounds.unwrap_or_else(|| self.bounds.clone());
        let prior = match prior {
            Some(p) => p,
            None if self.prior.dim() == bounds.dim() => self.prior.clone(),
            None => NiwPrior::default_for(bounds.dim())?,
        };
        bounds.check_dim(prior.dim())?;
        self.bounds = bounds;
        self.prior = prior;
        self.clusters.clear();
        self.n_events = 0;
        self.sealed = false;
        self.refresh_bank()
    }

    /// `log L_x[j]` for every bank entry, averaged over the event's draws.
    fn event_log_likelihood(&self, event: &[Draw]) -> Result<Vec<f64>> {
        if event.is_empty() {
            return Err(MixtureError::EmptyEvent);
        }
        for draw in event {
            if draw.bounds() != &self.bounds {
                return Err(MixtureError::BoundsMismatch {
                    expected: self.bounds.pairs(),
                    found: draw.bounds().pairs(),
                });
            }
        }
        let mut out = Vec::with_capacity(self.bank.len());
        let mut per_draw = Vec::with_capacity(event.len());
        for (mu, sigma) in &self.bank {
            per_draw.clear();
            for draw in event {
                let terms: Vec<f64> = draw
                    .components()
                    .iter()
                    .map(|c| {
                        let total = sigma + c.cov();
                        match SpdFactor::new(&total) {
                            Ok(f) => c.weight().ln() + mvn_log_pdf(c.mean(), mu, &f),
                            Err(_) => f64::NEG_INFINITY,
                        }
                    })
                    .collect();
                per_draw.push(log_sum_exp(&terms));
            }
            out.push(log_mean_exp(&per_draw));
        }
        Ok(out)
    }

    /// Assign one event (a set of candidate draws of the same bounds).
    pub fn add_new_event(&mut self, event: &[Draw]) -> Result<()> {
        self.ensure_open()?;
        let log_l_x = self.event_log_likelihood(event)?;
        let mut scores: Vec<f64> = self
            .clusters
            .iter()
            .map(|c| {
                let joint: Vec<f64> = c.log_l_d.iter().zip(&log_l_x).map(|(d, x)| d + x).collect();
                log_mean_exp(&joint) - log_mean_exp(&c.log_l_d) + (c.n as f64).ln()
            })
            .collect();
        scores.push(log_mean_exp(&log_l_x) + self.alpha.ln());
        match choose_cluster(&scores, &mut self.rng) {
            Some(k) => {
                let cluster = &mut self.clusters[k];
                for (d, x) in cluster.log_l_d.iter_mut().zip(&log_l_x) {
                    *d += x;
                }
                cluster.n += 1;
                trace!(
                    event = event_names::EVENT_ASSIGNED,
                    cluster = k,
                    size = cluster.n,
                    "event joined cluster"
                );
            }
            None => {
                self.clusters.push(HierCluster {
                    n: 1,
                    log_l_d: log_l_x,
                });
                trace!(
                    event = event_names::EVENT_ASSIGNED,
                    cluster = self.clusters.len() - 1,
                    "event opened cluster"
                );
            }
        }
        self.n_events += 1;
        Ok(())
    }

    /// Population-level mixture. Each cluster's parameters are the bank
    /// average weighted by its accumulated likelihood.
    pub fn build_mixture(&self) -> Result<Draw> {
        self.ensure_open()?;
        let dim = self.bounds.dim();
        let components = if self.clusters.is_empty() {
            vec![Component::new(
                1.0,
                self.prior.mean().clone(),
                self.prior.expected_cov().clone(),
            )?]
        } else {
            let mut comps = Vec::with_capacity(self.clusters.len());
            for (k, c) in self.clusters.iter().enumerate() {
                let (mean, cov) = match normalize_log_weights(&c.log_l_d) {
                    Some(p) => {
                        let mut mean = DVector::zeros(dim);
                        let mut cov = DMatrix::zeros(dim, dim);
                        for (w, (mu, sigma)) in p.iter().zip(&self.bank) {
                            mean += mu * *w;
                            cov += sigma * *w;
                        }
                        (mean, cov)
                    }
                    None => {
                        warn!(
                            event = event_names::CLUSTER_FALLBACK_PRIOR,
                            stage = %Stage::Hierarchical,
                            cluster = k,
                            "cluster likelihood vanished on every Monte Carlo draw; using the prior"
                        );
                        (self.prior.mean().clone(), self.prior.expected_cov().clone())
                    }
                };
                comps.push(Component::new(c.n as f64, mean, cov)?);
            }
            comps
        };
        Draw::from_components(
            components,
            self.bounds.clone(),
            DrawKind::Hierarchical,
            self.n_events,
            self.alpha,
        )
    }

    pub fn update_alpha(&mut self) -> f64 {
        self.alpha = self
            .sampler
            .sample(self.alpha, self.clusters.len(), self.n_events, &mut self.rng);
        self.alpha
    }

    /// Shuffle the events, assign each, build, update `α`, reset.
    pub fn density_from_events(&mut self, events: &[Vec<Draw>]) -> Result<Draw> {
        self.ensure_open()?;
        let mut order: Vec<usize> = (0..events.len()).collect();
        order.shuffle(&mut self.rng);
        for i in order {
            self.add_new_event(&events[i])?;
        }
        let draw = self.build_mixture()?;
        let alpha = self.update_alpha();
        debug!(
            event = event_names::HIER_DRAW_COMPLETE,
            stage = %Stage::Hierarchical,
            events = draw.n_points(),
            clusters = draw.n_clusters(),
            alpha,
            "hierarchical draw complete"
        );
        self.initialise(None, None)?;
        Ok(draw)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.sealed {
            return Err(MixtureError::UseAfterBuild);
        }
        Ok(())
    }
}
