//! A common interface over densities and Monte Carlo summaries built on it.
//!
//! [`Draw`]s of either kind implement [`Density`]; any other distribution can
//! be adapted with [`ExternalDensity`].

use crate::error::{MixtureError, Result};
use crate::mixture::Draw;
use rand::{Rng, RngCore};

/// Anything that can be evaluated and sampled in natural coordinates.
pub trait Density {
    fn dim(&self) -> usize;

    fn logpdf(&self, x: &[f64]) -> Result<f64>;

    fn pdf(&self, x: &[f64]) -> Result<f64> {
        Ok(self.logpdf(x)?.exp())
    }

    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Vec<Vec<f64>>;
}

impl Density for Draw {
    fn dim(&self) -> usize {
        Draw::dim(self)
    }

    fn logpdf(&self, x: &[f64]) -> Result<f64> {
        Draw::logpdf(self, x)
    }

    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        self.rvs(n, rng)
    }
}

type LogPdfFn = dyn Fn(&[f64]) -> f64;
type SampleFn = dyn Fn(&mut dyn RngCore) -> Vec<f64>;

/// Closure-backed adapter for densities defined elsewhere.
pub struct ExternalDensity {
    dim: usize,
    logpdf: Box<LogPdfFn>,
    sampler: Box<SampleFn>,
}

impl ExternalDensity {
    pub fn new<L, S>(dim: usize, logpdf: L, sampler: S) -> Self
    where
        L: Fn(&[f64]) -> f64 + 'static,
        S: Fn(&mut dyn RngCore) -> Vec<f64> + 'static,
    {
        Self {
            dim,
            logpdf: Box::new(logpdf),
            sampler: Box::new(sampler),
        }
    }
}

impl std::fmt::Debug for ExternalDensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalDensity")
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

impl Density for ExternalDensity {
    fn dim(&self) -> usize {
        self.dim
    }

    fn logpdf(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.dim {
            return Err(MixtureError::DimensionMismatch {
                expected: self.dim,
                actual: x.len(),
            });
        }
        Ok((self.logpdf)(x))
    }

    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        (0..n).map(|_| (self.sampler)(&mut *rng)).collect()
    }
}

/// `E[f(X)]` estimated from `n` samples of `density`.
pub fn monte_carlo_expectation<D, F>(
    density: &D,
    f: F,
    n: usize,
    rng: &mut dyn RngCore,
) -> Result<f64>
where
    D: Density + ?Sized,
    F: Fn(&[f64]) -> f64,
{
    if n == 0 {
        return Err(MixtureError::UnsupportedOperation(
            "Monte Carlo estimate needs at least one sample".to_string(),
        ));
    }
    let total: f64 = density.sample(n, rng).iter().map(|x| f(x.as_slice())).sum();
    Ok(total / n as f64)
}

/// Differential entropy `−E[log p(X)]` in nats.
///
/// Samples that evaluate to `−∞` (on the boundary after rounding) are skipped.
pub fn monte_carlo_entropy<D>(density: &D, n: usize, rng: &mut dyn RngCore) -> Result<f64>
where
    D: Density + ?Sized,
{
    if n == 0 {
        return Err(MixtureError::UnsupportedOperation(
            "Monte Carlo estimate needs at least one sample".to_string(),
        ));
    }
    let mut sum = 0.0;
    let mut used = 0usize;
    for x in density.sample(n, rng) {
        let lp = density.logpdf(&x)?;
        if lp.is_finite() {
            sum += lp;
            used += 1;
        }
    }
    if used == 0 {
        return Err(MixtureError::UnsupportedOperation(
            "no sample had a finite log density".to_string(),
        ));
    }
    Ok(-sum / used as f64)
}

/// Posterior-predictive samples: each one from a uniformly chosen draw.
pub fn sample_from_draws(draws: &[Draw], n: usize, rng: &mut dyn RngCore) -> Result<Vec<Vec<f64>>> {
    if draws.is_empty() {
        return Err(MixtureError::InvalidDraw("no draws to sample from".to_string()));
    }
    Ok((0..n)
        .map(|_| {
            let d = &draws[rng.random_range(0..draws.len())];
            d.sample_one(rng)
        })
        .collect())
}

/// Pointwise median of the draws' densities at `x`.
pub fn median_pdf(draws: &[Draw], x: &[f64]) -> Result<f64> {
    percentile_pdf(draws, x, 50.0)
}

/// Pointwise `q`-th percentile (`0 ≤ q ≤ 100`) of the draws' densities at
/// `x`, linearly interpolated between order statistics.
pub fn percentile_pdf(draws: &[Draw], x: &[f64], q: f64) -> Result<f64> {
    if draws.is_empty() {
        return Err(MixtureError::InvalidDraw("no draws to summarise".to_string()));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(MixtureError::UnsupportedOperation(format!(
            "percentile {} is outside [0, 100]",
            q
        )));
    }
    let mut values = draws.iter().map(|d| d.pdf(x)).collect::<Result<Vec<_>>>()?;
    values.sort_by(|a, b| a.total_cmp(b));
    let pos = q / 100.0 * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Ok(values[lo] + (values[hi] - values[lo]) * frac)
}
