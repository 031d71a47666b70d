//! Realised mixtures.
//!
//! A [`Draw`] is an immutable Gaussian mixture in probit space together with
//! the bounds that map it back to natural coordinates. Densities in natural
//! space carry the probit Jacobian:
//!
//! ```text
//! log p(x) = log Σ_c w_c N(y; μ_c, Σ_c) − log |dx/dy|,   y = probit(x)
//! ```

use super::sample_categorical;
use crate::error::{MixtureError, Result};
use crate::transform::Bounds;
use dpgmm_math::gaussian::{mvn_log_pdf, mvn_sample};
use dpgmm_math::linalg::{matrix_from_rows, matrix_to_rows};
use dpgmm_math::{
    log_sum_exp, log_sum_exp_weighted, normal_cdf, normal_log_cdf, normalize_log_weights,
    std_normal_pdf, SpdFactor,
};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tolerance on the sum of persisted weights.
const WEIGHT_SUM_TOL: f64 = 1e-6;

/// What a draw's components describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawKind {
    /// Mixture over points, from a flat fit.
    #[default]
    Single,
    /// Mixture over population-level parameters, from a hierarchical fit.
    Hierarchical,
}

impl std::fmt::Display for DrawKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawKind::Single => write!(f, "single"),
            DrawKind::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

/// One weighted Gaussian in probit space.
#[derive(Debug, Clone)]
pub struct Component {
    weight: f64,
    mean: DVector<f64>,
    cov: DMatrix<f64>,
    factor: SpdFactor,
}

impl Component {
    pub fn new(weight: f64, mean: DVector<f64>, cov: DMatrix<f64>) -> Result<Self> {
        if cov.nrows() != mean.len() {
            return Err(MixtureError::DimensionMismatch {
                expected: mean.len(),
                actual: cov.nrows(),
            });
        }
        let factor =
            SpdFactor::new(&cov).map_err(|e| MixtureError::NotPositiveDefinite(e.to_string()))?;
        Ok(Self {
            weight,
            mean,
            cov,
            factor,
        })
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    pub(crate) fn factor(&self) -> &SpdFactor {
        &self.factor
    }

    fn log_pdf(&self, y: &DVector<f64>) -> f64 {
        mvn_log_pdf(y, &self.mean, &self.factor)
    }

    fn restrict(&self, axes: &[usize]) -> Result<Self> {
        let mean = DVector::from_iterator(axes.len(), axes.iter().map(|&a| self.mean[a]));
        let cov = DMatrix::from_fn(axes.len(), axes.len(), |i, j| self.cov[(axes[i], axes[j])]);
        Self::new(self.weight, mean, cov)
    }
}

/// An immutable realisation of the posterior-predictive mixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "DrawRecord", try_from = "DrawRecord")]
pub struct Draw {
    components: Vec<Component>,
    bounds: Bounds,
    kind: DrawKind,
    n_points: usize,
    alpha: f64,
}

impl Draw {
    /// Assemble a draw, normalising the component weights.
    pub fn from_components(
        components: Vec<Component>,
        bounds: Bounds,
        kind: DrawKind,
        n_points: usize,
        alpha: f64,
    ) -> Result<Self> {
        if components.is_empty() {
            return Err(MixtureError::InvalidDraw("no components".to_string()));
        }
        for c in &components {
            bounds.check_dim(c.mean.len())?;
            if !(c.weight >= 0.0 && c.weight.is_finite()) {
                return Err(MixtureError::InvalidDraw(format!(
                    "component weight {} is not a finite non-negative number",
                    c.weight
                )));
            }
        }
        let total: f64 = components.iter().map(|c| c.weight).sum();
        if !(total > 0.0) {
            return Err(MixtureError::InvalidDraw(
                "component weights sum to zero".to_string(),
            ));
        }
        let components = components
            .into_iter()
            .map(|mut c| {
                c.weight /= total;
                c
            })
            .collect();
        Ok(Self {
            components,
            bounds,
            kind,
            n_points,
            alpha,
        })
    }

    pub fn dim(&self) -> usize {
        self.bounds.dim()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn kind(&self) -> DrawKind {
        self.kind
    }

    /// Points (or events) absorbed before the draw was built.
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn n_clusters(&self) -> usize {
        self.components.len()
    }

    /// Concentration at build time.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    /// Mixture log density at a probit point, without the Jacobian.
    pub fn logpdf_probit(&self, y: &DVector<f64>) -> f64 {
        let log_pdfs: Vec<f64> = self.components.iter().map(|c| c.log_pdf(y)).collect();
        log_sum_exp_weighted(&log_pdfs, &self.weights())
    }

    /// Gradient of [`Draw::logpdf_probit`]: `Σ_c r_c Σ_c⁻¹ (μ_c − y)` with
    /// responsibilities `r_c`.
    fn gradient_logpdf_probit(&self, y: &DVector<f64>) -> DVector<f64> {
        let scores: Vec<f64> = self
            .components
            .iter()
            .map(|c| c.weight.ln() + c.log_pdf(y))
            .collect();
        let Some(resp) = normalize_log_weights(&scores) else {
            return DVector::zeros(y.len());
        };
        self.components
            .iter()
            .zip(resp)
            .filter(|(_, r)| *r > 0.0)
            .fold(DVector::zeros(y.len()), |acc, (c, r)| {
                acc + c.factor().solve(&(&c.mean - y)) * r
            })
    }

    pub fn pdf_probit(&self, y: &DVector<f64>) -> f64 {
        self.logpdf_probit(y).exp()
    }

    /// Natural-space log density; `−∞` on or outside the bounds.
    pub fn logpdf(&self, x: &[f64]) -> Result<f64> {
        self.bounds.check_dim(x.len())?;
        if !self.bounds.contains(x) {
            return Ok(f64::NEG_INFINITY);
        }
        let y = self.bounds.to_probit(x);
        Ok(self.logpdf_probit(&y) - self.bounds.log_jacobian(&y))
    }

    pub fn pdf(&self, x: &[f64]) -> Result<f64> {
        Ok(self.logpdf(x)?.exp())
    }

    /// Natural-space gradient of the log density; zero on or outside the
    /// bounds.
    ///
    /// ```text
    /// ∂ log p / ∂x_i = (∂ log p_y / ∂y_i + y_i) · dy_i/dx_i
    /// dy_i/dx_i     = 1 / ((max_i − min_i) φ(y_i))
    /// ```
    pub fn gradient_logpdf(&self, x: &[f64]) -> Result<Vec<f64>> {
        self.bounds.check_dim(x.len())?;
        if !self.bounds.contains(x) {
            return Ok(vec![0.0; x.len()]);
        }
        let y = self.bounds.to_probit(x);
        let grad_y = self.gradient_logpdf_probit(&y);
        Ok(grad_y
            .iter()
            .zip(y.iter())
            .zip(self.bounds.lower().iter().zip(self.bounds.upper()))
            .map(|((g, &yi), (l, u))| (g + yi) / ((u - l) * std_normal_pdf(yi)))
            .collect())
    }

    /// Natural-space gradient of the density, `p(x) ∇ log p(x)`.
    pub fn gradient_pdf(&self, x: &[f64]) -> Result<Vec<f64>> {
        let p = self.pdf(x)?;
        let grad = self.gradient_logpdf(x)?;
        if p == 0.0 {
            return Ok(vec![0.0; x.len()]);
        }
        Ok(grad.into_iter().map(|g| p * g).collect())
    }

    /// Cumulative distribution of a one-dimensional draw.
    pub fn cdf(&self, x: f64) -> Result<f64> {
        let (lo, hi) = self.support_1d("cdf")?;
        if x <= lo {
            return Ok(0.0);
        }
        if x >= hi {
            return Ok(1.0);
        }
        let y = self.bounds.to_probit(&[x])[0];
        Ok(self
            .components
            .iter()
            .map(|c| c.weight * normal_cdf(y, c.mean[0], c.cov[(0, 0)].sqrt()))
            .sum::<f64>()
            .clamp(0.0, 1.0))
    }

    pub fn logcdf(&self, x: f64) -> Result<f64> {
        let (lo, hi) = self.support_1d("logcdf")?;
        if x <= lo {
            return Ok(f64::NEG_INFINITY);
        }
        if x >= hi {
            return Ok(0.0);
        }
        let y = self.bounds.to_probit(&[x])[0];
        let terms: Vec<f64> = self
            .components
            .iter()
            .map(|c| c.weight.ln() + normal_log_cdf(y, c.mean[0], c.cov[(0, 0)].sqrt()))
            .collect();
        Ok(log_sum_exp(&terms).min(0.0))
    }

    fn support_1d(&self, op: &str) -> Result<(f64, f64)> {
        if self.dim() != 1 {
            return Err(MixtureError::UnsupportedOperation(format!(
                "{} is only defined for one-dimensional draws (this one has {})",
                op,
                self.dim()
            )));
        }
        Ok((self.bounds.lower()[0], self.bounds.upper()[0]))
    }

    /// Draw a single natural-space point.
    pub fn sample_one<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let weights = self.weights();
        let c = &self.components[sample_categorical(&weights, rng)];
        let y = mvn_sample(&c.mean, &c.factor, rng);
        self.bounds.from_probit(&y)
    }

    /// `n` independent natural-space samples.
    pub fn rvs<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Vec<f64>> {
        (0..n).map(|_| self.sample_one(rng)).collect()
    }

    /// Marginal over the listed dimensions, in the given order.
    ///
    /// Exact: the probit map acts per dimension, so marginalising the
    /// Gaussian components marginalises the natural-space density.
    pub fn marginalise(&self, axes: &[usize]) -> Result<Draw> {
        let bounds = self.bounds.restrict(axes)?;
        let components = self
            .components
            .iter()
            .map(|c| c.restrict(axes))
            .collect::<Result<Vec<_>>>()?;
        Ok(Draw {
            components,
            bounds,
            kind: self.kind,
            n_points: self.n_points,
            alpha: self.alpha,
        })
    }
}

/// Persisted form of a [`Draw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    #[serde(default)]
    pub kind: DrawKind,
    pub bounds: Vec<[f64; 2]>,
    pub weights: Vec<f64>,
    pub means: Vec<Vec<f64>>,
    pub covs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    pub n_points: usize,
    #[serde(default)]
    pub n_clusters: usize,
    #[serde(default)]
    pub alpha: f64,
}

impl From<Draw> for DrawRecord {
    fn from(draw: Draw) -> Self {
        DrawRecord {
            kind: draw.kind,
            bounds: draw.bounds.pairs(),
            weights: draw.weights(),
            n_clusters: draw.n_clusters(),
            means: draw
                .components
                .iter()
                .map(|c| c.mean.iter().copied().collect())
                .collect(),
            covs: draw
                .components
                .iter()
                .map(|c| matrix_to_rows(&c.cov))
                .collect(),
            n_points: draw.n_points,
            alpha: draw.alpha,
        }
    }
}

impl TryFrom<DrawRecord> for Draw {
    type Error = MixtureError;

    fn try_from(record: DrawRecord) -> Result<Self> {
        let bounds = Bounds::new(&record.bounds)?;
        let k = record.weights.len();
        if record.means.len() != k || record.covs.len() != k {
            return Err(MixtureError::InvalidDraw(format!(
                "{} weights, {} means, {} covariances",
                k,
                record.means.len(),
                record.covs.len()
            )));
        }
        if record.n_clusters != 0 && record.n_clusters != k {
            return Err(MixtureError::InvalidDraw(format!(
                "n_clusters is {} but {} components are present",
                record.n_clusters, k
            )));
        }
        let sum: f64 = record.weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOL {
            return Err(MixtureError::InvalidDraw(format!(
                "weights sum to {}",
                sum
            )));
        }
        let mut components = Vec::with_capacity(k);
        for ((w, mean), cov) in record.weights.iter().zip(record.means).zip(&record.covs) {
            bounds.check_dim(mean.len())?;
            let cov = matrix_from_rows(cov).map_err(|e| MixtureError::InvalidDraw(e.to_string()))?;
            components.push(Component::new(*w, DVector::from_vec(mean), cov)?);
        }
        Draw::from_components(components, bounds, record.kind, record.n_points, record.alpha)
    }
}
