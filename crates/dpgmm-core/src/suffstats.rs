//! Per-cluster sufficient statistics and the conjugate NIW update.
//!
//! Statistics are maintained online (Welford form):
//!
//! ```text
//! m_i = m_{i-1} + (y_i − m_{i-1}) / i
//! S_i = S_{i-1} + (y_i − m_{i-1})(y_i − m_i)ᵀ
//! ```
//!
//! and combined with a [`NiwPrior`] on demand.

use crate::prior::NiwPrior;
use dpgmm_math::student_t::mvt_log_pdf;
use dpgmm_math::{LinalgError, SpdFactor};
use nalgebra::{DMatrix, DVector};

/// Running count, mean and scatter of the probit points in one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStats {
    n: usize,
    mean: DVector<f64>,
    scatter: DMatrix<f64>,
}

impl ClusterStats {
    /// A one-point cluster.
    pub fn seeded(y: &DVector<f64>) -> Self {
        let dim = y.len();
        Self {
            n: 1,
            mean: y.clone(),
            scatter: DMatrix::zeros(dim, dim),
        }
    }

    /// Absorb one more point.
    pub fn push(&mut self, y: &DVector<f64>) {
        self.n += 1;
        let before = y - &self.mean;
        self.mean += &before / self.n as f64;
        let after = y - &self.mean;
        self.scatter += &before * after.transpose();
    }

    /// Batch statistics over `points`, `None` when empty.
    pub fn from_points(points: &[DVector<f64>]) -> Option<Self> {
        let first = points.first()?;
        let dim = first.len();
        let mut mean = DVector::zeros(dim);
        for p in points {
            mean += p;
        }
        mean /= points.len() as f64;
        let mut scatter = DMatrix::zeros(dim, dim);
        for p in points {
            let dev = p - &mean;
            scatter += &dev * dev.transpose();
        }
        Some(Self {
            n: points.len(),
            mean,
            scatter,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn scatter(&self) -> &DMatrix<f64> {
        &self.scatter
    }

    /// Conjugate NIW posterior given `prior`.
    pub fn posterior(&self, prior: &NiwPrior) -> NiwPosterior {
        let n = self.n as f64;
        let k0 = prior.k();
        let k = k0 + n;
        let mean = (prior.mean() * k0 + &self.mean * n) / k;
        let dev = &self.mean - prior.mean();
        let scale = prior.scale() + &self.scatter + (&dev * dev.transpose()) * (k0 * n / k);
        NiwPosterior {
            k,
            mean,
            df: prior.df() + n,
            scale,
        }
    }
}

/// NIW parameters `(k_n, μ_n, ν_n, Λ_n)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NiwPosterior {
    pub k: f64,
    pub mean: DVector<f64>,
    pub df: f64,
    pub scale: DMatrix<f64>,
}

impl NiwPosterior {
    /// The prior itself, i.e. the posterior after zero points.
    pub fn from_prior(prior: &NiwPrior) -> Self {
        Self {
            k: prior.k(),
            mean: prior.mean().clone(),
            df: prior.df(),
            scale: prior.scale().clone(),
        }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Posterior-predictive Student-t:
    /// `df = ν − D + 1`, `scale = Λ (k + 1) / (k · df)`.
    pub fn predictive(&self) -> Result<StudentT, LinalgError> {
        let df = self.df - self.dim() as f64 + 1.0;
        let scale = &self.scale * ((self.k + 1.0) / (self.k * df));
        Ok(StudentT {
            df,
            loc: self.mean.clone(),
            scale: SpdFactor::new(&scale)?,
        })
    }

    /// `E[Σ] = Λ / (ν − D − 1)`.
    pub fn expected_cov(&self) -> DMatrix<f64> {
        &self.scale / (self.df - self.dim() as f64 - 1.0)
    }
}

/// A factored multivariate Student-t, reused across assignments.
#[derive(Debug, Clone)]
pub struct StudentT {
    df: f64,
    loc: DVector<f64>,
    scale: SpdFactor,
}

impl StudentT {
    pub fn df(&self) -> f64 {
        self.df
    }

    pub fn loc(&self) -> &DVector<f64> {
        &self.loc
    }

    pub fn log_pdf(&self, y: &DVector<f64>) -> f64 {
        mvt_log_pdf(y, self.df, &self.loc, &self.scale)
    }
}
