//! Multivariate Gaussian kernels.

use super::linalg::SpdFactor;
use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

const LOG_2PI: f64 = 1.837_877_066_409_345_5;

/// `log N(x | mean, Σ)` with `Σ` given by its Cholesky factor.
pub fn mvn_log_pdf(x: &DVector<f64>, mean: &DVector<f64>, cov: &SpdFactor) -> f64 {
    let dim = mean.len() as f64;
    let maha = cov.mahalanobis_sq(&(x - mean));
    -0.5 * (dim * LOG_2PI + cov.log_det() + maha)
}

/// Draw one point from `N(mean, Σ)`.
pub fn mvn_sample<R: Rng + ?Sized>(mean: &DVector<f64>, cov: &SpdFactor, rng: &mut R) -> DVector<f64> {
    let z = standard_normal_vector(mean.len(), rng);
    mean + cov.correlate(&z)
}

/// Vector of independent standard-normal draws.
pub fn standard_normal_vector<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> DVector<f64> {
    DVector::from_fn(dim, |_, _| StandardNormal.sample(rng))
}

/// `log N(x | mean, var)` for scalars.
pub fn normal_log_pdf(x: f64, mean: f64, var: f64) -> f64 {
    if var <= 0.0 || var.is_nan() {
        return f64::NAN;
    }
    let d = x - mean;
    -0.5 * (LOG_2PI + var.ln() + d * d / var)
}
