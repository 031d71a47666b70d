//! Inverse-Wishart and Normal-Inverse-Wishart samplers.
//!
//! Uses the Bartlett decomposition: if `Ψ⁻¹ = L Lᵀ` and `A` is lower
//! triangular with `A_ii = √χ²(ν − i)` and `A_ij ~ N(0, 1)` below the
//! diagonal, then `W = L A Aᵀ Lᵀ ~ Wishart(ν, Ψ⁻¹)` and `W⁻¹ ~ IW(ν, Ψ)`.

use super::gaussian::mvn_sample;
use super::linalg::{symmetrize, LinalgError, SpdFactor};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{ChiSquared, Distribution, StandardNormal};

/// Draw `Σ ~ InverseWishart(df, scale)`.
///
/// Requires `df > D − 1` and a positive-definite `scale`. The mean of the
/// distribution is `scale / (df − D − 1)` when `df > D + 1`.
pub fn sample_inverse_wishart<R: Rng + ?Sized>(
    df: f64,
    scale: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DMatrix<f64>, LinalgError> {
    let dim = scale.nrows();
    let scale_factor = SpdFactor::new(scale)?;
    if !(df > dim as f64 - 1.0) {
        return Err(LinalgError::NotPositiveDefinite);
    }
    let precision = SpdFactor::new(&scale_factor.inverse())?;
    let l = precision.lower();

    let mut a = DMatrix::<f64>::zeros(dim, dim);
    for i in 0..dim {
        let chi = ChiSquared::new(df - i as f64).map_err(|_| LinalgError::NotPositiveDefinite)?;
        a[(i, i)] = chi.sample(rng).sqrt();
        for j in 0..i {
            a[(i, j)] = StandardNormal.sample(rng);
        }
    }
    let la = l * a;
    let wishart = &la * la.transpose();
    let sigma = SpdFactor::new(&wishart)?.inverse();
    Ok(symmetrize(&sigma))
}

/// Draw `(μ, Σ)` from `NIW(k, μ0, df, scale)`:
/// `Σ ~ IW(df, scale)`, `μ | Σ ~ N(μ0, Σ / k)`.
pub fn sample_niw<R: Rng + ?Sized>(
    k: f64,
    mu0: &DVector<f64>,
    df: f64,
    scale: &DMatrix<f64>,
    rng: &mut R,
) -> Result<(DVector<f64>, DMatrix<f64>), LinalgError> {
    if mu0.len() != scale.nrows() {
        return Err(LinalgError::DimensionMismatch {
            expected: scale.nrows(),
            actual: mu0.len(),
        });
    }
    let sigma = sample_inverse_wishart(df, scale, rng)?;
    let mean_cov = SpdFactor::new(&(&sigma / k))?;
    let mu = mvn_sample(mu0, &mean_cov, rng);
    Ok((mu, sigma))
}
