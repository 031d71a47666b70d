//! Normal-Inverse-Wishart prior in probit space.
//!
//! Priors are specified by their *expected* covariance `L` rather than the
//! inverse-Wishart scale: the stored scale is `Λ0 = L·(ν0 − D − 1)`, so that
//! `E[Σ] = L` under the prior.
//!
//! [`PriorBuilder`] derives the probit-space parameters from natural-space
//! knowledge (a mean, a spread, or the samples themselves).

use crate::error::{MixtureError, Result};
use crate::transform::Bounds;
use dpgmm_config::PriorSection;
use dpgmm_math::gaussian::mvn_sample;
use dpgmm_math::linalg::{matrix_from_rows, sample_covariance, sample_mean};
use dpgmm_math::SpdFactor;
use nalgebra::{DMatrix, DVector};
use rand::Rng;

/// Default mean-precision scaling `k0`.
pub const DEFAULT_K: f64 = 1e-2;

/// Default expected standard deviation per probit dimension.
pub const DEFAULT_PROBIT_STD: f64 = 0.2;

/// Natural-space draws used to turn an expected spread into a probit covariance.
const SPREAD_DRAWS: usize = 10_000;

/// Sample-derived spreads are shrunk by this factor (a third of the std).
const SAMPLE_COV_SHRINK: f64 = 9.0;

/// NIW hyperparameters `(k0, μ0, ν0, Λ0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NiwPrior {
    k: f64,
    mean: DVector<f64>,
    df: f64,
    scale: DMatrix<f64>,
    expected_cov: DMatrix<f64>,
}

impl NiwPrior {
    /// Build a prior from `(k0, L, ν0, μ0)`, where `L` is the expected covariance.
    ///
    /// Fails unless `k0 > 0`, `ν0 > D + 1`, `L` is `D×D` positive definite and
    /// `μ0` has `D` finite entries.
    pub fn new(k: f64, expected_cov: DMatrix<f64>, df: f64, mean: DVector<f64>) -> Result<Self> {
        let dim = mean.len();
        if dim == 0 {
            return Err(MixtureError::InvalidPrior("mean is empty".to_string()));
        }
        if !(k > 0.0 && k.is_finite()) {
            return Err(MixtureError::InvalidPrior(format!(
                "k must be positive, got {}",
                k
            )));
        }
        if !(df > dim as f64 + 1.0 && df.is_finite()) {
            return Err(MixtureError::InvalidPrior(format!(
                "df must exceed D + 1 = {}, got {}",
                dim + 1,
                df
            )));
        }
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(MixtureError::InvalidPrior(
                "mean has non-finite entries".to_string(),
            ));
        }
        if expected_cov.nrows() != dim || expected_cov.ncols() != dim {
            return Err(MixtureError::DimensionMismatch {
                expected: dim,
                actual: expected_cov.nrows(),
            });
        }
        SpdFactor::new(&expected_cov).map_err(|e| {
            MixtureError::InvalidPrior(format!("expected covariance: {}", e))
        })?;
        let scale = &expected_cov * (df - dim as f64 - 1.0);
        Ok(Self {
            k,
            mean,
            df,
            scale,
            expected_cov,
        })
    }

    /// `(1e-2, 0.2²·I, D + 2, 0)`.
    pub fn default_for(dim: usize) -> Result<Self> {
        Self::new(
            DEFAULT_K,
            DMatrix::identity(dim, dim) * DEFAULT_PROBIT_STD.powi(2),
            dim as f64 + 2.0,
            DVector::zeros(dim),
        )
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn df(&self) -> f64 {
        self.df
    }

    /// Inverse-Wishart scale `Λ0`.
    pub fn scale(&self) -> &DMatrix<f64> {
        &self.scale
    }

    /// Expected covariance `L = Λ0 / (ν0 − D − 1)`.
    pub fn expected_cov(&self) -> &DMatrix<f64> {
        &self.expected_cov
    }
}

/// Builds a probit-space [`NiwPrior`] from natural-space information.
///
/// Precedence for the mean: explicit mean, then the probit sample mean, then
/// the box centre. For the expected covariance: explicit covariance, then
/// explicit standard deviations, then a shrunk sample covariance, then
/// `0.2²·I`.
#[derive(Debug, Clone, Default)]
pub struct PriorBuilder<'a> {
    samples: Option<&'a [Vec<f64>]>,
    mean: Option<Vec<f64>>,
    std: Option<Vec<f64>>,
    cov: Option<Vec<Vec<f64>>>,
    df: Option<f64>,
    k: Option<f64>,
}

impl<'a> PriorBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the builder from a config `[prior]` section.
    pub fn from_section(section: &PriorSection, dim: usize) -> Self {
        Self {
            samples: None,
            mean: section.mean.clone(),
            std: section.std.as_ref().map(|s| s.expand(dim)),
            cov: section.cov.clone(),
            df: section.df,
            k: section.k,
        }
    }

    pub fn samples(mut self, samples: &'a [Vec<f64>]) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn mean(mut self, mean: Vec<f64>) -> Self {
        self.mean = Some(mean);
        self
    }

    pub fn std(mut self, std: Vec<f64>) -> Self {
        self.std = Some(std);
        self
    }

    pub fn cov(mut self, cov: Vec<Vec<f64>>) -> Self {
        self.cov = Some(cov);
        self
    }

    pub fn df(mut self, df: f64) -> Self {
        self.df = Some(df);
        self
    }

    pub fn k(mut self, k: f64) -> Self {
        self.k = Some(k);
        self
    }

    /// Resolve the probit-space prior for `bounds`.
    pub fn build<R: Rng + ?Sized>(&self, bounds: &Bounds, rng: &mut R) -> Result<NiwPrior> {
        let dim = bounds.dim();

        let df = match self.df {
            Some(df) if df > dim as f64 + 2.0 => df,
            _ => dim as f64 + 2.0,
        };

        let probit_samples = match self.samples {
            Some(samples) => {
                let mut out = Vec::with_capacity(samples.len());
                for s in samples {
                    bounds.check_dim(s.len())?;
                    out.push(bounds.to_probit(s));
                }
                Some(out)
            }
            None => None,
        };

        let mean = if let Some(mean) = &self.mean {
            bounds.check_dim(mean.len())?;
            if !bounds.contains(mean) {
                return Err(MixtureError::InvalidPrior(format!(
                    "mean {:?} is not strictly inside the bounds",
                    mean
                )));
            }
            bounds.to_probit(mean)
        } else if let Some(m) = probit_samples.as_deref().and_then(sample_mean) {
            m
        } else {
            DVector::zeros(dim)
        };

        let expected_cov = if let Some(cov) = &self.cov {
            let natural = matrix_from_rows(cov)
                .map_err(|e| MixtureError::InvalidPrior(format!("cov: {}", e)))?;
            if natural.nrows() != dim {
                return Err(MixtureError::DimensionMismatch {
                    expected: dim,
                    actual: natural.nrows(),
                });
            }
            probit_spread(bounds, &natural, rng)?
        } else if let Some(std) = &self.std {
            bounds.check_dim(std.len())?;
            if std.iter().any(|s| !(*s > 0.0)) {
                return Err(MixtureError::InvalidPrior(
                    "std entries must be positive".to_string(),
                ));
            }
            let natural = DMatrix::from_diagonal(&DVector::from_iterator(
                dim,
                std.iter().map(|s| s * s),
            ));
            probit_spread(bounds, &natural, rng)?
        } else if let Some(cov) = probit_samples.as_deref().and_then(sample_covariance) {
            shrink_sample_cov(cov)
        } else {
            DMatrix::identity(dim, dim) * DEFAULT_PROBIT_STD.powi(2)
        };

        NiwPrior::new(self.k.unwrap_or(DEFAULT_K), expected_cov, df, mean)
    }
}

/// Probit-space covariance of a natural-space Gaussian centred in the box,
/// estimated from the draws that land strictly inside it.
fn probit_spread<R: Rng + ?Sized>(
    bounds: &Bounds,
    natural_cov: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DMatrix<f64>> {
    let factor = SpdFactor::new(natural_cov)
        .map_err(|e| MixtureError::InvalidPrior(format!("natural covariance: {}", e)))?;
    let centre = DVector::from_vec(bounds.centre());
    let inside: Vec<DVector<f64>> = (0..SPREAD_DRAWS)
        .map(|_| mvn_sample(&centre, &factor, rng))
        .filter(|x| bounds.contains(x.as_slice()))
        .map(|x| bounds.to_probit(x.as_slice()))
        .collect();
    sample_covariance(&inside).ok_or_else(|| {
        MixtureError::InvalidPrior("too few draws fell inside the bounds".to_string())
    })
}

/// Divide by nine and cap each standard deviation at 0.2, keeping correlations.
fn shrink_sample_cov(cov: DMatrix<f64>) -> DMatrix<f64> {
    let shrunk = cov / SAMPLE_COV_SHRINK;
    let dim = shrunk.nrows();
    let diag: Vec<f64> = (0..dim).map(|i| shrunk[(i, i)].sqrt()).collect();
    let capped: Vec<f64> = diag.iter().map(|d| d.min(DEFAULT_PROBIT_STD)).collect();
    DMatrix::from_fn(dim, dim, |i, j| {
        if diag[i] > 0.0 && diag[j] > 0.0 {
            shrunk[(i, j)] * capped[i] * capped[j] / (diag[i] * diag[j])
        } else {
            shrunk[(i, j)]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn scale_is_expected_cov_times_excess_df() {
        let l = DMatrix::identity(2, 2) * 0.5;
        let p = NiwPrior::new(0.1, l.clone(), 6.0, DVector::zeros(2)).unwrap();
        assert_eq!(p.scale(), &(l * 3.0));
        assert_eq!(p.dim(), 2);
    }

    #[test]
    fn validation() {
        let l = DMatrix::identity(2, 2);
        let mu = DVector::zeros(2);
        assert!(matches!(
            NiwPrior::new(0.0, l.clone(), 5.0, mu.clone()),
            Err(MixtureError::InvalidPrior(_))
        ));
        assert!(matches!(
            NiwPrior::new(1.0, l.clone(), 3.0, mu.clone()),
            Err(MixtureError::InvalidPrior(_))
        ));
        assert!(NiwPrior::new(1.0, l.clone(), 3.5, mu.clone()).is_ok());
        assert!(NiwPrior::new(1.0, DMatrix::identity(3, 3), 6.0, mu.clone()).is_err());
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(NiwPrior::new(1.0, indefinite, 5.0, mu).is_err());
    }

    #[test]
    fn default_prior() {
        let p = NiwPrior::default_for(3).unwrap();
        assert_eq!(p.df(), 5.0);
        assert_eq!(p.k(), 1e-2);
        assert!((p.expected_cov()[(1, 1)] - 0.04).abs() < 1e-15);
        assert!((p.scale()[(1, 1)] - 0.04).abs() < 1e-15);
    }

    #[test]
    fn builder_defaults_match_default_prior() {
        let bounds = Bounds::new(&[[0.0, 1.0], [0.0, 1.0]]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let p = PriorBuilder::new().build(&bounds, &mut rng).unwrap();
        assert_eq!(p, NiwPrior::default_for(2).unwrap());
    }

    #[test]
    fn builder_df_floor_and_mean() {
        let bounds = Bounds::new(&[[10.0, 50.0]]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let p = PriorBuilder::new()
            .df(2.0)
            .mean(vec![30.0])
            .build(&bounds, &mut rng)
            .unwrap();
        assert_eq!(p.df(), 3.0);
        assert!(p.mean()[0].abs() < 1e-12);

        let err = PriorBuilder::new()
            .mean(vec![50.0])
            .build(&bounds, &mut rng)
            .unwrap_err();
        assert!(matches!(err, MixtureError::InvalidPrior(_)));
    }

    #[test]
    fn builder_from_samples_caps_std() {
        let bounds = Bounds::new(&[[0.0, 1.0]]).unwrap();
        let samples: Vec<Vec<f64>> = (1..100).map(|i| vec![i as f64 / 100.0]).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let p = PriorBuilder::new()
            .samples(&samples)
            .build(&bounds, &mut rng)
            .unwrap();
        // probit spread of a uniform sample is ~1, so /9 gives std ~0.33 → capped
        assert!((p.expected_cov()[(0, 0)] - 0.04).abs() < 1e-12);
        assert!(p.mean()[0].abs() < 1e-9);
    }

    #[test]
    fn builder_std_estimates_probit_spread() {
        let bounds = Bounds::new(&[[-10.0, 10.0]]).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let p = PriorBuilder::new()
            .std(vec![1.0])
            .build(&bounds, &mut rng)
            .unwrap();
        // y ≈ √(2π)·x/20 near the centre, so var(y) ≈ 2π/400
        let expected = 2.0 * std::f64::consts::PI / 400.0;
        let got = p.expected_cov()[(0, 0)];
        assert!((got - expected).abs() / expected < 0.05, "got {}", got);
    }
}
