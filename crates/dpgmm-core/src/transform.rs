//! Probit coordinate change between a bounded box and `ℝᴰ`.
//!
//! Each dimension maps independently:
//!
//! ```text
//! y = Φ⁻¹((x − min) / (max − min))        x = min + (max − min)·Φ(y)
//! ```
//!
//! Points exactly on a bound map to `±∞`; points outside the box map to NaN.
//! Neither case is an error here: callers that care must check
//! [`Bounds::contains`] first.

use crate::error::{MixtureError, Result};
use dpgmm_math::{std_normal_cdf, std_normal_log_pdf, std_normal_quantile};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Ordered `(min, max)` pairs, one per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
    log_widths: f64,
}

impl Bounds {
    /// Validate and build bounds from `[min, max]` pairs.
    pub fn new(pairs: &[[f64; 2]]) -> Result<Self> {
        if pairs.is_empty() {
            return Err(MixtureError::InvalidBounds(
                "at least one dimension is required".to_string(),
            ));
        }
        for (i, [lo, hi]) in pairs.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(MixtureError::InvalidBounds(format!(
                    "dimension {} has non-finite bounds [{}, {}]",
                    i, lo, hi
                )));
            }
            if lo >= hi {
                return Err(MixtureError::InvalidBounds(format!(
                    "dimension {} is not increasing: [{}, {}]",
                    i, lo, hi
                )));
            }
        }
        let lower: Vec<f64> = pairs.iter().map(|p| p[0]).collect();
        let upper: Vec<f64> = pairs.iter().map(|p| p[1]).collect();
        let log_widths = lower.iter().zip(&upper).map(|(l, u)| (u - l).ln()).sum();
        Ok(Self {
            lower,
            upper,
            log_widths,
        })
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn pairs(&self) -> Vec<[f64; 2]> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&l, &u)| [l, u])
            .collect()
    }

    /// Centre of the box.
    pub fn centre(&self) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(l, u)| 0.5 * (l + u))
            .collect()
    }

    /// Whether `x` lies strictly inside the box.
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (l, u))| l < v && v < u)
    }

    /// Keep only the listed dimensions, in the given order.
    pub fn restrict(&self, axes: &[usize]) -> Result<Self> {
        let mut pairs = Vec::with_capacity(axes.len());
        for (i, &axis) in axes.iter().enumerate() {
            if axes[..i].contains(&axis) {
                return Err(MixtureError::InvalidBounds(format!(
                    "axis {} listed twice",
                    axis
                )));
            }
            if axis >= self.dim() {
                return Err(MixtureError::InvalidBounds(format!(
                    "axis {} out of range for {}-dimensional bounds",
                    axis,
                    self.dim()
                )));
            }
            pairs.push([self.lower[axis], self.upper[axis]]);
        }
        Self::new(&pairs)
    }

    pub(crate) fn check_dim(&self, actual: usize) -> Result<()> {
        if actual != self.dim() {
            return Err(MixtureError::DimensionMismatch {
                expected: self.dim(),
                actual,
            });
        }
        Ok(())
    }

    /// Natural → probit. Out-of-box coordinates become NaN.
    ///
    /// Extra coordinates beyond `dim()` are ignored.
    pub fn to_probit(&self, x: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            x.len().min(self.dim()),
            x.iter()
                .zip(self.lower.iter().zip(&self.upper))
                .map(|(v, (l, u))| std_normal_quantile((v - l) / (u - l))),
        )
    }

    /// Probit → natural. `±∞` land exactly on the bounds.
    pub fn from_probit(&self, y: &DVector<f64>) -> Vec<f64> {
        y.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&l, &u))| {
                let p = std_normal_cdf(v);
                if p <= 0.0 {
                    l
                } else if p >= 1.0 {
                    u
                } else {
                    (l + (u - l) * p).clamp(l, u)
                }
            })
            .collect()
    }

    /// `log |dx/dy|` at the probit point `y`.
    ///
    /// A density in natural space is the probit-space density minus this
    /// term (in logs).
    pub fn log_jacobian(&self, y: &DVector<f64>) -> f64 {
        y.iter().map(|&v| std_normal_log_pdf(v)).sum::<f64>() + self.log_widths
    }
}

impl TryFrom<Vec<[f64; 2]>> for Bounds {
    type Error = MixtureError;

    fn try_from(pairs: Vec<[f64; 2]>) -> Result<Self> {
        Bounds::new(&pairs)
    }
}

impl From<Bounds> for Vec<[f64; 2]> {
    fn from(bounds: Bounds) -> Self {
        bounds.pairs()
    }
}
