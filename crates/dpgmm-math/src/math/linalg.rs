//! Symmetric positive-definite helpers on top of `nalgebra`.
//!
//! Every covariance-like matrix in the mixture engine goes through
//! [`SpdFactor`] once; log-determinants, Mahalanobis distances and
//! correlated draws all reuse the same Cholesky factor.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use thiserror::Error;

/// Linear-algebra failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinalgError {
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("matrix has non-finite entries")]
    NonFinite,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Cholesky factor `A = L Lᵀ` of a symmetric positive-definite matrix.
#[derive(Debug, Clone)]
pub struct SpdFactor {
    chol: Cholesky<f64, Dyn>,
    log_det: f64,
}

impl SpdFactor {
    /// Factor `matrix`, symmetrising it first to absorb rounding asymmetry.
    pub fn new(matrix: &DMatrix<f64>) -> Result<Self, LinalgError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(LinalgError::NotSquare {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            });
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }
        let chol = symmetrize(matrix)
            .cholesky()
            .ok_or(LinalgError::NotPositiveDefinite)?;
        let log_det = 2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>();
        if !log_det.is_finite() {
            return Err(LinalgError::NotPositiveDefinite);
        }
        Ok(Self { chol, log_det })
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.chol.l_dirty().nrows()
    }

    /// `log |A|`.
    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    /// Lower-triangular factor `L`.
    pub fn lower(&self) -> DMatrix<f64> {
        self.chol.l()
    }

    /// `A⁻¹`.
    pub fn inverse(&self) -> DMatrix<f64> {
        self.chol.inverse()
    }

    /// Squared Mahalanobis norm `dᵀ A⁻¹ d`.
    pub fn mahalanobis_sq(&self, dev: &DVector<f64>) -> f64 {
        // Solve L z = d, then |z|² = dᵀ A⁻¹ d.
        match self.chol.l_dirty().solve_lower_triangular(dev) {
            Some(z) => z.norm_squared(),
            None => f64::NAN,
        }
    }

    /// `A⁻¹ b`.
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        self.chol.solve(b)
    }

    /// Map a standard-normal vector `z` to `L z`.
    pub fn correlate(&self, z: &DVector<f64>) -> DVector<f64> {
        self.chol.l() * z
    }
}

/// `(A + Aᵀ) / 2`.
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    (matrix + matrix.transpose()) * 0.5
}

/// Build a square matrix from row vectors.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, LinalgError> {
    let n = rows.len();
    for row in rows {
        if row.len() != n {
            return Err(LinalgError::NotSquare {
                rows: n,
                cols: row.len(),
            });
        }
    }
    Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
}

/// Row vectors of a matrix.
pub fn matrix_to_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Sample mean of a set of equal-length points.
pub fn sample_mean(points: &[DVector<f64>]) -> Option<DVector<f64>> {
    let first = points.first()?;
    let mut mean = DVector::zeros(first.len());
    for p in points {
        mean += p;
    }
    Some(mean / points.len() as f64)
}

/// Unbiased sample covariance (denominator `n − 1`).
pub fn sample_covariance(points: &[DVector<f64>]) -> Option<DMatrix<f64>> {
    if points.len() < 2 {
        return None;
    }
    let mean = sample_mean(points)?;
    let dim = mean.len();
    let mut cov = DMatrix::zeros(dim, dim);
    for p in points {
        let dev = p - &mean;
        cov += &dev * dev.transpose();
    }
    Some(cov / (points.len() as f64 - 1.0))
}
