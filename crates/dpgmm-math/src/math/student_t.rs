//! Multivariate Student-t log density.
//!
//! The posterior predictive of the Normal-Inverse-Wishart / Gaussian model is
//! a multivariate Student-t:
//!
//! ```text
//! log t(x | ν, μ, Σ) = lnΓ((ν+D)/2) − lnΓ(ν/2) − (D/2)·ln(νπ) − ½·ln|Σ|
//!                      − ((ν+D)/2)·ln(1 + (x−μ)ᵀ Σ⁻¹ (x−μ) / ν)
//! ```

use super::linalg::SpdFactor;
use super::stable::log_gamma;
use nalgebra::DVector;
use std::f64::consts::PI;

/// Log density of a multivariate Student-t with `df` degrees of freedom,
/// location `loc` and scale matrix given by `scale`.
///
/// Returns NaN when `df <= 0`; a non-finite `x` yields `−∞` or NaN.
pub fn mvt_log_pdf(x: &DVector<f64>, df: f64, loc: &DVector<f64>, scale: &SpdFactor) -> f64 {
    if df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    let dim = loc.len() as f64;
    let maha = scale.mahalanobis_sq(&(x - loc));
    let half = 0.5 * (df + dim);
    log_gamma(half) - log_gamma(0.5 * df) - 0.5 * dim * (df * PI).ln() - 0.5 * scale.log_det()
        - half * (maha / df).ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::mvn_log_pdf;
    use nalgebra::DMatrix;

    #[test]
    fn cauchy_special_case() {
        // ν = 1, D = 1: standard Cauchy, log p(0) = −ln π
        let scale = SpdFactor::new(&DMatrix::identity(1, 1)).unwrap();
        let zero = DVector::zeros(1);
        let lp = mvt_log_pdf(&zero, 1.0, &zero, &scale);
        assert!((lp + PI.ln()).abs() < 1e-10);
    }

    #[test]
    fn one_dimensional_matches_closed_form() {
        let df = 4.0;
        let s2 = 2.0;
        let scale = SpdFactor::new(&DMatrix::from_element(1, 1, s2)).unwrap();
        let x = DVector::from_vec(vec![1.3]);
        let loc = DVector::from_vec(vec![0.4]);
        let t = (1.3 - 0.4) / s2.sqrt();
        let expected = log_gamma(2.5) - log_gamma(2.0) - 0.5 * (df * PI).ln() - 0.5 * s2.ln()
            - 2.5 * (1.0 + t * t / df).ln();
        assert!((mvt_log_pdf(&x, df, &loc, &scale) - expected).abs() < 1e-12);
    }

    #[test]
    fn large_df_approaches_gaussian() {
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.2, 0.2, 0.5]);
        let scale = SpdFactor::new(&cov).unwrap();
        let x = DVector::from_vec(vec![0.5, -0.3]);
        let loc = DVector::zeros(2);
        let t = mvt_log_pdf(&x, 1.0e7, &loc, &scale);
        let g = mvn_log_pdf(&x, &loc, &scale);
        assert!((t - g).abs() < 1e-5);
    }

    #[test]
    fn infinite_input_has_zero_density() {
        let scale = SpdFactor::new(&DMatrix::identity(1, 1)).unwrap();
        let x = DVector::from_vec(vec![f64::INFINITY]);
        let lp = mvt_log_pdf(&x, 3.0, &DVector::zeros(1), &scale);
        assert_eq!(lp, f64::NEG_INFINITY);
    }

    #[test]
    fn non_positive_df_is_nan() {
        let scale = SpdFactor::new(&DMatrix::identity(1, 1)).unwrap();
        let zero = DVector::zeros(1);
        assert!(mvt_log_pdf(&zero, 0.0, &zero, &scale).is_nan());
    }
}
