//! Standard normal distribution functions.
//!
//! These back the probit coordinate change: `Φ` maps the unbounded probit
//! space onto the unit interval and `Φ⁻¹` maps it back. Both are exact at
//! the endpoints (`Φ⁻¹(0) = −∞`, `Φ⁻¹(1) = +∞`).

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Below this point `log Φ(y)` switches to the asymptotic tail expansion.
const LOG_CDF_TAIL: f64 = -20.0;

/// Standard normal density `φ(y)`.
pub fn std_normal_pdf(y: f64) -> f64 {
    std_normal_log_pdf(y).exp()
}

/// Log of the standard normal density.
pub fn std_normal_log_pdf(y: f64) -> f64 {
    -0.5 * y * y - LOG_SQRT_2PI
}

/// Standard normal CDF `Φ(y)`.
///
/// `Φ(−∞) = 0` and `Φ(+∞) = 1` exactly; NaN propagates.
pub fn std_normal_cdf(y: f64) -> f64 {
    if y.is_nan() {
        return f64::NAN;
    }
    if y == f64::NEG_INFINITY {
        return 0.0;
    }
    if y == f64::INFINITY {
        return 1.0;
    }
    0.5 * erfc(-y / SQRT_2)
}

/// Log of the standard normal CDF, accurate deep into the lower tail.
pub fn std_normal_log_cdf(y: f64) -> f64 {
    if y.is_nan() {
        return f64::NAN;
    }
    if y == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if y < LOG_CDF_TAIL {
        // Φ(y) ≈ φ(y)/(-y) · (1 − 1/y² + 3/y⁴)
        let y2 = y * y;
        let series = 1.0 - 1.0 / y2 + 3.0 / (y2 * y2);
        return std_normal_log_pdf(y) - (-y).ln() + series.ln();
    }
    std_normal_cdf(y).ln()
}

/// Standard normal quantile `Φ⁻¹(p)`.
///
/// Returns `−∞` at `p = 0`, `+∞` at `p = 1` and NaN outside `[0, 1]`.
pub fn std_normal_quantile(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// CDF of `Normal(mean, sd)`.
pub fn normal_cdf(x: f64, mean: f64, sd: f64) -> f64 {
    if sd <= 0.0 || sd.is_nan() {
        return f64::NAN;
    }
    std_normal_cdf((x - mean) / sd)
}

/// Log CDF of `Normal(mean, sd)`.
pub fn normal_log_cdf(x: f64, mean: f64, sd: f64) -> f64 {
    if sd <= 0.0 || sd.is_nan() {
        return f64::NAN;
    }
    std_normal_log_cdf((x - mean) / sd)
}
