//! Numerically stable primitives for log-domain mixture math.

use std::f64::consts::PI;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // These are published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (*v - max).exp()).sum();
    max + sum.ln()
}

/// Stable log(mean(exp(values))).
///
/// This is the Monte Carlo estimator of a log-expectation from log-samples.
pub fn log_mean_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    log_sum_exp(values) - (values.len() as f64).ln()
}

/// Stable log(sum(w_i * exp(values_i))) for non-negative weights `w`.
///
/// Zero weights drop their term entirely, even when the paired value is
/// infinite. Mismatched lengths yield NaN.
pub fn log_sum_exp_weighted(values: &[f64], weights: &[f64]) -> f64 {
    if values.len() != weights.len() {
        return f64::NAN;
    }
    let mut terms = Vec::with_capacity(values.len());
    for (&v, &w) in values.iter().zip(weights) {
        if w.is_nan() || w < 0.0 {
            return f64::NAN;
        }
        if w > 0.0 {
            terms.push(v + w.ln());
        }
    }
    log_sum_exp(&terms)
}

/// Turn unnormalised log-weights into probabilities that sum to one.
///
/// NaN and +inf scores are treated as impossible outcomes (probability 0).
/// Returns `None` when no outcome has a finite score.
pub fn normalize_log_weights(log_weights: &[f64]) -> Option<Vec<f64>> {
    let cleaned: Vec<f64> = log_weights
        .iter()
        .map(|&v| if v.is_finite() { v } else { f64::NEG_INFINITY })
        .collect();
    let norm = log_sum_exp(&cleaned);
    if !norm.is_finite() {
        return None;
    }
    Some(cleaned.iter().map(|v| (v - norm).exp()).collect())
}

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Uses a Lanczos approximation with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z <= 0.0 {
        let z_round = z.round();
        if (z - z_round).abs() < 1e-15 {
            return f64::NAN;
        }
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}
