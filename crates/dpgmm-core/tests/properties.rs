//! Property-based tests for the estimator's building blocks.

use dpgmm_core::{Bounds, ClusterStats, ConcentrationSampler, Dpgmm, NiwPrior};
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn points_strategy() -> impl Strategy<Value = Vec<DVector<f64>>> {
    prop::collection::vec(
        prop::collection::vec(-10.0f64..10.0, 3).prop_map(DVector::from_vec),
        1..60,
    )
}

fn bounds_strategy() -> impl Strategy<Value = Vec<[f64; 2]>> {
    prop::collection::vec(
        (-1000.0f64..1000.0, 0.1f64..500.0).prop_map(|(lo, width)| [lo, lo + width]),
        1..5,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn online_statistics_match_batch(points in points_strategy()) {
        let mut online = ClusterStats::seeded(&points[0]);
        for p in &points[1..] {
            online.push(p);
        }
        let batch = ClusterStats::from_points(&points).unwrap();

        // Relative to the data scale, allowing one rounding step per point.
        let tol = 1e-13 * points.len() as f64;
        let scale = points.iter().map(|p| p.amax()).fold(1.0, f64::max);
        let scatter_scale = batch.scatter().amax().max(scale * scale);
        prop_assert_eq!(online.n(), points.len());
        prop_assert!((online.mean() - batch.mean()).amax() <= tol * scale);
        prop_assert!((online.scatter() - batch.scatter()).amax() <= tol * scatter_scale);
    }

    #[test]
    fn posterior_is_a_valid_niw(points in points_strategy()) {
        let prior = NiwPrior::default_for(3).unwrap();
        let stats = ClusterStats::from_points(&points).unwrap();
        let post = stats.posterior(&prior);
        let n = points.len() as f64;

        prop_assert!((post.k - (prior.k() + n)).abs() < 1e-12);
        prop_assert!((post.df - (prior.df() + n)).abs() < 1e-12);
        prop_assert!(post.predictive().is_ok());
        let scale_sym = &post.scale - post.scale.transpose();
        prop_assert!(scale_sym.amax() < 1e-9);
    }

    #[test]
    fn probit_round_trip(
        pairs in bounds_strategy(),
        fractions in prop::collection::vec(0.001f64..0.999, 5),
    ) {
        let bounds = Bounds::new(&pairs).unwrap();
        let x: Vec<f64> = pairs
            .iter()
            .zip(&fractions)
            .map(|([lo, hi], u)| lo + (hi - lo) * u)
            .collect();
        let y = bounds.to_probit(&x);
        prop_assert!(y.iter().all(|v| v.is_finite()));
        let back = bounds.from_probit(&y);
        for ((a, b), [lo, hi]) in x.iter().zip(&back).zip(&pairs) {
            prop_assert!((a - b).abs() <= 1e-9 * (hi - lo), "{} vs {}", a, b);
        }
    }

    #[test]
    fn draw_weights_are_normalised(
        xs in prop::collection::vec(0.01f64..0.99, 1..80),
        seed in any::<u64>(),
    ) {
        let bounds = Bounds::new(&[[0.0, 1.0]]).unwrap();
        let samples: Vec<Vec<f64>> = xs.iter().map(|&x| vec![x]).collect();
        let mut session = Dpgmm::new(bounds, None, None).unwrap().with_seed(seed);
        let draw = session.density_from_samples(&samples).unwrap();

        let total: f64 = draw.weights().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        prop_assert!(draw.weights().iter().all(|w| *w > 0.0));
        prop_assert!(draw.n_clusters() <= samples.len());
        prop_assert!(draw.alpha() > 0.0);
    }

    #[test]
    fn concentration_target_is_finite_for_positive_alpha(
        alpha in 1e-3f64..100.0,
        k in 1usize..50,
        extra in 0usize..500,
    ) {
        let lp = ConcentrationSampler::log_target(alpha, k, k + extra);
        prop_assert!(lp.is_finite());
        prop_assert_eq!(ConcentrationSampler::log_target(-alpha, k, k + extra), f64::NEG_INFINITY);
    }
}

/// Normalised full conditional of `α` on a fine grid.
fn alpha_grid(k: usize, n: usize) -> (Vec<f64>, Vec<f64>) {
    let grid: Vec<f64> = (1..200_000).map(|i| i as f64 * 1e-4).collect();
    let lps: Vec<f64> = grid
        .iter()
        .map(|&a| ConcentrationSampler::log_target(a, k, n))
        .collect();
    let max = lps.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let w: Vec<f64> = lps.iter().map(|lp| (lp - max).exp()).collect();
    let total: f64 = w.iter().sum();
    (grid, w.into_iter().map(|v| v / total).collect())
}

/// Posterior mean of `α` by quadrature of the unnormalised target.
fn analytic_alpha_mean(k: usize, n: usize) -> f64 {
    let (grid, p) = alpha_grid(k, n);
    grid.iter().zip(&p).map(|(a, w)| a * w).sum()
}

/// Quantile of the full conditional of `α`.
fn analytic_alpha_quantile(k: usize, n: usize, q: f64) -> f64 {
    let (grid, p) = alpha_grid(k, n);
    let mut acc = 0.0;
    for (a, w) in grid.iter().zip(&p) {
        acc += w;
        if acc >= q {
            return *a;
        }
    }
    grid[grid.len() - 1]
}

fn alpha_chain(k: usize, n: usize, len: usize, seed: u64) -> Vec<f64> {
    let sampler = ConcentrationSampler::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut alpha = 1.0;
    for _ in 0..20 {
        alpha = sampler.sample(alpha, k, n, &mut rng);
    }
    (0..len)
        .map(|_| {
            alpha = sampler.sample(alpha, k, n, &mut rng);
            alpha
        })
        .collect()
}

#[test]
fn concentration_chain_matches_its_target() {
    let (k, n) = (5, 100);
    let chain = alpha_chain(k, n, 3000, 2024);

    let m = chain.len() as f64;
    let mean = chain.iter().sum::<f64>() / m;
    let expected = analytic_alpha_mean(k, n);
    assert!(
        (mean - expected).abs() < 0.1 * expected,
        "chain mean {mean} vs {expected}"
    );

    let var = chain.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / m;
    let lag1 = chain
        .windows(2)
        .map(|w| (w[0] - mean) * (w[1] - mean))
        .sum::<f64>()
        / ((m - 1.0) * var);
    assert!(lag1.abs() < 0.15, "lag-1 autocorrelation {lag1}");
}

#[test]
fn concentration_chain_quantiles_match_full_conditional() {
    let (k, n) = (5, 100);
    let mut chain = alpha_chain(k, n, 20_000, 7);
    chain.sort_by(|a, b| a.total_cmp(b));
    let m = chain.len();

    for q in [0.05, 0.5, 0.95] {
        let expected = analytic_alpha_quantile(k, n, q);
        let observed = chain[((q * m as f64) as usize).min(m - 1)];
        assert!(
            (observed - expected).abs() < 0.08 * expected,
            "q={q}: chain {observed} vs analytic {expected}"
        );
    }

    // Kolmogorov distance between the chain and the quadrature CDF.
    let (grid, p) = alpha_grid(k, n);
    let mut cdf = 0.0;
    let mut idx = 0;
    let mut ks: f64 = 0.0;
    for (a, w) in grid.iter().zip(&p) {
        cdf += w;
        while idx < m && chain[idx] <= *a {
            idx += 1;
        }
        ks = ks.max((idx as f64 / m as f64 - cdf).abs());
    }
    assert!(ks < 0.05, "Kolmogorov distance {ks}");
}

#[test]
fn prior_with_expected_covariance_sets_scale() {
    let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![0.5, 2.0]));
    let prior = NiwPrior::new(0.1, cov.clone(), 6.0, DVector::zeros(2)).unwrap();
    // Λ = L (ν − D − 1)
    assert!((prior.scale() - cov * 3.0).amax() < 1e-12);
}
