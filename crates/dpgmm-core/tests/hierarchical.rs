//! Population-level reconstruction from per-event draws.

use dpgmm_core::{Bounds, Dpgmm, Draw, DrawKind, Hdpgmm, MixtureError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

const DRAWS_PER_EVENT: usize = 4;

/// Each event: samples scattered around a location drawn from N(30, 2).
fn synthetic_events(n_events: usize, seed: u64) -> Vec<Vec<Draw>> {
    let bounds = Bounds::new(&[[10.0, 50.0]]).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let population = Normal::new(30.0, 2.0).unwrap();
    (0..n_events)
        .map(|i| {
            let loc = population.sample(&mut rng);
            let noise = Normal::new(loc, 1.0).unwrap();
            let samples: Vec<Vec<f64>> = (0..150).map(|_| vec![noise.sample(&mut rng)]).collect();
            let mut session = Dpgmm::new(bounds.clone(), None, None)
                .unwrap()
                .with_seed(seed + i as u64);
            (0..DRAWS_PER_EVENT)
                .map(|_| session.density_from_samples(&samples).unwrap())
                .collect()
        })
        .collect()
}

fn session(mc_draws: usize, seed: u64) -> Hdpgmm {
    let bounds = Bounds::new(&[[10.0, 50.0]]).unwrap();
    Hdpgmm::new(bounds, None, None, Some(mc_draws))
        .unwrap()
        .with_seed(seed)
        .unwrap()
}

#[test]
fn population_density_is_centred_on_the_events() {
    let events = synthetic_events(15, 100);
    let mut hier = session(400, 7);
    let draw = hier.density_from_events(&events).unwrap();

    assert_eq!(draw.kind(), DrawKind::Hierarchical);
    assert_eq!(draw.n_points(), 15);
    assert!(draw.n_clusters() >= 1);
    assert!(draw.pdf(&[30.0]).unwrap() > draw.pdf(&[15.0]).unwrap());
    assert!(draw.pdf(&[30.0]).unwrap() > draw.pdf(&[45.0]).unwrap());

    let mut rng = StdRng::seed_from_u64(1);
    let xs = draw.rvs(5000, &mut rng);
    let mean = xs.iter().map(|x| x[0]).sum::<f64>() / xs.len() as f64;
    assert!((mean - 30.0).abs() < 3.0, "population mean {mean}");
}

#[test]
fn first_event_opens_a_cluster() {
    let events = synthetic_events(1, 3);
    let mut hier = session(200, 1);
    hier.add_new_event(&events[0]).unwrap();
    assert_eq!(hier.n_events(), 1);
    assert_eq!(hier.n_clusters(), 1);
    assert_eq!(hier.cluster_sizes(), vec![1]);
}

#[test]
fn empty_session_builds_the_prior() {
    let hier = session(50, 2);
    let draw = hier.build_mixture().unwrap();
    assert_eq!(draw.n_clusters(), 1);
    assert_eq!(draw.n_points(), 0);
    assert!(draw.pdf(&[30.0]).unwrap().is_finite());
}

#[test]
fn empty_event_is_rejected() {
    let mut hier = session(50, 2);
    let err = hier.add_new_event(&[]).unwrap_err();
    assert!(matches!(err, MixtureError::EmptyEvent));
    assert_eq!(hier.n_events(), 0);
}

#[test]
fn event_on_other_bounds_is_rejected() {
    let other = Bounds::new(&[[0.0, 100.0]]).unwrap();
    let mut fit = Dpgmm::new(other, None, None).unwrap().with_seed(1);
    let draw = fit.density_from_samples(&[vec![40.0], vec![41.0]]).unwrap();

    let mut hier = session(50, 2);
    let err = hier.add_new_event(&[draw]).unwrap_err();
    assert!(matches!(err, MixtureError::BoundsMismatch { .. }));
}

#[test]
fn seeded_hierarchical_runs_agree() {
    let events = synthetic_events(6, 42);
    let a = session(150, 9).density_from_events(&events).unwrap();
    let b = session(150, 9).density_from_events(&events).unwrap();
    assert_eq!(a.pdf(&[29.0]).unwrap(), b.pdf(&[29.0]).unwrap());
    assert_eq!(a.n_clusters(), b.n_clusters());
}

#[test]
fn sealed_session_refuses_work() {
    let events = synthetic_events(2, 5);
    let mut hier = session(50, 3);
    hier.seal();
    assert!(matches!(
        hier.density_from_events(&events),
        Err(MixtureError::UseAfterBuild)
    ));
}
