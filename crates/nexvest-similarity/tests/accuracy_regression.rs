//! Accuracy regression tests for nexvest-similarity.
//!
//! Reference DTW values were computed by hand or from the implementation and
//! are hardcoded to catch regressions. Property checks use seeded generators
//! so failures are reproducible.

use nexvest_similarity::{
    BandConstraint, Budget, DistanceParams, Dtw, ErrorKind, MetricKind, Normalization, TimeSeries,
    TimeSeriesView, compute_distance, cosine, euclidean, pearson,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ts(values: &[f64]) -> TimeSeries {
    TimeSeries::from_values(values.to_vec()).expect("valid test series")
}

fn view(values: &[f64]) -> TimeSeriesView<'_> {
    TimeSeriesView::new(values).expect("valid test view")
}

fn random_values(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect()
}

fn dtw_distance(dtw: Dtw, a: &[f64], b: &[f64]) -> f64 {
    dtw.distance(view(a), view(b), &Budget::unlimited())
        .expect("unlimited budget")
        .value()
}

// ---------------------------------------------------------------------------
// a) dtw_distances_match_known_values
// ---------------------------------------------------------------------------

#[test]
fn dtw_distances_match_known_values() {
    let pairs: Vec<(Vec<f64>, Vec<f64>)> = vec![
        (vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]),                     // constant offset
        (vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 0.0]),                     // single peak
        (vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]),           // identical
        (vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]),                     // reversed
        (vec![0.0, 5.0, 0.0, 5.0], vec![5.0, 0.0, 5.0, 0.0]),           // alternating
        (vec![1.0], vec![5.0]),                                         // single point
        (vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]),                     // shifted peak
        (vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![0.0, 0.0, 0.0, 0.0, 4.0]), // late ramp
        (vec![10.0, 10.0, 10.0], vec![10.1, 9.9, 10.0]),                // tiny perturbation
        (vec![1.0, 1.0, 1.0], vec![1.0, 1.0, 1.0, 1.0, 1.0]),           // same level, longer
    ];

    let expected: Vec<f64> = vec![
        1.7320508075688772,
        1.0,
        0.0,
        2.8284271247461903,
        7.0710678118654755,
        4.0,
        1.4142135623730951,
        2.449489742783178,
        0.14142135623730953,
        0.0,
    ];

    let dtw = Dtw::unconstrained();
    for (i, ((a, b), &exp)) in pairs.iter().zip(expected.iter()).enumerate() {
        let dist = dtw_distance(dtw, a, b);
        assert!((dist - exp).abs() < 1e-10, "pair {i}: got {dist:.15}, expected {exp:.15}");
    }
}

// ---------------------------------------------------------------------------
// b) band constraint behaviour
// ---------------------------------------------------------------------------

#[test]
fn dtw_distance_with_band_geq_unconstrained() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let n = rng.gen_range(2..30);
        let m = rng.gen_range(2..30);
        let a = random_values(&mut rng, n);
        let b = random_values(&mut rng, m);
        let free = dtw_distance(Dtw::unconstrained(), &a, &b);
        let mut previous = f64::INFINITY;
        for r in 0..4 {
            let banded = dtw_distance(Dtw::with_sakoe_chiba(r), &a, &b);
            assert!(banded.is_finite(), "radius {r} infeasible for {n}x{m}");
            assert!(banded >= free - 1e-9);
            // Widening the band can only lower the distance.
            assert!(banded <= previous + 1e-9);
            previous = banded;
        }
    }
}

#[test]
fn dtw_radius_zero_equals_euclidean() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..50 {
        let n = rng.gen_range(1..64);
        let a = random_values(&mut rng, n);
        let b = random_values(&mut rng, n);
        let dtw = dtw_distance(Dtw::with_sakoe_chiba(0), &a, &b);
        let euc = euclidean(view(&a), view(&b)).unwrap();
        assert!((dtw - euc).abs() < 1e-9, "n={n}: dtw {dtw} vs euclidean {euc}");
    }
}

#[test]
fn dtw_negative_window_rejected() {
    let err = BandConstraint::from_radius(Some(-3)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidWindow);
}

#[test]
fn dtw_empty_input_rejected() {
    let err = TimeSeriesView::new(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSeries);
}

// ---------------------------------------------------------------------------
// c) metric properties
// ---------------------------------------------------------------------------

#[test]
fn euclidean_triangle_inequality() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..200 {
        let n = rng.gen_range(1..32);
        let a = random_values(&mut rng, n);
        let b = random_values(&mut rng, n);
        let c = random_values(&mut rng, n);
        let ab = euclidean(view(&a), view(&b)).unwrap();
        let bc = euclidean(view(&b), view(&c)).unwrap();
        let ac = euclidean(view(&a), view(&c)).unwrap();
        assert!(ac <= ab + bc + 1e-9);
        assert_eq!(euclidean(view(&a), view(&a)).unwrap(), 0.0);
        assert_eq!(ab, euclidean(view(&b), view(&a)).unwrap());
    }
}

#[test]
fn dtw_symmetric_on_random_pairs() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..50 {
        let (n, m) = (rng.gen_range(1..25), rng.gen_range(1..25));
        let a = random_values(&mut rng, n);
        let b = random_values(&mut rng, m);
        for dtw in [Dtw::unconstrained(), Dtw::with_sakoe_chiba(2)] {
            let ab = dtw_distance(dtw, &a, &b);
            let ba = dtw_distance(dtw, &b, &a);
            assert!((ab - ba).abs() < 1e-9);
        }
    }
}

#[test]
fn pearson_known_values() {
    let r = pearson(view(&[1.0, 2.0, 3.0, 4.0]), view(&[2.0, 4.0, 6.0, 8.0])).unwrap();
    assert!((r - 1.0).abs() < 1e-9);

    let a = [3.0, -1.0, 4.0, 1.0, -5.0];
    let neg: Vec<f64> = a.iter().map(|x| -x).collect();
    let r = pearson(view(&a), view(&neg)).unwrap();
    assert!((r + 1.0).abs() < 1e-9);
}

#[test]
fn pearson_affine_invariance_random() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..100 {
        let n = rng.gen_range(2..40);
        let a = random_values(&mut rng, n);
        let b = random_values(&mut rng, n);
        let k = rng.gen_range(0.01..50.0);
        let c = rng.gen_range(-1000.0..1000.0);
        let b2: Vec<f64> = b.iter().map(|x| k * x + c).collect();
        let r1 = pearson(view(&a), view(&b)).unwrap();
        let r2 = pearson(view(&a), view(&b2)).unwrap();
        assert!((r1 - r2).abs() < 1e-9, "k={k} c={c}: {r1} vs {r2}");
        assert!((-1.0..=1.0).contains(&r1));
    }
}

#[test]
fn cosine_known_values() {
    assert!(cosine(view(&[1.0, 0.0]), view(&[0.0, 1.0])).unwrap().abs() < 1e-12);

    let a = [0.5, -2.0, 3.0];
    let ka: Vec<f64> = a.iter().map(|x| 7.0 * x).collect();
    assert!((cosine(view(&a), view(&ka)).unwrap() - 1.0).abs() < 1e-12);

    let b = [1.0, 2.0, 0.5];
    let shifted: Vec<f64> = b.iter().map(|x| x + 3.0).collect();
    let c1 = cosine(view(&a), view(&b)).unwrap();
    let c2 = cosine(view(&a), view(&shifted)).unwrap();
    assert!((c1 - c2).abs() > 1e-3);
}

// ---------------------------------------------------------------------------
// d) compute_distance end to end
// ---------------------------------------------------------------------------

#[test]
fn compute_distance_all_metrics_on_prices() {
    let a = ts(&[100.0, 101.0, 103.0, 102.0, 105.0, 107.0]);
    let b = ts(&[50.0, 50.5, 51.5, 51.0, 52.5, 53.5]);

    let params = DistanceParams::new().with_normalization(Normalization::ZScore);
    for metric in MetricKind::ALL {
        let score = compute_distance(&a, &b, metric, &params).unwrap();
        match metric {
            MetricKind::Euclidean | MetricKind::Dtw => assert!(score.value() < 1e-9),
            MetricKind::Pearson | MetricKind::Cosine => assert!((score.value() - 1.0).abs() < 1e-9),
        }
    }

    let returns = DistanceParams::new().with_normalization(Normalization::PctReturn);
    let score = compute_distance(&a, &b, MetricKind::Euclidean, &returns).unwrap();
    assert!(score.value() < 1e-12);
}

#[test]
fn compute_distance_budget_timeout_kind() {
    let long: Vec<f64> = (0..500).map(|i| (i as f64 * 0.05).cos()).collect();
    let params = DistanceParams::new().with_max_steps(Some(10_000));
    let err = compute_distance(&ts(&long), &ts(&long), MetricKind::Dtw, &params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let banded = params.with_constraint(BandConstraint::SakoeChibaRadius(3));
    assert!(compute_distance(&ts(&long), &ts(&long), MetricKind::Dtw, &banded).is_ok());
}
