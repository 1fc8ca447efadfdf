use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use shrinkda::shrink::{
    Intensity, SampleWeights, SvdStrategy, crossprod_powcor_shrink, estimate_lambda_cor,
    estimate_lambda_freq, estimate_lambda_var, positive_svd, positive_svd_with, standardize,
    var_shrink, weighted_moments,
};

fn random_matrix(n: usize, p: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((n, p), |_| rng.sample(StandardNormal))
}

fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    (a - b).iter().fold(0.0, |acc, &v| acc.max(v.abs()))
}

fn random_weights(n: usize, rng: &mut StdRng) -> SampleWeights {
    let raw = Array1::from_shape_fn(n, |_| rng.gen_range(0.5..2.0));
    SampleWeights::new(raw, n).unwrap()
}

#[test]
fn intensities_stay_in_the_unit_interval_for_random_data() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..25 {
        let n = rng.gen_range(3..15);
        let p = rng.gen_range(1..40);
        let scale = 10f64.powi(rng.gen_range(-3..4));
        let x = random_matrix(n, p, &mut rng) * scale;
        let w = random_weights(n, &mut rng);

        for lambda in [
            estimate_lambda_var(x.view(), Some(&w)).unwrap(),
            estimate_lambda_cor(x.view(), Some(&w)).unwrap(),
        ] {
            assert!((0.0..=1.0).contains(&lambda), "lambda {lambda} for ({n}, {p})");
        }

        let counts: Vec<usize> = (0..rng.gen_range(2..6)).map(|_| rng.gen_range(0..30)).collect();
        let lambda_freq = estimate_lambda_freq(&counts);
        assert!((0.0..=1.0).contains(&lambda_freq));
    }
}

#[test]
fn frequency_intensity_is_full_for_degenerate_totals() {
    for counts in [vec![0, 0, 0], vec![0, 1], vec![1, 0, 0, 0]] {
        assert_eq!(estimate_lambda_freq(&counts), 1.0);
    }
}

#[test]
fn automatic_svd_strategy_agrees_with_direct_svd() {
    let mut rng = StdRng::seed_from_u64(7);
    for &(n, p) in &[(30, 6), (6, 30), (11, 13)] {
        let m = random_matrix(n, p, &mut rng);
        let reference = positive_svd_with(SvdStrategy::Direct, m.view(), None).unwrap();
        let svd = positive_svd(m.view(), None).unwrap();
        assert_eq!(svd.rank(), reference.rank());
        assert!(max_abs_diff(&svd.reconstruct(), &m) < 1e-8);
        for (a, b) in svd.d.iter().zip(reference.d.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9 * b.max(1.0));
        }
        let proj = svd.u.dot(&svd.u.t());
        let reference_proj = reference.u.dot(&reference.u.t());
        assert!(max_abs_diff(&proj, &reference_proj) < 1e-8);
    }
}

#[test]
fn standardized_data_has_unit_variance_under_random_weights() {
    let mut rng = StdRng::seed_from_u64(99);
    let x = random_matrix(12, 5, &mut rng) * 3.0 + 1.0;
    let w = random_weights(12, &mut rng);
    let st = standardize(x.view(), &w, true, true).unwrap();
    let moments = weighted_moments(st.data.view(), &w).unwrap();
    for j in 0..5 {
        assert_abs_diff_eq!(moments.mean[j], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(moments.variance[j], 1.0, epsilon = 1e-10);
    }
}

#[test]
fn weighted_projection_powers_compose() {
    let mut rng = StdRng::seed_from_u64(5);
    let x = random_matrix(9, 35, &mut rng);
    let y = random_matrix(35, 3, &mut rng);
    let w = random_weights(9, &mut rng);
    let lambda = Intensity::Fixed(0.15);

    let a = crossprod_powcor_shrink(x.view(), y.view(), 0.7, lambda, Some(&w)).unwrap();
    let ab = crossprod_powcor_shrink(x.view(), a.projected.view(), -1.9, lambda, Some(&w)).unwrap();
    let direct = crossprod_powcor_shrink(x.view(), y.view(), -1.2, lambda, Some(&w)).unwrap();
    assert!(max_abs_diff(&ab.projected, &direct.projected) < 1e-7);
}

#[test]
fn identity_shortcut_returns_input_bit_for_bit() {
    let mut rng = StdRng::seed_from_u64(6);
    let x = random_matrix(5, 50, &mut rng);
    let y = random_matrix(50, 2, &mut rng);
    let w = random_weights(5, &mut rng);
    for (alpha, lambda) in [(-1.0, 1.0), (0.0, 0.0), (0.0, 0.6), (2.5, 1.0)] {
        let result =
            crossprod_powcor_shrink(x.view(), y.view(), alpha, Intensity::Fixed(lambda), Some(&w))
                .unwrap();
        assert_eq!(result.projected, y);
    }
}

#[test]
fn variance_shrinkage_moves_toward_the_median() {
    let mut rng = StdRng::seed_from_u64(8);
    let scales = Array1::linspace(0.5, 5.0, 10);
    let x = random_matrix(20, 10, &mut rng) * &scales.view().insert_axis(Axis(0));
    let raw = var_shrink(x.view(), Intensity::Fixed(0.0), None).unwrap();
    let shrunk = var_shrink(x.view(), Intensity::Auto, None).unwrap();
    assert!(shrunk.lambda.estimated);

    let spread = |v: &Array1<f64>| {
        let max = v.iter().copied().fold(f64::MIN, f64::max);
        let min = v.iter().copied().fold(f64::MAX, f64::min);
        max - min
    };
    assert!(spread(&shrunk.variances) <= spread(&raw.variances));
}

#[test]
fn full_rank_svd_reconstructs_wide_matrix() {
    let mut rng = StdRng::seed_from_u64(10);
    let m = random_matrix(7, 200, &mut rng);
    let svd = positive_svd(m.view(), None).unwrap();
    assert_eq!(svd.rank(), 7);
    assert!(max_abs_diff(&svd.reconstruct(), &m) < 1e-9);
}
