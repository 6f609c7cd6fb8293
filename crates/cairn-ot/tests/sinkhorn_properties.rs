//! Marginal, warm-start and pipeline properties of the Sinkhorn solver.

use cairn_ot::{
    barycentric_map, cost_matrix, interpolate_frames, log_sinkhorn, log_sinkhorn_observed,
    Metric, SinkhornConfig, SinkhornError, DEFAULT_FRAME_TIMES,
};
use cairn_test_utils::fixtures::{gaussian_bump, squared_distance_cost, uniform, unit_line};
use cairn_test_utils::{assert_all_close, col_sums, max_abs_diff, row_sums, RecordingObserver};
use proptest::prelude::*;

// ── Examples ────────────────────────────────────────────────────

#[test]
fn two_point_example_matches_marginals() {
    let mu = [0.5, 0.5];
    let nu = [0.5, 0.5];
    let cost = [0.0, 1.0, 1.0, 0.0];
    let r = log_sinkhorn(&mu, &nu, &cost, 2, 2, &SinkhornConfig::new(0.5)).unwrap();
    assert!(r.converged);
    assert_all_close(&row_sums(&r.coupling, 2, 2), &[0.5, 0.5], 1e-3);
    assert_all_close(&col_sums(&r.coupling, 2, 2), &[0.5, 0.5], 1e-3);
}

#[test]
fn shifted_bumps_converge() {
    let n = 30;
    let xs = unit_line(n);
    let mu = gaussian_bump(n, 0.3, 0.08);
    let nu = gaussian_bump(n, 0.7, 0.08);
    let cost = squared_distance_cost(&xs, &xs);
    let config = SinkhornConfig {
        max_iterations: 5000,
        ..SinkhornConfig::new(0.02)
    };
    let r = log_sinkhorn(&mu, &nu, &cost, n, n, &config).unwrap();
    assert!(r.converged);
    assert!(r.diagnostics.marginal_error < config.tolerance);
    // Mass moves right by roughly the shift.
    let mapped = barycentric_map(&r.coupling, n, n, &xs, 1).unwrap();
    let peak = mu
        .iter()
        .enumerate()
        .fold(0, |best, (i, &m)| if m > mu[best] { i } else { best });
    assert!((mapped[peak] - xs[peak] - 0.4).abs() < 0.1);
}

// ── Warm start ──────────────────────────────────────────────────

#[test]
fn warm_start_from_converged_run_is_idempotent() {
    let n = 12;
    let xs = unit_line(n);
    let mu = uniform(n);
    let nu = gaussian_bump(n, 0.5, 0.2);
    let cost = squared_distance_cost(&xs, &xs);
    let cold = log_sinkhorn(&mu, &nu, &cost, n, n, &SinkhornConfig::new(0.05)).unwrap();
    assert!(cold.converged);

    let warm_config = SinkhornConfig {
        warm_start: Some(cold.warm_start()),
        ..SinkhornConfig::new(0.05)
    };
    let warm = log_sinkhorn(&mu, &nu, &cost, n, n, &warm_config).unwrap();
    assert!(warm.converged);
    assert_eq!(warm.iterations, 1);
    assert!(max_abs_diff(&warm.coupling, &cold.coupling) < 1e-3);
}

// ── Validation ──────────────────────────────────────────────────

#[test]
fn fails_fast_before_iterating() {
    let mut rec = RecordingObserver::new();
    let err = log_sinkhorn_observed(
        &[1.0],
        &[1.0],
        &[0.0],
        1,
        1,
        &SinkhornConfig::new(0.0),
        &mut rec,
    )
    .unwrap_err();
    assert!(matches!(err, SinkhornError::InvalidParameter { .. }));
    assert!(rec.started.is_empty());
    assert!(rec.events.is_empty());
}

// ── Observer ────────────────────────────────────────────────────

#[test]
fn observer_sees_each_check() {
    let n = 8;
    let xs = unit_line(n);
    let cost = squared_distance_cost(&xs, &xs);
    let mu = uniform(n);
    let nu = gaussian_bump(n, 0.2, 0.3);
    let config = SinkhornConfig {
        check_interval: 3,
        ..SinkhornConfig::new(0.05)
    };
    let mut rec = RecordingObserver::new();
    let r = log_sinkhorn_observed(&mu, &nu, &cost, n, n, &config, &mut rec).unwrap();
    let checked: Vec<usize> = r.history.iter().map(|h| h.iteration).collect();
    assert_eq!(rec.iterations(), checked);
    assert_eq!(
        rec.series("marginal_error"),
        r.history.iter().map(|h| h.marginal_error).collect::<Vec<_>>()
    );
    assert!(checked.iter().all(|&i| i % 3 == 0 || i + 1 == config.max_iterations));
    assert_eq!(rec.finished, vec![("ot.sinkhorn", r.iterations)]);
}

// ── Point clouds to frames ──────────────────────────────────────

#[test]
fn cloud_pipeline_produces_default_frames() {
    let src = [0.0, 0.0, 1.0, 0.0];
    let dst = [0.0, 1.0, 1.0, 1.0];
    let c = cost_matrix(&src, &dst, 2, Metric::SquaredEuclidean, true).unwrap();
    let r = log_sinkhorn(&[0.5, 0.5], &[0.5, 0.5], &c.matrix, c.rows, c.cols, &SinkhornConfig::new(0.05))
        .unwrap();
    let mapped = barycentric_map(&r.coupling, c.rows, c.cols, &dst, 2).unwrap();
    let frames = interpolate_frames(&src, &mapped, &DEFAULT_FRAME_TIMES).unwrap();
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[0].points, src.to_vec());
    assert!(max_abs_diff(&frames[4].points, &dst) < 1e-3);
}

// ── Properties ──────────────────────────────────────────────────

fn normalized(raw: Vec<f64>) -> Vec<f64> {
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn converged_couplings_match_marginals(
        mu in prop::collection::vec(0.1f64..1.0, 2..6).prop_map(normalized),
        nu in prop::collection::vec(0.1f64..1.0, 2..6).prop_map(normalized),
        eps in 0.1f64..1.0,
    ) {
        let rows = mu.len();
        let cols = nu.len();
        let xs: Vec<f64> = (0..rows).map(|i| i as f64 / rows as f64).collect();
        let ys: Vec<f64> = (0..cols).map(|j| j as f64 / cols as f64).collect();
        let cost = squared_distance_cost(&xs, &ys);
        let config = SinkhornConfig::new(eps);
        let r = log_sinkhorn(&mu, &nu, &cost, rows, cols, &config).unwrap();
        if r.converged {
            let rs = row_sums(&r.coupling, rows, cols);
            let cs = col_sums(&r.coupling, rows, cols);
            prop_assert!(max_abs_diff(&rs, &mu) < config.tolerance);
            prop_assert!(max_abs_diff(&cs, &nu) < config.tolerance);
        }
        prop_assert!(r.coupling.iter().all(|p| p.is_finite() && *p >= 0.0));
    }
}
