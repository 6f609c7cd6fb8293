//! End-to-end HJB properties on small convex problems.

use cairn_core::Boundary;
use cairn_hjb::{
    extract_policy, simulate_rollout, solve_stationary, solve_stationary_observed,
    solve_time_dependent, Cost, Dynamics, HjbProblem, QuadraticCost, RolloutConfig,
    StationaryConfig, TimeDependentConfig,
};
use cairn_test_utils::fixtures::centered_grid;
use cairn_test_utils::RecordingObserver;

fn convex(n: usize) -> HjbProblem {
    let dynamics = Dynamics::single_integrator(2, 1.0, 0.5).unwrap();
    let cost = Cost::quadratic(QuadraticCost::new(
        vec![1.0, 1.0],
        vec![0.1, 0.1],
        vec![0.0, 0.0],
    ));
    HjbProblem::new(centered_grid(n, 1.0), dynamics, cost, Boundary::Clamp).unwrap()
}

// ── Stationary ──────────────────────────────────────────────────

#[test]
fn residual_reaches_tolerance_before_cap() {
    let p = convex(15);
    let config = StationaryConfig::default();
    let r = solve_stationary(&p, &config).unwrap();
    assert!(r.converged);
    assert!(r.iterations < config.max_iterations);
    assert!(r.residual < config.tolerance);
}

#[test]
fn residual_trends_down() {
    let p = convex(15);
    let r = solve_stationary(&p, &StationaryConfig::default()).unwrap();
    let n = r.history.len();
    assert!(n >= 4);
    // Compare the mean of the first and last quarters of the run.
    let q = n / 4;
    let mean = |s: &[cairn_hjb::ResidualRecord]| {
        s.iter().map(|h| h.residual).sum::<f64>() / s.len() as f64
    };
    assert!(mean(&r.history[n - q..]) < mean(&r.history[..q]));
}

#[test]
fn observer_receives_one_event_per_sweep() {
    let p = convex(9);
    let mut rec = RecordingObserver::new();
    let r = solve_stationary_observed(&p, &StationaryConfig::default(), &mut rec).unwrap();
    assert_eq!(rec.started, vec!["hjb.stationary"]);
    assert_eq!(rec.events.len(), r.iterations);
    assert_eq!(rec.finished, vec![("hjb.stationary", r.iterations)]);
    let expected: Vec<f64> = r.history.iter().map(|h| h.residual).collect();
    assert_eq!(rec.series("residual"), expected);
}

#[test]
fn wrap_boundary_solves() {
    let dynamics = Dynamics::single_integrator(2, 1.0, 0.5).unwrap();
    let cost = Cost::quadratic(QuadraticCost::new(
        vec![1.0, 1.0],
        vec![0.1, 0.1],
        vec![0.0, 0.0],
    ));
    let p = HjbProblem::new(centered_grid(9, 1.0), dynamics, cost, Boundary::Wrap).unwrap();
    let r = solve_stationary(&p, &StationaryConfig::default()).unwrap();
    assert!(r.converged);
}

// ── Policy and rollout ──────────────────────────────────────────

#[test]
fn closed_loop_reduces_distance_to_goal() {
    let p = convex(15);
    let v = solve_stationary(&p, &StationaryConfig::default()).unwrap();
    let policy = extract_policy(&p, &v.value).unwrap();
    let config = RolloutConfig {
        start: vec![0.8, -0.6],
        steps: 60,
        dt: 0.05,
    };
    let r = simulate_rollout(&p, &policy, &config).unwrap();
    let start = r.states[0].iter().map(|x| x * x).sum::<f64>();
    let end = r.states[60].iter().map(|x| x * x).sum::<f64>();
    assert!(end < 0.25 * start, "start {start}, end {end}");
}

// ── Finite horizon ──────────────────────────────────────────────

#[test]
fn long_horizon_approaches_stationary_value() {
    // Undamped backward stepping from the same initial field approaches
    // the same fixed point as the damped stationary iteration.
    let p = convex(9);
    let stationary = solve_stationary(
        &p,
        &StationaryConfig {
            tolerance: 1e-6,
            max_iterations: 20_000,
            ..StationaryConfig::default()
        },
    )
    .unwrap();
    let finite = solve_time_dependent(&p, &TimeDependentConfig::new(20.0)).unwrap();
    let worst = stationary
        .value
        .iter()
        .zip(&finite.value)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    assert!(worst < 1e-2, "max difference {worst}");
}
