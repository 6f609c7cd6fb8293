//! End-to-end artifact bundles: solve, write, read back.

use cairn_export::npy::load;
use cairn_export::{
    write_fokker_planck_bundle, write_hjb_bundle, write_sde_bundle, write_sinkhorn_bundle,
    DiagnosticsDoc, Dtype, FramesDoc,
};
use cairn_hjb::PdeConfig;
use cairn_ot::{
    barycentric_map, interpolate_frames, log_sinkhorn, SinkhornConfig, DEFAULT_FRAME_TIMES,
};
use cairn_sde::{density_grid, simulate, solve_fokker_planck, FpConfig, SdeConfig};
use cairn_test_utils::fixtures::{squared_distance_cost, uniform, unit_line};
use std::fs;
use tempfile::tempdir;

fn keys(map: &cairn_export::ArtifactMap) -> Vec<&str> {
    map.keys().map(String::as_str).collect()
}

// ── Sinkhorn ────────────────────────────────────────────────────

#[test]
fn sinkhorn_bundle() {
    let n = 6;
    let xs = unit_line(n);
    let ys: Vec<f64> = xs.iter().map(|x| x + 0.5).collect();
    let cost = squared_distance_cost(&xs, &ys);
    let r = log_sinkhorn(&uniform(n), &uniform(n), &cost, n, n, &SinkhornConfig::new(0.05)).unwrap();
    let mapped = barycentric_map(&r.coupling, n, n, &ys, 1).unwrap();
    let frames = interpolate_frames(&xs, &mapped, &DEFAULT_FRAME_TIMES).unwrap();

    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("sinkhorn");
    let written = write_sinkhorn_bundle(&dir, &r, &frames, 1).unwrap();
    assert_eq!(
        keys(&written),
        ["pi.npy", "map.ppm", "diagnostics.json", "frames.json"]
    );

    let pi = load(&written["pi.npy"]).unwrap();
    assert_eq!(pi.shape, vec![n, n]);
    assert_eq!(pi.dtype(), Dtype::F8);
    assert_eq!(pi.to_f64(), r.coupling);

    let ppm = fs::read(&written["map.ppm"]).unwrap();
    assert!(ppm.starts_with(b"P6\n6 6\n255\n"));

    let diag = DiagnosticsDoc::from_json(&fs::read_to_string(&written["diagnostics.json"]).unwrap())
        .unwrap();
    assert_eq!(diag.solver, "ot.sinkhorn");
    assert_eq!(diag.iterations, r.iterations);

    let doc = FramesDoc::from_json(&fs::read_to_string(&written["frames.json"]).unwrap()).unwrap();
    assert_eq!(doc.len(), DEFAULT_FRAME_TIMES.len());
    assert_eq!(doc.frames[4].shape, vec![n, 1]);
}

// ── HJB ─────────────────────────────────────────────────────────

const PDE: &str = r#"{
    "grid": {"shape": [5, 5], "spacing": [0.5, 0.5], "origin": [-1.0, -1.0]},
    "dynamics": {"type": "single_integrator", "controlLimit": 1.0},
    "cost": {"type": "quadratic", "controlWeights": [0.1, 0.1]}
}"#;

#[test]
fn hjb_bundle() {
    let outcome = PdeConfig::from_json(PDE).unwrap().run().unwrap();
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("hjb");
    let written = write_hjb_bundle(&dir, &outcome).unwrap();
    assert_eq!(
        keys(&written),
        ["V.npy", "V.csv", "policy.csv", "value.ppm", "diagnostics.json"]
    );

    let v = load(&written["V.npy"]).unwrap();
    assert_eq!(v.shape, vec![5, 5]);
    assert_eq!(v.to_f64(), outcome.value);

    let csv = fs::read_to_string(&written["V.csv"]).unwrap();
    assert_eq!(csv.lines().count(), 26);
    assert!(csv.starts_with("index,coord_0,coord_1,pos_0,pos_1,value\n"));
    let policy = fs::read_to_string(&written["policy.csv"]).unwrap();
    assert!(policy.starts_with("index,pos_0,pos_1,u_0,u_1\n"));

    let diag = DiagnosticsDoc::from_json(&fs::read_to_string(&written["diagnostics.json"]).unwrap())
        .unwrap();
    assert_eq!(diag.solver, "hjb.stationary");
    assert_eq!(diag.converged, outcome.converged);
    assert_eq!(diag.history.len(), outcome.history.len());
}

#[test]
fn one_dimensional_hjb_skips_the_image() {
    let json = r#"{
        "grid": {"shape": [7], "spacing": [0.25], "origin": [-0.75]},
        "dynamics": {"type": "single_integrator", "dimension": 1, "controlLimit": 1.0},
        "cost": {"type": "quadratic", "stateWeights": [1.0], "controlWeights": [0.1]}
    }"#;
    let outcome = PdeConfig::from_json(json).unwrap().run().unwrap();
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("hjb-1d");
    let written = write_hjb_bundle(&dir, &outcome).unwrap();
    assert!(!written.contains_key("value.ppm"));
    assert_eq!(written.len(), 4);
}

// ── SDE ─────────────────────────────────────────────────────────

#[test]
fn sde_bundle() {
    let grid = density_grid(8, 8, 2.5).unwrap();
    let config = SdeConfig {
        particles: 50,
        steps: 10,
        record_every: Some(5),
        ..SdeConfig::default()
    };
    let r = simulate(&config, &grid).unwrap();
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("sde");
    let written = write_sde_bundle(&dir, &grid, &r).unwrap();
    assert_eq!(
        keys(&written),
        ["particles.npy", "density_000.ppm", "density_001.ppm", "frames.json"]
    );

    let particles = load(&written["particles.npy"]).unwrap();
    assert_eq!(particles.dtype(), Dtype::F4);
    assert_eq!(particles.shape, vec![50, 2]);

    let doc = FramesDoc::from_json(&fs::read_to_string(&written["frames.json"]).unwrap()).unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.frames[1].shape, vec![8, 8]);
    assert!((doc.frames[1].t - 0.1).abs() < 1e-12);
}

#[test]
fn fokker_planck_bundle() {
    let grid = density_grid(8, 8, 2.5).unwrap();
    let config = FpConfig {
        steps: 6,
        record_every: Some(3),
        ..FpConfig::default()
    };
    let r = solve_fokker_planck(&config, &grid).unwrap();
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("fp");
    let written = write_fokker_planck_bundle(&dir, &grid, &r).unwrap();
    assert_eq!(
        keys(&written),
        ["mass.npy", "density_000.ppm", "density_001.ppm", "frames.json"]
    );
    let mass = load(&written["mass.npy"]).unwrap();
    assert_eq!(mass.shape, vec![6]);
}
