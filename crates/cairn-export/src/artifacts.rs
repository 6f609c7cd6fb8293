//! Per-solver artifact bundles.
//!
//! Each `write_*_bundle` creates `dir` if needed, writes a fixed set of
//! files into it and returns an [`ArtifactMap`] from artifact name to the
//! path written, in write order.
//!
//! | Solver | Files |
//! |--------|-------|
//! | Sinkhorn | `pi.npy`, `map.ppm`, `diagnostics.json`, `frames.json` |
//! | HJB | `V.npy`, `V.csv`, `policy.csv`, `value.ppm`, `diagnostics.json` |
//! | SDE | `particles.npy`, `density_###.ppm`, `frames.json` |
//! | Fokker–Planck | `mass.npy`, `density_###.ppm`, `frames.json` |
//!
//! `value.ppm` and the density images need a 2-D grid; on other grids
//! the HJB bundle skips its image.

use crate::csv::{save_policy_csv, save_value_csv};
use crate::diagnostics::DiagnosticsDoc;
use crate::error::ExportError;
use crate::frames::FramesDoc;
use crate::npy;
use crate::raster::{render_field, render_matrix};
use cairn_core::Grid;
use cairn_hjb::{MdpSolution, PdeOutcome};
use cairn_ot::{PointFrame, SinkhornResult};
use cairn_sde::{FpResult, SdeResult};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Artifact name → written path, in write order.
pub type ArtifactMap = IndexMap<String, PathBuf>;

/// Collects written paths under one directory.
struct Bundle {
    dir: PathBuf,
    written: ArtifactMap,
}

impl Bundle {
    fn create(dir: &Path) -> Result<Self, ExportError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: IndexMap::new(),
        })
    }

    /// Run `write` against `dir/name` and record the path.
    fn add(
        &mut self,
        name: &str,
        write: impl FnOnce(&Path) -> Result<(), ExportError>,
    ) -> Result<(), ExportError> {
        let path = self.dir.join(name);
        write(&path)?;
        debug!(artifact = name, "artifact written");
        self.written.insert(name.to_string(), path);
        Ok(())
    }

    fn finish(self, solver: &str) -> ArtifactMap {
        info!(
            solver,
            dir = %self.dir.display(),
            files = self.written.len(),
            "artifact bundle written"
        );
        self.written
    }
}

fn density_images(bundle: &mut Bundle, grid: &Grid, densities: &[Vec<f64>]) -> Result<(), ExportError> {
    for (k, d) in densities.iter().enumerate() {
        let raster = render_field(grid, d)?;
        bundle.add(&format!("density_{k:03}.ppm"), |p| raster.save_ppm(p))?;
    }
    Ok(())
}

/// Coupling, its heat map, diagnostics and interpolation frames.
///
/// `frames` are the displacement-interpolated point clouds (see
/// [`interpolate_frames`](cairn_ot::interpolate_frames)) of dimension
/// `dim`; pass an empty slice to write an empty sequence.
pub fn write_sinkhorn_bundle(
    dir: &Path,
    result: &SinkhornResult,
    frames: &[PointFrame],
    dim: usize,
) -> Result<ArtifactMap, ExportError> {
    let mut bundle = Bundle::create(dir)?;
    let shape = [result.rows, result.cols];
    bundle.add("pi.npy", |p| npy::save_f64(p, &shape, &result.coupling))?;
    let heat = render_matrix(&result.coupling, result.rows, result.cols)?;
    bundle.add("map.ppm", |p| heat.save_ppm(p))?;
    bundle.add("diagnostics.json", |p| {
        DiagnosticsDoc::from_sinkhorn(result).save(p)
    })?;
    let doc = FramesDoc::from_point_frames(frames, dim)?;
    bundle.add("frames.json", |p| doc.save(p))?;
    Ok(bundle.finish("ot.sinkhorn"))
}

/// Shared HJB output: value array and table, policy table, value image.
fn hjb_fields(
    bundle: &mut Bundle,
    grid: &Grid,
    value: &[f64],
    controls: &[f64],
    control_dim: usize,
) -> Result<(), ExportError> {
    bundle.add("V.npy", |p| npy::save_f64(p, grid.shape(), value))?;
    bundle.add("V.csv", |p| save_value_csv(p, grid, value))?;
    bundle.add("policy.csv", |p| {
        save_policy_csv(p, grid, controls, control_dim)
    })?;
    if grid.ndim() == 2 {
        let raster = render_field(grid, value)?;
        bundle.add("value.ppm", |p| raster.save_ppm(p))?;
    } else {
        debug!(ndim = grid.ndim(), "value image skipped for non-planar grid");
    }
    Ok(())
}

/// Value field, policy and diagnostics of a continuous HJB job.
pub fn write_hjb_bundle(dir: &Path, outcome: &PdeOutcome) -> Result<ArtifactMap, ExportError> {
    let mut bundle = Bundle::create(dir)?;
    hjb_fields(
        &mut bundle,
        outcome.problem.grid(),
        &outcome.value,
        outcome.policy.as_slice(),
        outcome.policy.control_dim(),
    )?;
    bundle.add("diagnostics.json", |p| DiagnosticsDoc::from_pde(outcome).save(p))?;
    Ok(bundle.finish(outcome.solver))
}

/// Same files as [`write_hjb_bundle`] for a discrete MDP solution on `grid`.
///
/// # Errors
///
/// Returns `Err` if the solution was not computed on `grid`.
pub fn write_mdp_bundle(
    dir: &Path,
    grid: &Grid,
    solution: &MdpSolution,
) -> Result<ArtifactMap, ExportError> {
    grid.check_field_len(solution.values.len())?;
    let controls: Vec<f64> = (0..solution.values.len())
        .flat_map(|i| solution.control(i).to_vec())
        .collect();
    let mut bundle = Bundle::create(dir)?;
    hjb_fields(
        &mut bundle,
        grid,
        &solution.values,
        &controls,
        solution.lattice.dim(),
    )?;
    bundle.add("diagnostics.json", |p| DiagnosticsDoc::from_mdp(solution).save(p))?;
    Ok(bundle.finish("hjb.mdp"))
}

/// Final particles, one density image per snapshot and the density frames.
///
/// `particles.npy` is `<f4` shaped `[N, 2]`.
pub fn write_sde_bundle(
    dir: &Path,
    grid: &Grid,
    result: &SdeResult,
) -> Result<ArtifactMap, ExportError> {
    let mut bundle = Bundle::create(dir)?;
    let shape = [result.particles(), 2];
    bundle.add("particles.npy", |p| npy::save_f32(p, &shape, &result.positions))?;
    density_images(&mut bundle, grid, &result.densities)?;
    let times: Vec<f64> = result.snapshots.iter().map(|s| s.time).collect();
    let doc = FramesDoc::from_densities(grid, &result.densities, &times)?;
    bundle.add("frames.json", |p| doc.save(p))?;
    Ok(bundle.finish("sde.euler_maruyama"))
}

/// Mass history, one density image per record and the density frames.
pub fn write_fokker_planck_bundle(
    dir: &Path,
    grid: &Grid,
    result: &FpResult,
) -> Result<ArtifactMap, ExportError> {
    let mut bundle = Bundle::create(dir)?;
    bundle.add("mass.npy", |p| {
        npy::save_f64(p, &[result.mass_history.len()], &result.mass_history)
    })?;
    density_images(&mut bundle, grid, &result.densities)?;
    let doc = FramesDoc::from_densities(grid, &result.densities, &result.times)?;
    bundle.add("frames.json", |p| doc.save(p))?;
    Ok(bundle.finish("sde.fokker_planck"))
}
