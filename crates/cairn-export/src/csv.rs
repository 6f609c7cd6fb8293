//! Plain comma-separated tables of per-cell values and controls.
//!
//! One row per grid cell in row-major order, preceded by a header. Floats
//! use Rust's shortest round-trip formatting.

use crate::error::ExportError;
use cairn_core::Grid;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_header<W: Write>(w: &mut W, columns: &[String]) -> Result<(), ExportError> {
    writeln!(w, "{}", columns.join(","))?;
    Ok(())
}

fn axis_columns(prefix: &str, n: usize) -> impl Iterator<Item = String> + '_ {
    (0..n).map(move |d| format!("{prefix}_{d}"))
}

/// Write `index, coord_0.., pos_0.., value` for every cell.
///
/// # Errors
///
/// Returns `Err` if `values` does not have one entry per cell, or on I/O
/// failure.
pub fn write_value_csv<W: Write>(w: &mut W, grid: &Grid, values: &[f64]) -> Result<(), ExportError> {
    grid.check_field_len(values.len())?;
    let d = grid.ndim();
    let mut columns = vec!["index".to_string()];
    columns.extend(axis_columns("coord", d));
    columns.extend(axis_columns("pos", d));
    columns.push("value".to_string());
    write_header(w, &columns)?;

    for cell in grid.cells() {
        write!(w, "{}", cell.index)?;
        for c in &cell.coords {
            write!(w, ",{c}")?;
        }
        for p in &cell.position {
            write!(w, ",{p}")?;
        }
        writeln!(w, ",{}", values[cell.index])?;
    }
    Ok(())
}

/// Write `index, pos_0.., u_0..` for every cell.
///
/// `controls` is the flattened `cells × control_dim` buffer of a policy.
///
/// # Errors
///
/// Returns `Err` if the buffer does not hold `control_dim` entries per
/// cell, or on I/O failure.
pub fn write_policy_csv<W: Write>(
    w: &mut W,
    grid: &Grid,
    controls: &[f64],
    control_dim: usize,
) -> Result<(), ExportError> {
    if controls.len() != grid.size() * control_dim {
        return Err(ExportError::DimensionMismatch {
            what: "policy entries vs cells × control dimension",
            expected: grid.size() * control_dim,
            found: controls.len(),
        });
    }
    let mut columns = vec!["index".to_string()];
    columns.extend(axis_columns("pos", grid.ndim()));
    columns.extend(axis_columns("u", control_dim));
    write_header(w, &columns)?;

    for cell in grid.cells() {
        write!(w, "{}", cell.index)?;
        for p in &cell.position {
            write!(w, ",{p}")?;
        }
        let start = cell.index * control_dim;
        for u in &controls[start..start + control_dim] {
            write!(w, ",{u}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// [`write_value_csv`] into a new file at `path`.
pub fn save_value_csv(path: &Path, grid: &Grid, values: &[f64]) -> Result<(), ExportError> {
    let mut w = BufWriter::new(File::create(path)?);
    write_value_csv(&mut w, grid, values)?;
    w.flush()?;
    Ok(())
}

/// [`write_policy_csv`] into a new file at `path`.
pub fn save_policy_csv(
    path: &Path,
    grid: &Grid,
    controls: &[f64],
    control_dim: usize,
) -> Result<(), ExportError> {
    let mut w = BufWriter::new(File::create(path)?);
    write_policy_csv(&mut w, grid, controls, control_dim)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(&[2, 2], &[0.5, 1.0], &[-1.0, 0.0]).unwrap()
    }

    #[test]
    fn value_table() {
        let mut out = Vec::new();
        write_value_csv(&mut out, &grid(), &[0.0, 1.5, 2.0, 3.25]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,coord_0,coord_1,pos_0,pos_1,value");
        assert_eq!(lines[1], "0,0,0,-1,0,0");
        assert_eq!(lines[2], "1,0,1,-1,1,1.5");
        assert_eq!(lines[4], "3,1,1,-0.5,1,3.25");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn policy_table() {
        let mut out = Vec::new();
        let controls = [1.0, -1.0, 0.5, 0.0, 0.0, 0.0, -0.5, 2.0];
        write_policy_csv(&mut out, &grid(), &controls, 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,pos_0,pos_1,u_0,u_1");
        assert_eq!(lines[1], "0,-1,0,1,-1");
        assert_eq!(lines[4], "3,-0.5,1,-0.5,2");
    }

    #[test]
    fn length_checks() {
        let mut out = Vec::new();
        assert!(write_value_csv(&mut out, &grid(), &[0.0; 3]).is_err());
        assert!(write_policy_csv(&mut out, &grid(), &[0.0; 4], 2).is_err());
    }
}
