//! False-colour rendering of 2-D scalar fields.
//!
//! Values are min–max normalized to `t ∈ [0, 1]` over the finite entries
//! and mapped to `(255·t, 0, 255·(1 − t))`: blue for the minimum, red for
//! the maximum. A constant field renders entirely at `t = 0` and
//! non-finite entries also render at `t = 0`. Images are written as
//! binary PPM (`P6`).

use crate::error::ExportError;
use cairn_core::Grid;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// An RGB8 image, row 0 at the top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Raster {
    /// Columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// RGB triple at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        let k = 3 * (row * self.width + col);
        [self.pixels[k], self.pixels[k + 1], self.pixels[k + 2]]
    }

    /// Interleaved RGB bytes, row-major from the top.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Binary PPM encoding.
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.pixels);
        out
    }

    /// Write as PPM to `path`.
    pub fn save_ppm(&self, path: &Path) -> Result<(), ExportError> {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(&self.to_ppm())?;
        w.flush()?;
        Ok(())
    }
}

/// Normalized `t` for every entry.
fn normalize(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;
    values
        .iter()
        .map(|&v| {
            if !v.is_finite() || span <= 0.0 {
                0.0
            } else {
                ((v - lo) / span).clamp(0.0, 1.0)
            }
        })
        .collect()
}

fn ramp(t: f64) -> [u8; 3] {
    [
        (255.0 * t).round() as u8,
        0,
        (255.0 * (1.0 - t)).round() as u8,
    ]
}

/// Render a row-major `rows × cols` matrix; matrix row 0 is the top row.
///
/// # Errors
///
/// Returns `Err` if `values.len() != rows·cols`.
pub fn render_matrix(values: &[f64], rows: usize, cols: usize) -> Result<Raster, ExportError> {
    if values.len() != rows * cols {
        return Err(ExportError::DimensionMismatch {
            what: "matrix entries",
            expected: rows * cols,
            found: values.len(),
        });
    }
    let pixels = normalize(values).into_iter().flat_map(ramp).collect();
    Ok(Raster {
        width: cols,
        height: rows,
        pixels,
    })
}

/// Render a field on a 2-D grid in map orientation.
///
/// Axis 0 runs left to right and axis 1 bottom to top, so the image's
/// top row holds the largest axis-1 coordinate.
///
/// # Errors
///
/// Returns `Err` if the grid is not 2-D or the field has the wrong length.
pub fn render_field(grid: &Grid, values: &[f64]) -> Result<Raster, ExportError> {
    if grid.ndim() != 2 {
        return Err(ExportError::DimensionMismatch {
            what: "raster grid axes",
            expected: 2,
            found: grid.ndim(),
        });
    }
    grid.check_field_len(values.len())?;
    let (nx, ny) = (grid.shape()[0], grid.shape()[1]);
    let t = normalize(values);
    let mut pixels = Vec::with_capacity(3 * nx * ny);
    for row in 0..ny {
        let j = ny - 1 - row;
        for i in 0..nx {
            pixels.extend_from_slice(&ramp(t[i * ny + j]));
        }
    }
    Ok(Raster {
        width: nx,
        height: ny,
        pixels,
    })
}
