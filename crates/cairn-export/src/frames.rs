//! Versioned, time-ordered frame sequences.
//!
//! A frames document is the JSON container consumers use to animate a
//! solve: displacement-interpolated point clouds from Sinkhorn, or density
//! snapshots from the SDE simulator and Fokker–Planck solver. Each frame
//! stores a flat row-major `data` buffer and the `shape` it folds into.

use crate::error::ExportError;
use cairn_core::Grid;
use cairn_ot::PointFrame;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Version tag written into every document.
pub const FRAMES_VERSION: &str = "cairn.frames/1";

/// One frame of a sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position in the sequence.
    pub index: usize,
    /// Physical or interpolation time.
    pub t: f64,
    /// Dimensions of `data`, row-major.
    pub shape: Vec<usize>,
    /// Flattened values.
    pub data: Vec<f64>,
}

/// A frames container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FramesDoc {
    /// Always [`FRAMES_VERSION`] for documents this crate produces.
    pub version: String,
    /// Frames in push order.
    pub frames: Vec<Frame>,
}

impl Default for FramesDoc {
    fn default() -> Self {
        Self::new()
    }
}

impl FramesDoc {
    /// An empty document.
    pub fn new() -> Self {
        Self {
            version: FRAMES_VERSION.to_string(),
            frames: Vec::new(),
        }
    }

    /// Append a frame; its index is the current frame count.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `data.len()` is not the product of `shape`.
    pub fn push(&mut self, t: f64, shape: Vec<usize>, data: Vec<f64>) -> Result<(), ExportError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ExportError::DimensionMismatch {
                what: "frame data vs shape",
                expected,
                found: data.len(),
            });
        }
        self.frames.push(Frame {
            index: self.frames.len(),
            t,
            shape,
            data,
        });
        Ok(())
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if no frames have been pushed.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Point-cloud frames of dimension `dim`, each shaped `[n, dim]`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `dim` is zero or a frame's points do not divide
    /// into `dim`-vectors.
    pub fn from_point_frames(frames: &[PointFrame], dim: usize) -> Result<Self, ExportError> {
        if dim == 0 {
            return Err(ExportError::DimensionMismatch {
                what: "point dimension",
                expected: 1,
                found: 0,
            });
        }
        let mut doc = Self::new();
        for f in frames {
            if f.points.len() % dim != 0 {
                return Err(ExportError::DimensionMismatch {
                    what: "point buffer vs dimension",
                    expected: f.points.len().next_multiple_of(dim),
                    found: f.points.len(),
                });
            }
            doc.push(f.t, vec![f.points.len() / dim, dim], f.points.clone())?;
        }
        Ok(doc)
    }

    /// Density snapshots on `grid`, each shaped like the grid.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the series lengths differ or a density does not
    /// match the grid.
    pub fn from_densities(
        grid: &Grid,
        densities: &[Vec<f64>],
        times: &[f64],
    ) -> Result<Self, ExportError> {
        if densities.len() != times.len() {
            return Err(ExportError::DimensionMismatch {
                what: "densities vs times",
                expected: times.len(),
                found: densities.len(),
            });
        }
        let mut doc = Self::new();
        for (d, &t) in densities.iter().zip(times) {
            grid.check_field_len(d.len())?;
            doc.push(t, grid.shape().to_vec(), d.clone())?;
        }
        Ok(doc)
    }

    /// Compact JSON.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and check the version tag and every frame's shape.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::UnsupportedVersion`] for any tag other than
    /// [`FRAMES_VERSION`].
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let doc: Self = serde_json::from_str(json)?;
        if doc.version != FRAMES_VERSION {
            return Err(ExportError::UnsupportedVersion { found: doc.version });
        }
        for f in &doc.frames {
            let expected: usize = f.shape.iter().product();
            if f.data.len() != expected {
                return Err(ExportError::DimensionMismatch {
                    what: "frame data vs shape",
                    expected,
                    found: f.data.len(),
                });
            }
        }
        Ok(doc)
    }

    /// Write as JSON to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut w, self)?;
        w.flush()?;
        Ok(())
    }
}
