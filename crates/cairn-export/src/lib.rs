//! Artifact encoding for Cairn solver output.
//!
//! Solvers return plain buffers; this crate turns them into files other
//! tools can read:
//!
//! - [`npy`]: NPY v1.0 binary arrays (`<f8`, `<f4`) with a 16-byte
//!   aligned header, readable by `numpy.load`
//! - [`raster`]: min–max normalized false-colour PPM images
//! - [`diagnostics`]: convergence summaries as JSON
//! - [`frames`]: versioned time-ordered frame sequences
//! - [`csv`]: per-cell value and policy tables
//! - [`artifacts`]: one call per solver writing a whole bundle
//!
//! Every writer is generic over [`std::io::Write`] or takes a path, and
//! every decoder validates its input fully before returning.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod artifacts;
pub mod csv;
pub mod diagnostics;
pub mod error;
pub mod frames;
pub mod npy;
pub mod raster;

pub use artifacts::{
    write_fokker_planck_bundle, write_hjb_bundle, write_mdp_bundle, write_sde_bundle,
    write_sinkhorn_bundle, ArtifactMap,
};
pub use csv::{save_policy_csv, save_value_csv, write_policy_csv, write_value_csv};
pub use diagnostics::{DiagnosticsDoc, HistoryEntry};
pub use error::ExportError;
pub use frames::{Frame, FramesDoc, FRAMES_VERSION};
pub use npy::{read_npy, write_f32, write_f64, Dtype, NpyArray, NpyData};
pub use raster::{render_field, render_matrix, Raster};
