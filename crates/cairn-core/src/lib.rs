//! Core types for the Cairn solvers.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! rectangular [`Grid`] every solver discretizes onto, the [`Boundary`]
//! policy used when a query leaves the grid, multilinear interpolation
//! over grid-resident fields, and the [`IterationObserver`] hook through
//! which callers can watch solver loops without affecting them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod error;
pub mod grid;
pub mod interp;
pub mod observe;

pub use boundary::Boundary;
pub use error::GridError;
pub use grid::{Cell, Cells, Coords, Grid, GridSpec, Point};
pub use interp::{interpolate, FieldView};
pub use observe::{IterationEvent, IterationObserver, NoopObserver};
