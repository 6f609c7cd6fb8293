//! Test utilities and fixtures for Cairn development.
//!
//! Provides a [`RecordingObserver`] that captures every solver event,
//! tolerance-based comparison helpers, and the standard grids and
//! distributions in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use cairn_core::{IterationEvent, IterationObserver};

/// One captured [`IterationEvent`], with owned metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent {
    pub solver: &'static str,
    pub iteration: usize,
    pub metrics: Vec<(&'static str, f64)>,
}

impl RecordedEvent {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(k, _)| *k == name)
            .map(|&(_, v)| v)
    }
}

/// Observer that records everything it is told.
///
/// Pass `&mut recorder` to any `*_observed` solver entry point, then
/// inspect [`events`](RecordingObserver::events).
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    pub started: Vec<&'static str>,
    pub events: Vec<RecordedEvent>,
    pub finished: Vec<(&'static str, usize)>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of one metric across every recorded event, in order.
    pub fn series(&self, name: &str) -> Vec<f64> {
        self.events.iter().filter_map(|e| e.metric(name)).collect()
    }

    /// Recorded iteration numbers, in order.
    pub fn iterations(&self) -> Vec<usize> {
        self.events.iter().map(|e| e.iteration).collect()
    }
}

impl IterationObserver for RecordingObserver {
    fn on_start(&mut self, solver: &'static str) {
        self.started.push(solver);
    }

    fn on_iteration(&mut self, event: &IterationEvent<'_>) {
        self.events.push(RecordedEvent {
            solver: event.solver,
            iteration: event.iteration,
            metrics: event.metrics.to_vec(),
        });
    }

    fn on_finish(&mut self, solver: &'static str, iterations: usize) {
        self.finished.push((solver, iterations));
    }
}

/// Largest absolute elementwise difference. Panics on length mismatch.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Assert two scalars agree within `tol`.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

/// Assert two slices agree elementwise within `tol`.
#[track_caller]
pub fn assert_all_close(actual: &[f64], expected: &[f64], tol: f64) {
    let diff = max_abs_diff(actual, expected);
    assert!(
        diff <= tol,
        "max difference {diff} exceeds {tol}\n  actual:   {actual:?}\n  expected: {expected:?}"
    );
}

/// Row sums of a row-major `rows × cols` matrix.
pub fn row_sums(matrix: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    (0..rows)
        .map(|i| matrix[i * cols..(i + 1) * cols].iter().sum())
        .collect()
}

/// Column sums of a row-major `rows × cols` matrix.
pub fn col_sums(matrix: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; cols];
    for i in 0..rows {
        for (j, slot) in out.iter_mut().enumerate() {
            *slot += matrix[i * cols + j];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_captures_events() {
        let mut rec = RecordingObserver::new();
        rec.on_start("s");
        rec.on_iteration(&IterationEvent {
            solver: "s",
            iteration: 4,
            metrics: &[("err", 0.5)],
        });
        rec.on_finish("s", 5);
        assert_eq!(rec.started, vec!["s"]);
        assert_eq!(rec.series("err"), vec![0.5]);
        assert_eq!(rec.iterations(), vec![4]);
        assert_eq!(rec.finished, vec![("s", 5)]);
    }

    #[test]
    fn marginal_sums() {
        let m = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(row_sums(&m, 2, 3), vec![6.0, 15.0]);
        assert_eq!(col_sums(&m, 2, 3), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    #[should_panic(expected = "max difference")]
    fn all_close_reports_difference() {
        assert_all_close(&[1.0, 2.0], &[1.0, 2.5], 0.1);
    }
}
