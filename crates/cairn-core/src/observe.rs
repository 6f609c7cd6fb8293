//! Optional instrumentation hooks for solver iteration loops.
//!
//! Every solver drives an [`IterationObserver`]. The default is
//! [`NoopObserver`]; observers only ever receive read-only events, so
//! attaching one never changes iteration order, results, or termination.

/// A single progress event emitted from inside a solver loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationEvent<'a> {
    /// Short solver label, e.g. `"hjb.stationary"` or `"ot.sinkhorn"`.
    pub solver: &'static str,
    /// Zero-based iteration (sweep, check, or step) number.
    pub iteration: usize,
    /// Named scalar diagnostics for this iteration.
    pub metrics: &'a [(&'static str, f64)],
}

impl IterationEvent<'_> {
    /// Look up a metric by name.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(k, _)| *k == name)
            .map(|&(_, v)| v)
    }
}

/// Receives progress events from solver loops.
///
/// All methods default to doing nothing.
pub trait IterationObserver {
    /// Called once before the first iteration.
    fn on_start(&mut self, _solver: &'static str) {}

    /// Called after each iteration the solver chooses to report.
    fn on_iteration(&mut self, _event: &IterationEvent<'_>) {}

    /// Called once after the loop exits.
    fn on_finish(&mut self, _solver: &'static str, _iterations: usize) {}
}

/// Observer that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl IterationObserver for NoopObserver {}

impl<T: IterationObserver + ?Sized> IterationObserver for &mut T {
    fn on_start(&mut self, solver: &'static str) {
        (**self).on_start(solver);
    }

    fn on_iteration(&mut self, event: &IterationEvent<'_>) {
        (**self).on_iteration(event);
    }

    fn on_finish(&mut self, solver: &'static str, iterations: usize) {
        (**self).on_finish(solver, iterations);
    }
}
