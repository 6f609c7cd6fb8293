//! Solver-independent convergence summaries serialized as JSON.

use crate::error::ExportError;
use cairn_hjb::{MdpSolution, PdeOutcome, ResidualRecord, StationaryResult, TimeDependentResult};
use cairn_ot::SinkhornResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One checkpoint of a convergence history.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Iteration (or step) number.
    pub iteration: usize,
    /// Residual for HJB, marginal error for Sinkhorn.
    pub residual: f64,
    /// Sinkhorn `|primal − dual|`; absent for HJB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_gap: Option<f64>,
}

/// The diagnostics document written next to every solver artifact.
///
/// ```json
/// {"solver": "ot.sinkhorn", "iterations": 120, "converged": true,
///  "final_residual": 0.0004, "history": [...], "metrics": {...}}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsDoc {
    /// Solver label, matching the one reported to observers.
    pub solver: String,
    /// Iterations or steps performed.
    pub iterations: usize,
    /// Whether the stopping criterion was met.
    pub converged: bool,
    /// Last residual (HJB) or marginal error (Sinkhorn).
    pub final_residual: f64,
    /// Checkpoints in iteration order.
    pub history: Vec<HistoryEntry>,
    /// Solver-specific scalars, in insertion order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metrics: IndexMap<String, f64>,
}

fn residual_history(history: &[ResidualRecord]) -> Vec<HistoryEntry> {
    history
        .iter()
        .map(|r| HistoryEntry {
            iteration: r.iteration,
            residual: r.residual,
            dual_gap: None,
        })
        .collect()
}

impl DiagnosticsDoc {
    /// Summary of a stationary HJB solve.
    pub fn from_stationary(result: &StationaryResult) -> Self {
        let mut metrics = IndexMap::new();
        metrics.insert("dt".to_string(), result.dt);
        Self {
            solver: "hjb.stationary".to_string(),
            iterations: result.iterations,
            converged: result.converged,
            final_residual: result.residual,
            history: residual_history(&result.history),
            metrics,
        }
    }

    /// Summary of a finite-horizon HJB solve; always converged.
    pub fn from_time_dependent(result: &TimeDependentResult) -> Self {
        let mut metrics = IndexMap::new();
        metrics.insert("time_step".to_string(), result.time_step);
        Self {
            solver: "hjb.time_dependent".to_string(),
            iterations: result.steps,
            converged: true,
            final_residual: result.residual,
            history: residual_history(&result.history),
            metrics,
        }
    }

    /// Summary of a [`PdeConfig::run`](cairn_hjb::PdeConfig::run).
    pub fn from_pde(outcome: &PdeOutcome) -> Self {
        Self {
            solver: outcome.solver.to_string(),
            iterations: outcome.iterations,
            converged: outcome.converged,
            final_residual: outcome.residual,
            history: residual_history(&outcome.history),
            metrics: IndexMap::new(),
        }
    }

    /// Summary of discrete value iteration. No history is kept.
    pub fn from_mdp(solution: &MdpSolution) -> Self {
        let mut metrics = IndexMap::new();
        metrics.insert("actions".to_string(), solution.lattice.len() as f64);
        metrics.insert("ties".to_string(), solution.policy.ties as f64);
        Self {
            solver: "hjb.mdp".to_string(),
            iterations: solution.iterations,
            converged: solution.converged,
            final_residual: solution.residual,
            history: Vec::new(),
            metrics,
        }
    }

    /// Summary of a Sinkhorn solve, with the final primal/dual breakdown.
    pub fn from_sinkhorn(result: &SinkhornResult) -> Self {
        let d = &result.diagnostics;
        let metrics = [
            ("transport_cost", d.transport_cost),
            ("entropy", d.entropy),
            ("primal", d.primal),
            ("dual", d.dual),
            ("dual_gap", d.dual_gap),
            ("row_error", d.row_error),
            ("col_error", d.col_error),
            ("mass", d.mass),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            solver: "ot.sinkhorn".to_string(),
            iterations: result.iterations,
            converged: result.converged,
            final_residual: d.marginal_error,
            history: result
                .history
                .iter()
                .map(|h| HistoryEntry {
                    iteration: h.iteration,
                    residual: h.marginal_error,
                    dual_gap: Some(h.dual_gap),
                })
                .collect(),
            metrics,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write as JSON to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.write_all(b"\n")?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_ot::{log_sinkhorn, SinkhornConfig};

    fn sinkhorn() -> SinkhornResult {
        let config = SinkhornConfig::new(0.5);
        log_sinkhorn(&[0.5, 0.5], &[0.5, 0.5], &[0.0, 1.0, 1.0, 0.0], 2, 2, &config).unwrap()
    }

    #[test]
    fn sinkhorn_history_carries_dual_gap() {
        let r = sinkhorn();
        let doc = DiagnosticsDoc::from_sinkhorn(&r);
        assert_eq!(doc.solver, "ot.sinkhorn");
        assert_eq!(doc.iterations, r.iterations);
        assert_eq!(doc.history.len(), r.history.len());
        assert!(doc.history.iter().all(|h| h.dual_gap.is_some()));
        assert_eq!(doc.final_residual, r.diagnostics.marginal_error);
        let keys: Vec<&str> = doc.metrics.keys().map(String::as_str).collect();
        assert_eq!(keys[0], "transport_cost");
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn json_uses_snake_case_and_round_trips() {
        let doc = DiagnosticsDoc::from_sinkhorn(&sinkhorn());
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"final_residual\""));
        assert!(json.contains("\"dual_gap\""));
        let back = DiagnosticsDoc::from_json(&json).unwrap();
        assert_eq!(back.solver, doc.solver);
        assert_eq!(back.iterations, doc.iterations);
        assert_eq!(back.history.len(), doc.history.len());
        assert_eq!(back.metrics.len(), doc.metrics.len());
        assert!((back.final_residual - doc.final_residual).abs() <= 1e-12);
    }

    #[test]
    fn residual_entries_omit_dual_gap() {
        let doc = DiagnosticsDoc {
            solver: "hjb.stationary".into(),
            iterations: 2,
            converged: true,
            final_residual: 0.0,
            history: residual_history(&[
                ResidualRecord {
                    iteration: 0,
                    residual: 0.5,
                },
                ResidualRecord {
                    iteration: 1,
                    residual: 0.0,
                },
            ]),
            metrics: IndexMap::new(),
        };
        let json = doc.to_json().unwrap();
        assert!(!json.contains("dual_gap"));
        assert!(!json.contains("metrics"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["history"][0]["residual"], 0.5);
    }
}
