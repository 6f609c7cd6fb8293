//! Weighted point clouds as exchanged in JSON documents.

use crate::error::SinkhornError;
use serde::{Deserialize, Serialize};

/// A discrete distribution: `points[i]` carries mass `weights[i]`.
///
/// The JSON form is `{"points": [[x, y], ...], "weights": [w, ...]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Support points, all of the same dimension.
    pub points: Vec<Vec<f64>>,
    /// Mass per point.
    pub weights: Vec<f64>,
}

impl Distribution {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, SinkhornError> {
        let d: Self = serde_json::from_str(json)?;
        d.validate()?;
        Ok(d)
    }

    /// Check lengths agree, points share a dimension and weights are
    /// finite and non-negative.
    pub fn validate(&self) -> Result<(), SinkhornError> {
        if self.points.is_empty() {
            return Err(SinkhornError::Empty { what: "points" });
        }
        if self.weights.len() != self.points.len() {
            return Err(SinkhornError::DimensionMismatch {
                what: "weights vs points",
                expected: self.points.len(),
                found: self.weights.len(),
            });
        }
        let dim = self.dim();
        if dim == 0 {
            return Err(SinkhornError::invalid("points", "points must have at least one coordinate"));
        }
        if let Some(p) = self.points.iter().find(|p| p.len() != dim) {
            return Err(SinkhornError::DimensionMismatch {
                what: "point dimension",
                expected: dim,
                found: p.len(),
            });
        }
        if let Some(w) = self.weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(SinkhornError::invalid(
                "weights",
                format!("must be finite and >= 0, got {w}"),
            ));
        }
        Ok(())
    }

    /// Number of support points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if there are no support points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Dimension of the first point (0 if empty).
    pub fn dim(&self) -> usize {
        self.points.first().map_or(0, Vec::len)
    }

    /// Points flattened row-major.
    pub fn flat_points(&self) -> Vec<f64> {
        self.points.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_flattens() {
        let d = Distribution::from_json(r#"{"points": [[0, 1], [2, 3]], "weights": [0.5, 0.5]}"#)
            .unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.dim(), 2);
        assert_eq!(d.flat_points(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_inconsistent_documents() {
        assert!(Distribution::from_json(r#"{"points": [[0], [1]], "weights": [1]}"#).is_err());
        assert!(Distribution::from_json(r#"{"points": [[0], [1, 2]], "weights": [1, 1]}"#).is_err());
        assert!(Distribution::from_json(r#"{"points": [[0]], "weights": [-1]}"#).is_err());
        assert!(matches!(
            Distribution::from_json("{"),
            Err(SinkhornError::Config { .. })
        ));
    }
}
