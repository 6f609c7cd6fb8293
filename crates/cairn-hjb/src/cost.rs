//! Running and terminal cost models.
//!
//! Weight vectors are applied entry-by-entry up to the shorter of the
//! weight vector and the state (or control), so a planar goal weight
//! `[1, 1]` can be reused for a Dubins state `(x, y, θ)` without weighting
//! the heading.

use crate::error::HjbError;
use serde::{Deserialize, Serialize};

/// Quadratic tracking cost:
/// `stage(x, u) = Σ wᵢ(xᵢ − goalᵢ)² + Σ rᵢuᵢ²`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuadraticCost {
    /// State weights `w`.
    pub state_weights: Vec<f64>,
    /// Control weights `r`.
    pub control_weights: Vec<f64>,
    /// Goal state; missing entries are zero.
    pub goal: Vec<f64>,
    /// Optional terminal weights; when set,
    /// `terminal(x) = Σ tᵢ(xᵢ − goalᵢ)²`.
    pub terminal_weights: Option<Vec<f64>>,
}

impl Default for QuadraticCost {
    fn default() -> Self {
        Self {
            state_weights: vec![1.0, 1.0],
            control_weights: vec![1.0, 1.0],
            goal: Vec::new(),
            terminal_weights: None,
        }
    }
}

impl QuadraticCost {
    /// Quadratic cost with the given weights and goal, no terminal term.
    pub fn new(state_weights: Vec<f64>, control_weights: Vec<f64>, goal: Vec<f64>) -> Self {
        Self {
            state_weights,
            control_weights,
            goal,
            terminal_weights: None,
        }
    }

    /// Add terminal weights.
    pub fn with_terminal_weights(mut self, weights: Vec<f64>) -> Self {
        self.terminal_weights = Some(weights);
        self
    }

    fn tracking(&self, weights: &[f64], state: &[f64]) -> f64 {
        weights
            .iter()
            .zip(state)
            .enumerate()
            .map(|(i, (&w, &x))| {
                let g = self.goal.get(i).copied().unwrap_or(0.0);
                w * (x - g) * (x - g)
            })
            .sum()
    }

    fn stage(&self, state: &[f64], control: &[f64]) -> f64 {
        let effort: f64 = self
            .control_weights
            .iter()
            .zip(control)
            .map(|(&r, &u)| r * u * u)
            .sum();
        self.tracking(&self.state_weights, state) + effort
    }

    fn terminal(&self, state: &[f64]) -> Option<f64> {
        self.terminal_weights
            .as_ref()
            .map(|w| self.tracking(w, state))
    }

    fn validate(&self) -> Result<(), HjbError> {
        let weights = self
            .state_weights
            .iter()
            .chain(&self.control_weights)
            .chain(self.terminal_weights.iter().flatten());
        for &w in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(HjbError::invalid(
                    "weights",
                    format!("cost weights must be finite and >= 0, got {w}"),
                ));
            }
        }
        if let Some(g) = self.goal.iter().find(|g| !g.is_finite()) {
            return Err(HjbError::invalid("goal", format!("must be finite, got {g}")));
        }
        Ok(())
    }
}

/// A spherical soft obstacle.
///
/// Contributes `weight · max(0, radius − ‖x − center‖)²`, zero outside
/// the radius. Distance is measured over the first `center.len()` state
/// entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Obstacle centre.
    pub center: Vec<f64>,
    /// Influence radius.
    pub radius: f64,
    /// Penalty weight.
    pub weight: f64,
}

impl Obstacle {
    /// Soft penalty at `state`.
    pub fn penalty(&self, state: &[f64]) -> f64 {
        let dist = self
            .center
            .iter()
            .zip(state)
            .map(|(&c, &x)| (x - c) * (x - c))
            .sum::<f64>()
            .sqrt();
        let depth = (self.radius - dist).max(0.0);
        self.weight * depth * depth
    }
}

/// A quadratic cost plus a set of soft obstacles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleCost {
    /// The underlying quadratic cost.
    #[serde(flatten)]
    pub base: QuadraticCost,
    /// Obstacles; penalties are summed.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleCost {
    fn penalty(&self, state: &[f64]) -> f64 {
        self.obstacles.iter().map(|o| o.penalty(state)).sum()
    }
}

/// Cost model, tagged in configuration as `quadratic` or
/// `quadratic_with_obstacles`.
///
/// # Examples
///
/// ```
/// use cairn_hjb::{Cost, Obstacle, QuadraticCost};
///
/// let base = QuadraticCost::new(vec![1.0, 1.0], vec![0.0, 0.0], vec![0.0, 0.0]);
/// let cost = Cost::quadratic(base).with_obstacles(vec![Obstacle {
///     center: vec![2.0, 0.0],
///     radius: 1.0,
///     weight: 10.0,
/// }]);
/// // Inside the obstacle: 1.5² tracking + 10 · 0.5² penalty.
/// assert!((cost.stage(&[1.5, 0.0], &[0.0, 0.0]) - (2.25 + 2.5)).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cost {
    /// Plain quadratic cost.
    Quadratic(QuadraticCost),
    /// Quadratic cost plus obstacle penalties.
    QuadraticWithObstacles(ObstacleCost),
}

impl Cost {
    /// Wrap a quadratic cost.
    pub fn quadratic(base: QuadraticCost) -> Self {
        Self::Quadratic(base)
    }

    /// Add obstacles to this cost, keeping any already present.
    pub fn with_obstacles(self, obstacles: Vec<Obstacle>) -> Self {
        match self {
            Self::Quadratic(base) => Self::QuadraticWithObstacles(ObstacleCost { base, obstacles }),
            Self::QuadraticWithObstacles(mut c) => {
                c.obstacles.extend(obstacles);
                Self::QuadraticWithObstacles(c)
            }
        }
    }

    /// The quadratic part of the cost.
    pub fn base(&self) -> &QuadraticCost {
        match self {
            Self::Quadratic(base) => base,
            Self::QuadraticWithObstacles(c) => &c.base,
        }
    }

    /// Running cost rate at `(state, control)`.
    pub fn stage(&self, state: &[f64], control: &[f64]) -> f64 {
        match self {
            Self::Quadratic(base) => base.stage(state, control),
            Self::QuadraticWithObstacles(c) => c.base.stage(state, control) + c.penalty(state),
        }
    }

    /// Terminal cost, if the model defines one.
    pub fn terminal(&self, state: &[f64]) -> Option<f64> {
        match self {
            Self::Quadratic(base) => base.terminal(state),
            Self::QuadraticWithObstacles(c) => c.base.terminal(state).map(|t| t + c.penalty(state)),
        }
    }

    /// Check weights, goal and obstacles are well formed.
    pub fn validate(&self) -> Result<(), HjbError> {
        self.base().validate()?;
        if let Self::QuadraticWithObstacles(c) = self {
            for o in &c.obstacles {
                if !o.radius.is_finite() || o.radius < 0.0 {
                    return Err(HjbError::invalid(
                        "obstacles",
                        format!("radius must be finite and >= 0, got {}", o.radius),
                    ));
                }
                if !o.weight.is_finite() || o.weight < 0.0 {
                    return Err(HjbError::invalid(
                        "obstacles",
                        format!("weight must be finite and >= 0, got {}", o.weight),
                    ));
                }
                if o.center.iter().any(|c| !c.is_finite()) {
                    return Err(HjbError::invalid("obstacles", "center must be finite"));
                }
            }
        }
        Ok(())
    }
}
