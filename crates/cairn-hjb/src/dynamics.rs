//! State-transition models consumed by the HJB solvers.
//!
//! [`Dynamics`] is a closed set of models, selected in configuration by a
//! `"type"` tag (`single_integrator`, `double_integrator`, `dubins`).
//! Unknown tags fail at deserialization.

use crate::error::HjbError;
use cairn_core::Point;
use serde::{Deserialize, Serialize};

/// First-order model: the control is the velocity, `ẋ = u`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SingleIntegrator {
    /// State (and control) dimension.
    pub dimension: usize,
    /// Symmetric control bound, `u ∈ [-limit, limit]` per axis.
    pub control_limit: f64,
    /// Lattice step used when enumerating candidate controls.
    pub control_resolution: f64,
}

impl Default for SingleIntegrator {
    fn default() -> Self {
        Self {
            dimension: 2,
            control_limit: 3.0,
            control_resolution: 0.5,
        }
    }
}

/// Second-order model with linear damping.
///
/// State is `(position, velocity)`, each of `dimension` entries;
/// `d/dt (p, v) = (v, u - damping·v)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DoubleIntegrator {
    /// Position dimension; the state has twice as many entries.
    pub dimension: usize,
    /// Symmetric acceleration bound per axis.
    pub control_limit: f64,
    /// Linear velocity damping coefficient.
    pub damping: f64,
    /// Lattice step used when enumerating candidate controls.
    pub control_resolution: f64,
}

impl Default for DoubleIntegrator {
    fn default() -> Self {
        Self {
            dimension: 2,
            control_limit: 3.0,
            damping: 0.2,
            control_resolution: 0.5,
        }
    }
}

/// Planar car with constant forward speed and bounded turn rate.
///
/// State `(x, y, θ)`; control `u ∈ [-1, 1]` scales the turn rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DubinsCar {
    /// Forward speed.
    pub speed: f64,
    /// Maximum heading rate.
    pub turn_rate: f64,
    /// Lattice step used when enumerating candidate controls.
    pub control_resolution: f64,
}

impl Default for DubinsCar {
    fn default() -> Self {
        Self {
            speed: 1.0,
            turn_rate: 1.0,
            control_resolution: 0.25,
        }
    }
}

/// A controlled dynamical system `ẋ = f(x, u)`.
///
/// # Examples
///
/// ```
/// use cairn_hjb::Dynamics;
///
/// let dubins = Dynamics::dubins(2.0, 0.5, 0.25).unwrap();
/// let f = dubins.derivative(&[0.0, 0.0, 0.0], &[1.0]);
/// assert_eq!(f.as_slice(), &[2.0, 0.0, 0.5]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dynamics {
    /// See [`SingleIntegrator`].
    SingleIntegrator(SingleIntegrator),
    /// See [`DoubleIntegrator`].
    DoubleIntegrator(DoubleIntegrator),
    /// See [`DubinsCar`].
    Dubins(DubinsCar),
}

impl Dynamics {
    /// Build and validate a single integrator.
    pub fn single_integrator(
        dimension: usize,
        control_limit: f64,
        control_resolution: f64,
    ) -> Result<Self, HjbError> {
        let d = Self::SingleIntegrator(SingleIntegrator {
            dimension,
            control_limit,
            control_resolution,
        });
        d.validate()?;
        Ok(d)
    }

    /// Build and validate a damped double integrator.
    pub fn double_integrator(
        dimension: usize,
        control_limit: f64,
        damping: f64,
        control_resolution: f64,
    ) -> Result<Self, HjbError> {
        let d = Self::DoubleIntegrator(DoubleIntegrator {
            dimension,
            control_limit,
            damping,
            control_resolution,
        });
        d.validate()?;
        Ok(d)
    }

    /// Build and validate a Dubins car.
    pub fn dubins(speed: f64, turn_rate: f64, control_resolution: f64) -> Result<Self, HjbError> {
        let d = Self::Dubins(DubinsCar {
            speed,
            turn_rate,
            control_resolution,
        });
        d.validate()?;
        Ok(d)
    }

    /// Check every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a dimension is zero, a limit, speed, rate or damping
    /// is negative or non-finite, or the control resolution is not positive.
    pub fn validate(&self) -> Result<(), HjbError> {
        fn non_negative(name: &'static str, v: f64) -> Result<(), HjbError> {
            if !v.is_finite() || v < 0.0 {
                return Err(HjbError::invalid(
                    name,
                    format!("must be finite and >= 0, got {v}"),
                ));
            }
            Ok(())
        }

        match self {
            Self::SingleIntegrator(s) => {
                if s.dimension == 0 {
                    return Err(HjbError::invalid("dimension", "must be at least 1"));
                }
                non_negative("controlLimit", s.control_limit)?;
            }
            Self::DoubleIntegrator(s) => {
                if s.dimension == 0 {
                    return Err(HjbError::invalid("dimension", "must be at least 1"));
                }
                non_negative("controlLimit", s.control_limit)?;
                non_negative("damping", s.damping)?;
            }
            Self::Dubins(s) => {
                non_negative("speed", s.speed)?;
                non_negative("turnRate", s.turn_rate)?;
            }
        }

        let res = self.control_resolution();
        if !res.is_finite() || res <= 0.0 {
            return Err(HjbError::invalid(
                "controlResolution",
                format!("must be finite and > 0, got {res}"),
            ));
        }
        Ok(())
    }

    /// Model name as used in configuration tags.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleIntegrator(_) => "single_integrator",
            Self::DoubleIntegrator(_) => "double_integrator",
            Self::Dubins(_) => "dubins",
        }
    }

    /// Number of state entries.
    pub fn state_dim(&self) -> usize {
        match self {
            Self::SingleIntegrator(s) => s.dimension,
            Self::DoubleIntegrator(s) => 2 * s.dimension,
            Self::Dubins(_) => 3,
        }
    }

    /// Number of control entries.
    pub fn control_dim(&self) -> usize {
        match self {
            Self::SingleIntegrator(s) => s.dimension,
            Self::DoubleIntegrator(s) => s.dimension,
            Self::Dubins(_) => 1,
        }
    }

    /// Per-axis `(min, max)` control bounds.
    pub fn control_bounds(&self) -> Vec<(f64, f64)> {
        match self {
            Self::SingleIntegrator(s) => vec![(-s.control_limit, s.control_limit); s.dimension],
            Self::DoubleIntegrator(s) => vec![(-s.control_limit, s.control_limit); s.dimension],
            Self::Dubins(_) => vec![(-1.0, 1.0)],
        }
    }

    /// Lattice step for candidate controls.
    pub fn control_resolution(&self) -> f64 {
        match self {
            Self::SingleIntegrator(s) => s.control_resolution,
            Self::DoubleIntegrator(s) => s.control_resolution,
            Self::Dubins(s) => s.control_resolution,
        }
    }

    /// Write `f(state, control)` into `out`.
    ///
    /// `state` must have [`state_dim`](Self::state_dim) entries, `control`
    /// [`control_dim`](Self::control_dim) entries, and `out` `state_dim`
    /// entries. Callers inside this crate guarantee this; it is not
    /// re-checked per call.
    pub fn evaluate(&self, state: &[f64], control: &[f64], out: &mut [f64]) {
        match self {
            Self::SingleIntegrator(s) => {
                out[..s.dimension].copy_from_slice(&control[..s.dimension]);
            }
            Self::DoubleIntegrator(s) => {
                let n = s.dimension;
                for i in 0..n {
                    let v = state[n + i];
                    out[i] = v;
                    out[n + i] = control[i] - s.damping * v;
                }
            }
            Self::Dubins(s) => {
                let theta = state[2];
                out[0] = s.speed * theta.cos();
                out[1] = s.speed * theta.sin();
                out[2] = s.turn_rate * control[0];
            }
        }
    }

    /// Allocating form of [`evaluate`](Self::evaluate).
    pub fn derivative(&self, state: &[f64], control: &[f64]) -> Point {
        let mut out: Point = smallvec::smallvec![0.0; self.state_dim()];
        self.evaluate(state, control, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_integrator_passes_control_through() {
        let d = Dynamics::single_integrator(2, 3.0, 0.5).unwrap();
        assert_eq!(d.state_dim(), 2);
        assert_eq!(d.control_dim(), 2);
        assert_eq!(d.derivative(&[5.0, 5.0], &[1.0, -2.0]).as_slice(), &[1.0, -2.0]);
    }

    #[test]
    fn double_integrator_applies_damping() {
        let d = Dynamics::double_integrator(1, 2.0, 0.5, 0.5).unwrap();
        assert_eq!(d.state_dim(), 2);
        assert_eq!(d.control_dim(), 1);
        let f = d.derivative(&[3.0, 2.0], &[1.0]);
        assert_eq!(f.as_slice(), &[2.0, 0.0]);
    }

    #[test]
    fn dubins_heading() {
        let d = Dynamics::dubins(1.0, 2.0, 0.25).unwrap();
        let f = d.derivative(&[0.0, 0.0, std::f64::consts::FRAC_PI_2], &[-0.5]);
        assert!(f[0].abs() < 1e-12);
        assert!((f[1] - 1.0).abs() < 1e-12);
        assert_eq!(f[2], -1.0);
        assert_eq!(d.control_bounds(), vec![(-1.0, 1.0)]);
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        assert!(Dynamics::single_integrator(0, 1.0, 0.5).is_err());
        assert!(Dynamics::single_integrator(2, -1.0, 0.5).is_err());
        assert!(Dynamics::single_integrator(2, 1.0, 0.0).is_err());
        assert!(Dynamics::double_integrator(1, 1.0, f64::NAN, 0.5).is_err());
        assert!(Dynamics::dubins(-1.0, 1.0, 0.25).is_err());
    }

    #[test]
    fn deserializes_tagged_with_defaults() {
        let d: Dynamics = serde_json::from_str(r#"{"type":"dubins","speed":2.0}"#).unwrap();
        assert_eq!(
            d,
            Dynamics::Dubins(DubinsCar {
                speed: 2.0,
                turn_rate: 1.0,
                control_resolution: 0.25,
            })
        );
        let d: Dynamics =
            serde_json::from_str(r#"{"type":"single_integrator","controlLimit":1.5}"#).unwrap();
        assert_eq!(d.control_bounds(), vec![(-1.5, 1.5); 2]);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = serde_json::from_str::<Dynamics>(r#"{"type":"unicycle"}"#).unwrap_err();
        assert!(err.to_string().contains("unicycle"));
    }
}
