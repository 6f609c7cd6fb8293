//! Inverse-temperature schedules `beta(t)`.
//!
//! Schedules depend on time alone, never on the total step count, so
//! extending a run leaves every earlier step unchanged.

use crate::error::SdeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Noise temperature as a function of simulated time.
///
/// | String | `beta(t)` |
/// |--------|-----------|
/// | `const:b` | `b` |
/// | `linear:b0:b1:T` | `b0 + (b1 − b0)·t/T`, held at `b1` once `t ≥ T` |
/// | `exp:b0:rate` | `b0·exp(−rate·t)` |
///
/// # Examples
///
/// ```
/// use cairn_sde::BetaSchedule;
///
/// let s: BetaSchedule = "linear:0:1:2".parse().unwrap();
/// assert_eq!(s.at(1.0), 0.5);
/// assert_eq!(s.at(5.0), 1.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BetaSchedule {
    /// Fixed temperature.
    Constant(f64),
    /// Linear ramp from `start` to `end` over `[0, horizon]`.
    Linear {
        /// `beta(0)`.
        start: f64,
        /// `beta(t)` for `t ≥ horizon`.
        end: f64,
        /// Ramp length.
        horizon: f64,
    },
    /// Exponential decay.
    Exponential {
        /// `beta(0)`.
        start: f64,
        /// Decay rate.
        rate: f64,
    },
}

impl Default for BetaSchedule {
    fn default() -> Self {
        Self::Constant(0.02)
    }
}

impl BetaSchedule {
    /// `beta(t)`, never negative.
    pub fn at(&self, t: f64) -> f64 {
        let b = match *self {
            Self::Constant(b) => b,
            Self::Linear {
                start,
                end,
                horizon,
            } => {
                if t >= horizon {
                    end
                } else {
                    start + (end - start) * t / horizon
                }
            }
            Self::Exponential { start, rate } => start * (-rate * t).exp(),
        };
        b.max(0.0)
    }
}

fn number(input: &str, field: &str, name: &str) -> Result<f64, SdeError> {
    let v: f64 = field
        .trim()
        .parse()
        .map_err(|_| SdeError::parse("beta schedule", input, format!("{name} is not a number")))?;
    if !v.is_finite() {
        return Err(SdeError::parse(
            "beta schedule",
            input,
            format!("{name} must be finite"),
        ));
    }
    Ok(v)
}

fn non_negative(input: &str, field: &str, name: &str) -> Result<f64, SdeError> {
    let v = number(input, field, name)?;
    if v < 0.0 {
        return Err(SdeError::parse(
            "beta schedule",
            input,
            format!("{name} must be >= 0"),
        ));
    }
    Ok(v)
}

impl FromStr for BetaSchedule {
    type Err = SdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let arity = |n: usize| {
            if parts.len() == n + 1 {
                Ok(())
            } else {
                Err(SdeError::parse(
                    "beta schedule",
                    s,
                    format!("'{}' takes {n} argument(s)", parts[0]),
                ))
            }
        };
        match parts[0] {
            "const" => {
                arity(1)?;
                Ok(Self::Constant(non_negative(s, parts[1], "beta")?))
            }
            "linear" => {
                arity(3)?;
                let horizon = number(s, parts[3], "horizon")?;
                if horizon <= 0.0 {
                    return Err(SdeError::parse("beta schedule", s, "horizon must be > 0"));
                }
                Ok(Self::Linear {
                    start: non_negative(s, parts[1], "start")?,
                    end: non_negative(s, parts[2], "end")?,
                    horizon,
                })
            }
            "exp" => {
                arity(2)?;
                Ok(Self::Exponential {
                    start: non_negative(s, parts[1], "start")?,
                    rate: number(s, parts[2], "rate")?,
                })
            }
            other => Err(SdeError::parse(
                "beta schedule",
                s,
                format!("unknown kind '{other}'"),
            )),
        }
    }
}

impl fmt::Display for BetaSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(b) => write!(f, "const:{b}"),
            Self::Linear {
                start,
                end,
                horizon,
            } => write!(f, "linear:{start}:{end}:{horizon}"),
            Self::Exponential { start, rate } => write!(f, "exp:{start}:{rate}"),
        }
    }
}

impl TryFrom<String> for BetaSchedule {
    type Error = SdeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BetaSchedule> for String {
    fn from(s: BetaSchedule) -> Self {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_const_two_hundredths() {
        assert_eq!(BetaSchedule::default().at(123.0), 0.02);
        assert_eq!(BetaSchedule::default().to_string(), "const:0.02");
    }

    #[test]
    fn linear_holds_after_horizon() {
        let s: BetaSchedule = "linear:1:0:4".parse().unwrap();
        assert_eq!(s.at(0.0), 1.0);
        assert_eq!(s.at(2.0), 0.5);
        assert_eq!(s.at(4.0), 0.0);
        assert_eq!(s.at(40.0), 0.0);
    }

    #[test]
    fn exponential_decays() {
        let s: BetaSchedule = "exp:2:0.5".parse().unwrap();
        assert_eq!(s.at(0.0), 2.0);
        assert!((s.at(2.0) - 2.0 * (-1.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "const", "const:-1", "const:x", "linear:0:1", "linear:0:1:0", "exp:1", "cosine:1"] {
            assert!(bad.parse::<BetaSchedule>().is_err(), "{bad} parsed");
        }
    }

    #[test]
    fn serde_uses_strings() {
        let s: BetaSchedule = serde_json::from_str("\"exp:1:0.1\"").unwrap();
        assert_eq!(s, BetaSchedule::Exponential { start: 1.0, rate: 0.1 });
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"exp:1:0.1\"");
    }
}
