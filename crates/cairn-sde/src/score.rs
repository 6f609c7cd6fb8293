//! Annealed score drift for a Gaussian-mixture target.
//!
//! The drift at time `t` is `∇ log p_s(x)`, where `p_s` is the target
//! mixture with every component variance widened by `s(t)²` and
//!
//! ```text
//! s(t) = sigma_min + (sigma_max − sigma_min)·exp(−t / tau)
//! ```
//!
//! Early on the target is blurred into a single broad bump; as `s(t)`
//! decays the drift sharpens onto the individual modes.

use crate::error::SdeError;
use crate::potential::{parse_fields, GaussianMixture};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default starting noise level.
pub const DEFAULT_SIGMA_MAX: f64 = 1.0;
/// Default final noise level.
pub const DEFAULT_SIGMA_MIN: f64 = 0.05;
/// Default decay time constant.
pub const DEFAULT_TAU: f64 = 1.0;

/// Score of a mixture under a decaying noise level.
///
/// Parsed from `anneal:w=[..];mu=[..];sigma=[..];smax=..;smin=..;tau=..`;
/// the mixture keys follow the `gmix:` rules of
/// [`Potential`](crate::Potential).
///
/// # Examples
///
/// ```
/// use cairn_sde::AnnealedScore;
///
/// let s: AnnealedScore = "anneal:mu=[1,0];smax=2;smin=0.1;tau=0.5".parse().unwrap();
/// assert!((s.noise_level(0.0) - 2.0).abs() < 1e-12);
/// assert!((s.noise_level(100.0) - 0.1).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnnealedScore {
    target: GaussianMixture,
    sigma_max: f64,
    sigma_min: f64,
    tau: f64,
}

impl AnnealedScore {
    /// Build from a target and a noise schedule.
    ///
    /// # Errors
    ///
    /// Returns `Err` unless `0 <= sigma_min <= sigma_max` and `tau > 0`,
    /// all finite.
    pub fn new(
        target: GaussianMixture,
        sigma_max: f64,
        sigma_min: f64,
        tau: f64,
    ) -> Result<Self, SdeError> {
        if !sigma_min.is_finite() || sigma_min < 0.0 {
            return Err(SdeError::invalid(
                "smin",
                format!("must be finite and >= 0, got {sigma_min}"),
            ));
        }
        if !sigma_max.is_finite() || sigma_max < sigma_min {
            return Err(SdeError::invalid(
                "smax",
                format!("must be finite and >= smin, got {sigma_max}"),
            ));
        }
        if !tau.is_finite() || tau <= 0.0 {
            return Err(SdeError::invalid(
                "tau",
                format!("must be finite and > 0, got {tau}"),
            ));
        }
        Ok(Self {
            target,
            sigma_max,
            sigma_min,
            tau,
        })
    }

    /// The undiffused target.
    pub fn target(&self) -> &GaussianMixture {
        &self.target
    }

    /// `s(t)`.
    pub fn noise_level(&self, t: f64) -> f64 {
        self.sigma_min + (self.sigma_max - self.sigma_min) * (-t / self.tau).exp()
    }

    /// `∇ log p_s(x, y)` at time `t`.
    pub fn score(&self, x: f64, y: f64, t: f64) -> [f64; 2] {
        let s = self.noise_level(t);
        let g = self.target.energy_gradient(x, y, s * s);
        [-g[0], -g[1]]
    }
}

impl FromStr for AnnealedScore {
    type Err = SdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(body) = s.trim().strip_prefix("anneal:") else {
            return Err(SdeError::parse("score", s, "expected 'anneal:...'"));
        };
        let allowed = ["w", "weights", "mu", "mean", "sigma", "smax", "smin", "tau"];
        let mut weights = Vec::new();
        let mut means = Vec::new();
        let mut sigmas = Vec::new();
        let mut sigma_max = DEFAULT_SIGMA_MAX;
        let mut sigma_min = DEFAULT_SIGMA_MIN;
        let mut tau = DEFAULT_TAU;
        for (key, values) in parse_fields("score", s, body, &allowed)? {
            let scalar = || {
                values
                    .first()
                    .copied()
                    .ok_or_else(|| SdeError::parse("score", s, format!("'{key}' needs a number")))
            };
            match key {
                "w" | "weights" => weights = values.clone(),
                "mu" | "mean" => means = values.clone(),
                "sigma" => sigmas = values.clone(),
                "smax" => sigma_max = scalar()?,
                "smin" => sigma_min = scalar()?,
                _ => tau = scalar()?,
            }
        }
        let target = GaussianMixture::from_fields(s, &weights, &means, &sigmas)?;
        Self::new(target, sigma_max, sigma_min, tau)
            .map_err(|e| SdeError::parse("score", s, e.to_string()))
    }
}

impl fmt::Display for AnnealedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("anneal:")?;
        self.target.fmt_fields(f)?;
        write!(
            f,
            ";smax={};smin={};tau={}",
            self.sigma_max, self.sigma_min, self.tau
        )
    }
}

impl TryFrom<String> for AnnealedScore {
    type Error = SdeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AnnealedScore> for String {
    fn from(s: AnnealedScore) -> Self {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let s: AnnealedScore = "anneal:mu=[1,0,-1,0]".parse().unwrap();
        assert!((s.noise_level(0.0) - DEFAULT_SIGMA_MAX).abs() < 1e-12);
        assert_eq!(s.target().components().len(), 2);
    }

    #[test]
    fn score_points_toward_single_mode() {
        let s: AnnealedScore = "anneal:mu=[1,-1];sigma=[0.5]".parse().unwrap();
        let g = s.score(0.0, 0.0, 0.0);
        assert!(g[0] > 0.0);
        assert!(g[1] < 0.0);
    }

    #[test]
    fn score_sharpens_over_time() {
        let s: AnnealedScore = "anneal:mu=[0,0];sigma=[0.2];smax=2;smin=0.01"
            .parse()
            .unwrap();
        let early = s.score(1.0, 0.0, 0.0)[0].abs();
        let late = s.score(1.0, 0.0, 50.0)[0].abs();
        assert!(late > early, "late {late} vs early {early}");
    }

    #[test]
    fn rejects_bad_schedules() {
        assert!("anneal:mu=[0,0];smax=0.01;smin=0.1".parse::<AnnealedScore>().is_err());
        assert!("anneal:mu=[0,0];tau=0".parse::<AnnealedScore>().is_err());
        assert!("anneal:mu=[0,0];tau=[]".parse::<AnnealedScore>().is_err());
        assert!("gmix:mu=[0,0]".parse::<AnnealedScore>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let text = "anneal:w=[1];mu=[0.5,0];sigma=[0.3];smax=1.5;smin=0.1;tau=2";
        let s: AnnealedScore = text.parse().unwrap();
        assert_eq!(s.to_string(), text);
        let back: AnnealedScore = s.to_string().parse().unwrap();
        assert_eq!(back, s);
    }
}
