//! Planar potentials `U(x, y)` whose negative gradient drives particles.
//!
//! Potentials are selected by short strings so job documents stay flat:
//!
//! | String | Potential |
//! |--------|-----------|
//! | `double_well` | `U = (x² − 1)² + y²/2` |
//! | `none` | `U = 0` |
//! | `gmix:w=[..];mu=[..];sigma=[..]` | `U = −log Σ w_k N(x; μ_k, σ_k² I)` |
//!
//! Mixture means are flattened pairs (`mu=[x0,y0,x1,y1,..]`). The
//! component count is the longest of the three lists (means counting
//! pairs); a missing weight defaults to `1/count`, a missing mean to the
//! origin and a missing sigma to [`DEFAULT_COMPONENT_SIGMA`].

use crate::error::SdeError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Sigma given to mixture components that do not specify one.
pub const DEFAULT_COMPONENT_SIGMA: f64 = 0.6;

/// One isotropic Gaussian component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianComponent {
    /// Unnormalized mixture weight.
    pub weight: f64,
    /// Component mean.
    pub mean: [f64; 2],
    /// Per-axis standard deviation.
    pub sigma: f64,
}

/// A weighted sum of isotropic planar Gaussians.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianMixture {
    components: Vec<GaussianComponent>,
}

impl GaussianMixture {
    /// Validate and wrap a component list.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the list is empty, a weight is negative or
    /// non-finite, the weights sum to zero, or a sigma is not positive.
    pub fn new(components: Vec<GaussianComponent>) -> Result<Self, SdeError> {
        if components.is_empty() {
            return Err(SdeError::invalid(
                "components",
                "mixture needs at least one component",
            ));
        }
        let mut total = 0.0;
        for c in &components {
            if !c.weight.is_finite() || c.weight < 0.0 {
                return Err(SdeError::invalid(
                    "weight",
                    format!("must be finite and >= 0, got {}", c.weight),
                ));
            }
            if !c.sigma.is_finite() || c.sigma <= 0.0 {
                return Err(SdeError::invalid(
                    "sigma",
                    format!("must be finite and > 0, got {}", c.sigma),
                ));
            }
            if !c.mean.iter().all(|m| m.is_finite()) {
                return Err(SdeError::invalid("mean", "must be finite"));
            }
            total += c.weight;
        }
        if total <= 0.0 {
            return Err(SdeError::invalid("weight", "weights sum to zero"));
        }
        Ok(Self { components })
    }

    /// The components in declaration order.
    pub fn components(&self) -> &[GaussianComponent] {
        &self.components
    }

    /// `−log p(x, y)` where every component variance is widened by
    /// `extra_variance`.
    pub fn energy(&self, x: f64, y: f64, extra_variance: f64) -> f64 {
        let mut terms = Vec::with_capacity(self.components.len());
        for c in &self.components {
            terms.push(log_component(c, x, y, extra_variance));
        }
        -log_sum_exp(&terms)
    }

    /// `∇(−log p)` at `(x, y)` with widened variances.
    ///
    /// Responsibilities are formed in the log domain, so points far from
    /// every mean still get a finite pull toward the nearest one.
    pub fn energy_gradient(&self, x: f64, y: f64, extra_variance: f64) -> [f64; 2] {
        let mut terms = Vec::with_capacity(self.components.len());
        for c in &self.components {
            terms.push(log_component(c, x, y, extra_variance));
        }
        let norm = log_sum_exp(&terms);
        if !norm.is_finite() {
            return [0.0, 0.0];
        }
        let mut g = [0.0, 0.0];
        for (c, l) in self.components.iter().zip(&terms) {
            let r = (l - norm).exp();
            let var = c.sigma * c.sigma + extra_variance;
            g[0] += r * (x - c.mean[0]) / var;
            g[1] += r * (y - c.mean[1]) / var;
        }
        g
    }

    pub(crate) fn from_fields(
        input: &str,
        weights: &[f64],
        means: &[f64],
        sigmas: &[f64],
    ) -> Result<Self, SdeError> {
        let count = weights.len().max(means.len().div_ceil(2)).max(sigmas.len());
        if count == 0 {
            return Err(SdeError::parse(
                "gaussian mixture",
                input,
                "no components given",
            ));
        }
        let components = (0..count)
            .map(|i| GaussianComponent {
                weight: weights.get(i).copied().unwrap_or(1.0 / count as f64),
                mean: [
                    means.get(2 * i).copied().unwrap_or(0.0),
                    means.get(2 * i + 1).copied().unwrap_or(0.0),
                ],
                sigma: sigmas.get(i).copied().unwrap_or(DEFAULT_COMPONENT_SIGMA),
            })
            .collect();
        Self::new(components).map_err(|e| SdeError::parse("gaussian mixture", input, e.to_string()))
    }

    pub(crate) fn fmt_fields(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w: Vec<f64> = self.components.iter().map(|c| c.weight).collect();
        let mu: Vec<f64> = self.components.iter().flat_map(|c| c.mean).collect();
        let s: Vec<f64> = self.components.iter().map(|c| c.sigma).collect();
        write!(f, "w={};mu={};sigma={}", List(&w), List(&mu), List(&s))
    }
}

fn log_component(c: &GaussianComponent, x: f64, y: f64, extra_variance: f64) -> f64 {
    let var = c.sigma * c.sigma + extra_variance;
    let dx = x - c.mean[0];
    let dy = y - c.mean[1];
    c.weight.ln() - (2.0 * PI * var).ln() - (dx * dx + dy * dy) / (2.0 * var)
}

// Local copy of the Sinkhorn reduction; cairn-sde does not depend on cairn-ot.
fn log_sum_exp(terms: &[f64]) -> f64 {
    let m = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !m.is_finite() {
        return m;
    }
    m + terms.iter().map(|t| (t - m).exp()).sum::<f64>().ln()
}

struct List<'a>(&'a [f64]);

impl fmt::Display for List<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

/// Split `key=[a,b];key2=c` into named lists.
///
/// Entries that fail to parse as finite numbers are dropped. Keys outside
/// `allowed` are rejected.
pub(crate) fn parse_fields<'a>(
    what: &'static str,
    input: &str,
    body: &'a str,
    allowed: &[&str],
) -> Result<Vec<(&'a str, Vec<f64>)>, SdeError> {
    let mut fields = Vec::new();
    for part in body.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        if !allowed.contains(&key) {
            return Err(SdeError::parse(what, input, format!("unknown key '{key}'")));
        }
        let inner = value.strip_prefix('[').unwrap_or(value);
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        let values = inner
            .split(',')
            .filter_map(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .collect();
        fields.push((key, values));
    }
    Ok(fields)
}

/// A planar potential selected by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Potential {
    /// `U = (x² − 1)² + y²/2`: two wells at `(±1, 0)`.
    #[default]
    DoubleWell,
    /// `U = 0`: pure diffusion.
    None,
    /// `U = −log` of a Gaussian mixture density.
    GaussianMixture(GaussianMixture),
}

impl Potential {
    /// `U(x, y)`.
    pub fn value(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::DoubleWell => {
                let a = x * x - 1.0;
                a * a + 0.5 * y * y
            }
            Self::None => 0.0,
            Self::GaussianMixture(m) => m.energy(x, y, 0.0),
        }
    }

    /// `∇U(x, y)`.
    pub fn gradient(&self, x: f64, y: f64) -> [f64; 2] {
        match self {
            Self::DoubleWell => [4.0 * x * (x * x - 1.0), y],
            Self::None => [0.0, 0.0],
            Self::GaussianMixture(m) => m.energy_gradient(x, y, 0.0),
        }
    }
}

impl FromStr for Potential {
    type Err = SdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.is_empty() || t == "double_well" {
            return Ok(Self::DoubleWell);
        }
        if t == "none" {
            return Ok(Self::None);
        }
        if let Some(body) = t.strip_prefix("gmix:") {
            let mut weights = Vec::new();
            let mut means = Vec::new();
            let mut sigmas = Vec::new();
            let allowed = ["w", "weights", "mu", "mean", "sigma"];
            for (key, values) in parse_fields("potential", s, body, &allowed)? {
                match key {
                    "w" | "weights" => weights = values,
                    "mu" | "mean" => means = values,
                    _ => sigmas = values,
                }
            }
            return GaussianMixture::from_fields(s, &weights, &means, &sigmas)
                .map(Self::GaussianMixture);
        }
        Err(SdeError::parse(
            "potential",
            s,
            "expected 'double_well', 'none' or 'gmix:...'",
        ))
    }
}

impl fmt::Display for Potential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoubleWell => f.write_str("double_well"),
            Self::None => f.write_str("none"),
            Self::GaussianMixture(m) => {
                f.write_str("gmix:")?;
                m.fmt_fields(f)
            }
        }
    }
}

impl TryFrom<String> for Potential {
    type Error = SdeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Potential> for String {
    fn from(p: Potential) -> Self {
        p.to_string()
    }
}
