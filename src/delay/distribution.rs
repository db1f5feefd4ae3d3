//! Discretized delay distributions.
//!
//! A `DelayDistribution` is a per-day probability mass array indexed by day
//! offset. Construction always validates or renormalizes, so every value of this
//! type sums to 1 within `MASS_TOLERANCE`.

use std::collections::BTreeMap;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Gamma};

use crate::delay::shapes::{DelayProfile, DelayShape, DelayShapeConfig};
use crate::error::SimError;

/// Allowed deviation of total mass from 1.
pub const MASS_TOLERANCE: f64 = 1e-6;

/// Truncation windows capturing less than this much mass are rejected.
pub const MIN_CAPTURED_MASS: f64 = 0.5;

/// Longest supported delay; shapes reaching past this day offset are rejected.
pub const MAX_DELAY_DAYS: usize = 365;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayDistribution {
    pmf: Vec<f64>,
}

impl DelayDistribution {
    /// Build from relative weights, renormalizing to unit mass.
    pub fn from_weights(weights: Vec<f64>) -> Result<Self, SimError> {
        if weights.is_empty() {
            return Err(SimError::config("Delay distribution needs at least one day."));
        }
        if let Some((day, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(SimError::config(format!(
                "Delay weight on day {day} must be finite and >= 0, got {w}"
            )));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(SimError::config("Delay weights sum to zero (degenerate distribution)."));
        }
        let pmf = weights.into_iter().map(|w| w / total).collect();
        Ok(Self { pmf })
    }

    /// Build from an already-normalized mass array (no renormalization).
    pub fn from_pmf(pmf: Vec<f64>) -> Result<Self, SimError> {
        let total: f64 = pmf.iter().sum();
        if pmf.is_empty() || pmf.iter().any(|p| !(p.is_finite() && *p >= 0.0)) {
            return Err(SimError::config("Probability mass must be finite and non-negative."));
        }
        if (total - 1.0).abs() > MASS_TOLERANCE {
            return Err(SimError::config(format!(
                "Probability mass sums to {total}, expected 1"
            )));
        }
        Ok(Self { pmf })
    }

    pub fn pmf(&self) -> &[f64] {
        &self.pmf
    }

    /// Mass at day offset `k` (0 beyond the truncation window).
    pub fn get(&self, k: usize) -> f64 {
        self.pmf.get(k).copied().unwrap_or(0.0)
    }

    /// Truncation length (number of day offsets, starting at offset 0).
    pub fn len(&self) -> usize {
        self.pmf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pmf.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.pmf.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.pmf.iter().enumerate().map(|(k, p)| k as f64 * p).sum()
    }

    /// `P(delay > d)`.
    pub fn survival(&self, d: usize) -> f64 {
        let upto: f64 = self.pmf.iter().take(d + 1).sum();
        (1.0 - upto).max(0.0)
    }

    /// Build a distribution from a shape description.
    pub fn from_shape(shape: &DelayShape) -> Result<Self, SimError> {
        match shape {
            DelayShape::Gamma {
                mean,
                sd,
                min_day,
                max_day,
            } => discretize_gamma(*mean, *sd, *min_day, *max_day),
            DelayShape::Window { first_day, weights } => {
                if weights.is_empty() {
                    return Err(SimError::config("Delay window has no weights."));
                }
                let last_day = first_day.checked_add(weights.len() - 1);
                if last_day.is_none_or(|d| d > MAX_DELAY_DAYS) {
                    return Err(SimError::config(format!(
                        "Delay window starting on day {first_day} with {} weights runs past day {MAX_DELAY_DAYS}",
                        weights.len()
                    )));
                }
                let mut padded = vec![0.0; *first_day];
                padded.extend_from_slice(weights);
                Self::from_weights(padded)
            }
        }
    }
}

fn discretize_gamma(mean: f64, sd: f64, min_day: usize, max_day: usize) -> Result<DelayDistribution, SimError> {
    if !(mean.is_finite() && sd.is_finite() && mean > 0.0 && sd > 0.0) {
        return Err(SimError::config(format!(
            "Gamma delay needs finite mean > 0 and sd > 0, got mean={mean}, sd={sd}"
        )));
    }
    if min_day > max_day {
        return Err(SimError::config(format!(
            "Gamma delay window is empty: min_day={min_day} > max_day={max_day}"
        )));
    }
    if max_day > MAX_DELAY_DAYS {
        return Err(SimError::config(format!(
            "Gamma delay max_day={max_day} exceeds {MAX_DELAY_DAYS} days"
        )));
    }

    let shape = (mean / sd).powi(2);
    let rate = mean / (sd * sd);
    let gamma = Gamma::new(shape, rate)
        .map_err(|e| SimError::config(format!("Invalid gamma delay (mean={mean}, sd={sd}): {e}")))?;

    let cdf = |x: f64| if x <= 0.0 { 0.0 } else { gamma.cdf(x) };
    let mut weights = vec![0.0; max_day + 1];
    for (k, w) in weights.iter_mut().enumerate().skip(min_day) {
        let lo = k as f64 - 0.5;
        let hi = k as f64 + 0.5;
        *w = (cdf(hi) - cdf(lo)).max(0.0);
    }

    let captured: f64 = weights.iter().sum();
    if !(captured.is_finite() && captured >= MIN_CAPTURED_MASS) {
        return Err(SimError::config(format!(
            "Truncation window {min_day}..={max_day} captures only {captured:.4} of the gamma(mean={mean}, sd={sd}) mass"
        )));
    }
    DelayDistribution::from_weights(weights)
}

/// The full set of built distributions, one per profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayLibrary {
    distributions: BTreeMap<DelayProfile, DelayDistribution>,
}

impl DelayLibrary {
    pub fn get(&self, profile: DelayProfile) -> &DelayDistribution {
        // Every profile is inserted by `build_delay_distributions`.
        &self.distributions[&profile]
    }

    pub fn iter(&self) -> impl Iterator<Item = (DelayProfile, &DelayDistribution)> {
        self.distributions.iter().map(|(p, d)| (*p, d))
    }

    /// Replace one profile's distribution.
    pub fn with(&self, profile: DelayProfile, distribution: DelayDistribution) -> Self {
        let mut distributions = self.distributions.clone();
        distributions.insert(profile, distribution);
        Self { distributions }
    }
}

/// Discretize every delay profile in `config`.
pub fn build_delay_distributions(config: &DelayShapeConfig) -> Result<DelayLibrary, SimError> {
    let mut distributions = BTreeMap::new();
    for profile in DelayProfile::ALL {
        let dist = DelayDistribution::from_shape(config.shape(profile)).map_err(|e| match e {
            SimError::Configuration(msg) => {
                SimError::Configuration(format!("{} delay: {msg}", profile.display_name()))
            }
            other => other,
        })?;
        distributions.insert(profile, dist);
    }
    Ok(DelayLibrary { distributions })
}
