//! True deaths to reported deaths.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Share of deaths that never enter the official count.
///
/// Starts at `initial_ratio` on day 0 and falls linearly to `min_ratio` on
/// `days_until_min`, where it stays. Reported deaths are the detected share
/// convolved with the `death_reporting` delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndetectedDeaths {
    pub initial_ratio: f64,
    pub min_ratio: f64,
    pub days_until_min: usize,
}

impl Default for UndetectedDeaths {
    fn default() -> Self {
        Self {
            initial_ratio: 1.0,
            min_ratio: 0.05,
            days_until_min: 45,
        }
    }
}

impl UndetectedDeaths {
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, ratio) in [("initial", self.initial_ratio), ("minimum", self.min_ratio)] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(SimError::config(format!(
                    "Undetected deaths {name} ratio must be in [0, 1], got {ratio}"
                )));
            }
        }
        if self.min_ratio > self.initial_ratio {
            return Err(SimError::config(format!(
                "Undetected deaths minimum ratio {} exceeds the initial ratio {}",
                self.min_ratio, self.initial_ratio
            )));
        }
        if self.days_until_min == 0 {
            return Err(SimError::config("Undetected deaths ramp must last at least one day."));
        }
        Ok(())
    }

    pub fn ratio(&self, day: usize) -> f64 {
        let step = (self.initial_ratio - self.min_ratio) / self.days_until_min as f64;
        (self.initial_ratio - step * day as f64).max(self.min_ratio)
    }
}
