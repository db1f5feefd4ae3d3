//! Imported-case schedule and IFR improvement schedule.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// How `DAILY_IMPORTS` fades out as local transmission takes over.
///
/// `imports(t) = DAILY_IMPORTS * taper(t) * exp(-saturation_rate * cumulative / N)`
///
/// `taper(t)` is 1 for the first `flat_days` days, then falls linearly to 0 on
/// `end_day`. The exponential term removes imports once a sizeable share of the
/// population has been infected (e.g. rate 20 divides imports by `e` for every 5%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSchedule {
    pub flat_days: usize,
    pub end_day: usize,
    pub saturation_rate: f64,
}

impl Default for ImportSchedule {
    fn default() -> Self {
        Self {
            flat_days: 10,
            end_day: 100,
            saturation_rate: 20.0,
        }
    }
}

impl ImportSchedule {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.end_day < self.flat_days {
            return Err(SimError::config(format!(
                "Import end day {} must not precede the flat period ({} days)",
                self.end_day, self.flat_days
            )));
        }
        if !(self.saturation_rate.is_finite() && self.saturation_rate >= 0.0) {
            return Err(SimError::config(format!(
                "Import saturation rate must be finite and >= 0, got {}",
                self.saturation_rate
            )));
        }
        Ok(())
    }

    pub fn taper(&self, day: usize) -> f64 {
        if day < self.flat_days {
            return 1.0;
        }
        let ramp = (day - self.flat_days + 1) as f64 / (self.end_day - self.flat_days + 1) as f64;
        (1.0 - ramp).clamp(0.0, 1.0)
    }

    pub fn imports(&self, daily_imports: f64, day: usize, cumulative_infections: f64, population: f64) -> f64 {
        let infected_share = cumulative_infections / population;
        daily_imports * self.taper(day) * (-self.saturation_rate * infected_share).exp()
    }
}

/// Gradual IFR improvement (better treatment over time).
///
/// From `start_day` on, the mortality rate is multiplied by
/// `daily_multiplier^(day - start_day)`, never below `min_multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IfrSchedule {
    pub start_day: usize,
    pub daily_multiplier: f64,
    pub min_multiplier: f64,
}

impl Default for IfrSchedule {
    fn default() -> Self {
        Self {
            start_day: 30,
            daily_multiplier: 0.995,
            min_multiplier: 0.3,
        }
    }
}

impl IfrSchedule {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.daily_multiplier > 0.0 && self.daily_multiplier <= 1.0) {
            return Err(SimError::config(format!(
                "IFR daily multiplier must be in (0, 1], got {}",
                self.daily_multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.min_multiplier) {
            return Err(SimError::config(format!(
                "IFR minimum multiplier must be in [0, 1], got {}",
                self.min_multiplier
            )));
        }
        Ok(())
    }

    pub fn multiplier(&self, day: usize) -> f64 {
        if day < self.start_day {
            return 1.0;
        }
        let elapsed = (day - self.start_day) as f64;
        self.daily_multiplier.powf(elapsed).max(self.min_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taper_is_flat_then_linear_to_zero() {
        let s = ImportSchedule::default();
        assert_eq!(s.taper(0), 1.0);
        assert_eq!(s.taper(9), 1.0);
        assert!(s.taper(10) < 1.0);
        assert!((s.taper(55) - 45.0 / 91.0).abs() < 1e-12);
        assert_eq!(s.taper(100), 0.0);
        assert_eq!(s.taper(500), 0.0);
        for day in 1..120 {
            assert!(s.taper(day) <= s.taper(day - 1), "taper rose on day {day}");
        }
    }

    #[test]
    fn imports_fade_with_infected_share() {
        let s = ImportSchedule::default();
        let fresh = s.imports(50.0, 0, 0.0, 1e6);
        let five_percent = s.imports(50.0, 0, 5e4, 1e6);
        assert_eq!(fresh, 50.0);
        assert!((five_percent - 50.0 / std::f64::consts::E).abs() < 1e-9);
        assert_eq!(s.imports(0.0, 0, 0.0, 1e6), 0.0);
    }

    #[test]
    fn invalid_import_schedule_is_rejected() {
        let s = ImportSchedule {
            flat_days: 20,
            end_day: 10,
            ..ImportSchedule::default()
        };
        assert!(s.validate().is_err());
        let s = ImportSchedule {
            saturation_rate: -1.0,
            ..ImportSchedule::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn ifr_multiplier_decays_to_floor() {
        let ifr = IfrSchedule::default();
        assert_eq!(ifr.multiplier(0), 1.0);
        assert_eq!(ifr.multiplier(30), 1.0);
        assert!((ifr.multiplier(31) - 0.995).abs() < 1e-12);
        assert_eq!(ifr.multiplier(10_000), 0.3);
        ifr.validate().unwrap();
        assert!(IfrSchedule { daily_multiplier: 1.5, ..ifr }.validate().is_err());
    }
}
