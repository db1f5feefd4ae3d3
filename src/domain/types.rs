//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built once from a parameter source and passed by reference into the core
//! - exported to JSON/CSV alongside the simulated timeline
//! - compared bit-for-bit across runs (reproducibility checks)

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Name of an overridable model parameter.
///
/// The string form is the upper-case key used by best-params files and
/// `--set` / `--change` overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamName {
    InitialR0,
    LockdownR0,
    InflectionDay,
    RateOfInflection,
    LockdownFatigue,
    DailyImports,
    MortalityRate,
    ReopenDate,
    ReopenShiftDays,
    ReopenR,
    ReopenInflection,
    PostReopeningEquilibriumR,
    FallRMultiplier,
}

impl ParamName {
    pub const ALL: [ParamName; 13] = [
        ParamName::InitialR0,
        ParamName::LockdownR0,
        ParamName::InflectionDay,
        ParamName::RateOfInflection,
        ParamName::LockdownFatigue,
        ParamName::DailyImports,
        ParamName::MortalityRate,
        ParamName::ReopenDate,
        ParamName::ReopenShiftDays,
        ParamName::ReopenR,
        ParamName::ReopenInflection,
        ParamName::PostReopeningEquilibriumR,
        ParamName::FallRMultiplier,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParamName::InitialR0 => "INITIAL_R_0",
            ParamName::LockdownR0 => "LOCKDOWN_R_0",
            ParamName::InflectionDay => "INFLECTION_DAY",
            ParamName::RateOfInflection => "RATE_OF_INFLECTION",
            ParamName::LockdownFatigue => "LOCKDOWN_FATIGUE",
            ParamName::DailyImports => "DAILY_IMPORTS",
            ParamName::MortalityRate => "MORTALITY_RATE",
            ParamName::ReopenDate => "REOPEN_DATE",
            ParamName::ReopenShiftDays => "REOPEN_SHIFT_DAYS",
            ParamName::ReopenR => "REOPEN_R",
            ParamName::ReopenInflection => "REOPEN_INFLECTION",
            ParamName::PostReopeningEquilibriumR => "POST_REOPENING_EQUILIBRIUM_R",
            ParamName::FallRMultiplier => "FALL_R_MULTIPLIER",
        }
    }

    /// Date-valued parameters take a day-count shift under `change`.
    pub fn is_date(self) -> bool {
        matches!(self, ParamName::InflectionDay | ParamName::ReopenDate)
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase();
        // Older parameter files spell the equilibrium key without "-ING".
        if key == "POST_REOPEN_EQUILIBRIUM_R" {
            return Ok(ParamName::PostReopeningEquilibriumR);
        }
        ParamName::ALL
            .into_iter()
            .find(|name| name.as_str() == key)
            .ok_or_else(|| SimError::config(format!("Unrecognized param: {s}")))
    }
}

/// The value of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Date(NaiveDate),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Date(d) => write!(f, "{d}"),
        }
    }
}

/// One fully-resolved, immutable set of epidemiological parameters plus the
/// run-scoped inputs (quarantine, date range, population).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(rename = "INITIAL_R_0")]
    pub initial_r_0: f64,
    #[serde(rename = "LOCKDOWN_R_0")]
    pub lockdown_r_0: f64,
    #[serde(rename = "INFLECTION_DAY")]
    pub inflection_day: NaiveDate,
    #[serde(rename = "RATE_OF_INFLECTION")]
    pub rate_of_inflection: f64,
    #[serde(rename = "LOCKDOWN_FATIGUE")]
    pub lockdown_fatigue: f64,
    #[serde(rename = "DAILY_IMPORTS")]
    pub daily_imports: f64,
    #[serde(rename = "MORTALITY_RATE")]
    pub mortality_rate: f64,
    #[serde(rename = "REOPEN_DATE")]
    pub reopen_date: NaiveDate,
    #[serde(rename = "REOPEN_SHIFT_DAYS")]
    pub reopen_shift_days: f64,
    #[serde(rename = "REOPEN_R")]
    pub reopen_r: f64,
    #[serde(rename = "REOPEN_INFLECTION")]
    pub reopen_inflection: f64,
    #[serde(rename = "POST_REOPENING_EQUILIBRIUM_R", alias = "POST_REOPEN_EQUILIBRIUM_R")]
    pub post_reopening_equilibrium_r: f64,
    #[serde(rename = "FALL_R_MULTIPLIER")]
    pub fall_r_multiplier: f64,

    /// Fraction of infectious people who self-isolate.
    pub quarantine_perc: f64,
    /// Fractional transmission reduction for those who isolate.
    pub quarantine_effectiveness: f64,
    pub simulation_start_date: NaiveDate,
    pub simulation_end_date: NaiveDate,
    pub population_size: u64,
}

impl ParameterSet {
    /// The hard-coded US scenario used when no parameter file is given.
    pub fn default_scenario() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        ParameterSet {
            initial_r_0: 2.24,
            lockdown_r_0: 0.9,
            inflection_day: date(2020, 3, 18),
            rate_of_inflection: 0.25,
            lockdown_fatigue: 1.0,
            daily_imports: 500.0,
            mortality_rate: 0.01,
            reopen_date: date(2020, 5, 20),
            reopen_shift_days: 0.0,
            reopen_r: 1.2,
            reopen_inflection: 0.3,
            post_reopening_equilibrium_r: 1.0,
            fall_r_multiplier: 1.001,
            quarantine_perc: 0.0,
            quarantine_effectiveness: 0.0,
            simulation_start_date: date(2020, 2, 1),
            simulation_end_date: date(2020, 10, 1),
            population_size: 332_000_000,
        }
    }

    /// Number of simulated days (start and end inclusive).
    pub fn n_days(&self) -> usize {
        let span = (self.simulation_end_date - self.simulation_start_date).num_days();
        usize::try_from(span + 1).unwrap_or(0)
    }

    /// Day index of `date` relative to `simulation_start_date` (may be negative).
    pub fn day_index(&self, date: NaiveDate) -> i64 {
        (date - self.simulation_start_date).num_days()
    }

    pub fn get(&self, name: ParamName) -> ParamValue {
        use ParamValue::{Date, Number};
        match name {
            ParamName::InitialR0 => Number(self.initial_r_0),
            ParamName::LockdownR0 => Number(self.lockdown_r_0),
            ParamName::InflectionDay => Date(self.inflection_day),
            ParamName::RateOfInflection => Number(self.rate_of_inflection),
            ParamName::LockdownFatigue => Number(self.lockdown_fatigue),
            ParamName::DailyImports => Number(self.daily_imports),
            ParamName::MortalityRate => Number(self.mortality_rate),
            ParamName::ReopenDate => Date(self.reopen_date),
            ParamName::ReopenShiftDays => Number(self.reopen_shift_days),
            ParamName::ReopenR => Number(self.reopen_r),
            ParamName::ReopenInflection => Number(self.reopen_inflection),
            ParamName::PostReopeningEquilibriumR => Number(self.post_reopening_equilibrium_r),
            ParamName::FallRMultiplier => Number(self.fall_r_multiplier),
        }
    }

    /// Return a copy with `name` replaced by `value`.
    pub fn with(&self, name: ParamName, value: ParamValue) -> Result<ParameterSet, SimError> {
        let mut next = self.clone();
        match (name, value) {
            (ParamName::InflectionDay, ParamValue::Date(d)) => next.inflection_day = d,
            (ParamName::ReopenDate, ParamValue::Date(d)) => next.reopen_date = d,
            (name, ParamValue::Number(v)) => match next.number_slot(name) {
                Some(slot) => *slot = v,
                None => {
                    return Err(SimError::config(format!(
                        "Type mismatch for {name}: expected a date, got {v}"
                    )));
                }
            },
            (name, value) => {
                return Err(SimError::config(format!(
                    "Type mismatch for {name}: cannot assign {value}"
                )));
            }
        }
        Ok(next)
    }

    fn number_slot(&mut self, name: ParamName) -> Option<&mut f64> {
        let slot = match name {
            ParamName::InitialR0 => &mut self.initial_r_0,
            ParamName::LockdownR0 => &mut self.lockdown_r_0,
            ParamName::RateOfInflection => &mut self.rate_of_inflection,
            ParamName::LockdownFatigue => &mut self.lockdown_fatigue,
            ParamName::DailyImports => &mut self.daily_imports,
            ParamName::MortalityRate => &mut self.mortality_rate,
            ParamName::ReopenShiftDays => &mut self.reopen_shift_days,
            ParamName::ReopenR => &mut self.reopen_r,
            ParamName::ReopenInflection => &mut self.reopen_inflection,
            ParamName::PostReopeningEquilibriumR => &mut self.post_reopening_equilibrium_r,
            ParamName::FallRMultiplier => &mut self.fall_r_multiplier,
            ParamName::InflectionDay | ParamName::ReopenDate => return None,
        };
        Some(slot)
    }

    /// Check every field for finiteness and basic domain constraints.
    ///
    /// Called by the trajectory builder and the engine before any day-stepping.
    pub fn validate(&self) -> Result<(), SimError> {
        for name in ParamName::ALL {
            if let ParamValue::Number(v) = self.get(name) {
                if !v.is_finite() {
                    return Err(SimError::config(format!("{name} must be finite, got {v}")));
                }
            }
        }
        if !(self.quarantine_perc.is_finite() && self.quarantine_effectiveness.is_finite()) {
            return Err(SimError::config("Quarantine settings must be finite."));
        }

        if self.rate_of_inflection <= 0.0 {
            return Err(SimError::config(format!(
                "RATE_OF_INFLECTION must be > 0 (sigmoid steepness), got {}",
                self.rate_of_inflection
            )));
        }
        if self.reopen_inflection <= 0.0 {
            return Err(SimError::config(format!(
                "REOPEN_INFLECTION must be > 0 (sigmoid steepness), got {}",
                self.reopen_inflection
            )));
        }
        for (name, r) in [
            (ParamName::InitialR0, self.initial_r_0),
            (ParamName::LockdownR0, self.lockdown_r_0),
            (ParamName::ReopenR, self.reopen_r),
            (ParamName::PostReopeningEquilibriumR, self.post_reopening_equilibrium_r),
        ] {
            if r < 0.0 {
                return Err(SimError::config(format!("{name} must be >= 0, got {r}")));
            }
        }
        if self.lockdown_fatigue <= 0.0 {
            return Err(SimError::config(format!(
                "LOCKDOWN_FATIGUE must be > 0, got {}",
                self.lockdown_fatigue
            )));
        }
        if self.fall_r_multiplier <= 0.0 {
            return Err(SimError::config(format!(
                "FALL_R_MULTIPLIER must be > 0, got {}",
                self.fall_r_multiplier
            )));
        }
        if self.daily_imports < 0.0 {
            return Err(SimError::config(format!(
                "DAILY_IMPORTS must be >= 0, got {}",
                self.daily_imports
            )));
        }
        if !(0.0..=1.0).contains(&self.mortality_rate) {
            return Err(SimError::config(format!(
                "MORTALITY_RATE must be in [0, 1], got {}",
                self.mortality_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.quarantine_perc) {
            return Err(SimError::config(format!(
                "quarantine_perc must be in [0, 1], got {}",
                self.quarantine_perc
            )));
        }
        if !(0.0..=1.0).contains(&self.quarantine_effectiveness) {
            return Err(SimError::config(format!(
                "quarantine_effectiveness must be in [0, 1], got {}",
                self.quarantine_effectiveness
            )));
        }
        if self.simulation_end_date <= self.simulation_start_date {
            return Err(SimError::config(format!(
                "Simulation end date {} must be after start date {}",
                self.simulation_end_date, self.simulation_start_date
            )));
        }
        if self.population_size == 0 {
            return Err(SimError::config("Population size must be > 0."));
        }
        Ok(())
    }
}

/// Per-day snapshot produced by the propagation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayState {
    pub date: NaiveDate,
    /// Trajectory R before susceptible depletion.
    pub r_t: f64,
    /// `r_t` scaled by the remaining susceptible fraction.
    pub r_t_effective: f64,
    pub new_infections: f64,
    pub cumulative_infections: f64,
    /// Susceptible pool at the start of the day.
    pub susceptible_remaining: f64,
    pub new_symptom_onsets: f64,
    pub new_hospitalizations: f64,
    /// Occupied hospital beds.
    pub active_hospitalizations: f64,
    pub new_deaths: f64,
    pub cumulative_deaths: f64,
    /// Detected deaths after the reporting lag.
    pub new_reported_deaths: f64,
    pub cumulative_reported_deaths: f64,
}
