//! Discrete-day renewal propagation.
//!
//! For each day `t` (all look-backs read only days `< t`, or `<= t` for outcomes):
//!
//! - `pressure = sum_{k>=1} gi[k] * inf[t-k]`
//! - `inf[t] = (R_t * pressure + imports[t]) * S[t] / N`
//! - `S[t+1] = max(0, S[t] - inf[t])`
//! - deaths, admissions and symptom onsets are `inf` convolved with their delays;
//!   hospital occupancy is admissions weighted by the length-of-stay survival.
//! - reported deaths are the detected share of deaths convolved with the reporting lag.
//!
//! Inputs are fully validated before day 0. After that the only failure is a
//! `NumericInstability` (non-finite sum, or the susceptible pool overshooting
//! zero by more than the configured tolerance).

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::delay::{DelayDistribution, DelayLibrary, DelayProfile, MASS_TOLERANCE};
use crate::domain::{DayState, ParameterSet};
use crate::engine::imports::{IfrSchedule, ImportSchedule};
use crate::engine::reporting::UndetectedDeaths;
use crate::error::SimError;
use crate::rt::RtTrajectory;
use crate::timeline::SimulationTimeline;

/// Fixed engine assumptions (not part of the fitted parameter set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Share of infections that are admitted to hospital.
    pub hospitalization_rate: f64,
    pub imports: ImportSchedule,
    /// Allowed overshoot of the susceptible pool below zero, as a share of the population.
    pub susceptible_tolerance: f64,
    pub compute_hospitalizations: bool,
    pub ifr_schedule: Option<IfrSchedule>,
    /// `None` reports every death.
    pub undetected_deaths: Option<UndetectedDeaths>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hospitalization_rate: 0.034,
            imports: ImportSchedule::default(),
            susceptible_tolerance: 1e-6,
            compute_hospitalizations: true,
            ifr_schedule: None,
            undetected_deaths: Some(UndetectedDeaths::default()),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(0.0..=1.0).contains(&self.hospitalization_rate) {
            return Err(SimError::config(format!(
                "Hospitalization rate must be in [0, 1], got {}",
                self.hospitalization_rate
            )));
        }
        if !(self.susceptible_tolerance.is_finite() && self.susceptible_tolerance >= 0.0) {
            return Err(SimError::config(format!(
                "Susceptible tolerance must be finite and >= 0, got {}",
                self.susceptible_tolerance
            )));
        }
        self.imports.validate()?;
        if let Some(ifr) = &self.ifr_schedule {
            ifr.validate()?;
        }
        if let Some(undetected) = &self.undetected_deaths {
            undetected.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(
        &self,
        params: &ParameterSet,
        rt: &RtTrajectory,
        delays: &DelayLibrary,
        population_size: u64,
    ) -> Result<SimulationTimeline, SimError> {
        self.run_with_cancel(params, rt, delays, population_size, &AtomicBool::new(false))
    }

    /// Like `run`, but checks `cancel` before every day-step.
    ///
    /// A cancelled run returns the days completed so far, flagged as truncated.
    pub fn run_with_cancel(
        &self,
        params: &ParameterSet,
        rt: &RtTrajectory,
        delays: &DelayLibrary,
        population_size: u64,
        cancel: &AtomicBool,
    ) -> Result<SimulationTimeline, SimError> {
        self.validate_inputs(params, rt, delays, population_size)?;

        let n_days = params.n_days();
        let population = population_size as f64;
        let gi = delays.get(DelayProfile::Infectiousness).pmf();
        let incubation = delays.get(DelayProfile::Incubation).pmf();
        let admission = delays.get(DelayProfile::HospitalAdmission).pmf();
        let death = delays.get(DelayProfile::Death).pmf();
        let reporting = delays.get(DelayProfile::DeathReporting).pmf();
        let stay = delays.get(DelayProfile::HospitalStay);
        let stay_survival: Vec<f64> = (0..stay.len()).map(|d| stay.survival(d)).collect();

        debug!(
            days = n_days,
            population = population_size,
            gi_len = gi.len(),
            "starting propagation"
        );

        let mut infections: Vec<f64> = Vec::with_capacity(n_days);
        let mut admissions: Vec<f64> = Vec::with_capacity(n_days);
        let mut detected_deaths: Vec<f64> = Vec::with_capacity(n_days);
        let mut days: Vec<DayState> = Vec::with_capacity(n_days);
        let mut susceptible = population;
        let mut cumulative_infections = 0.0;
        let mut cumulative_deaths = 0.0;
        let mut cumulative_reported_deaths = 0.0;
        let mut truncated = false;

        for (t, (date, r_t)) in rt.iter().take(n_days).enumerate() {
            if cancel.load(Ordering::Relaxed) {
                warn!(day = t, "propagation cancelled");
                truncated = true;
                break;
            }

            let pressure = finite(t, "infection_pressure", convolve(gi, &infections, t, 1))?;
            let imports = self
                .config
                .imports
                .imports(params.daily_imports, t, cumulative_infections, population);
            let raw = finite(t, "raw_new_infections", r_t * pressure + imports)?;

            let susceptible_share = susceptible / population;
            let new_infections = raw * susceptible_share;
            let next_susceptible = susceptible - new_infections;
            if next_susceptible < -self.config.susceptible_tolerance * population {
                return Err(SimError::NumericInstability {
                    day: t,
                    quantity: "susceptible_remaining",
                    value: next_susceptible,
                });
            }
            infections.push(new_infections);
            cumulative_infections += new_infections;

            let ifr = params.mortality_rate
                * self.config.ifr_schedule.map_or(1.0, |s| s.multiplier(t));
            let new_deaths = finite(t, "new_deaths", ifr * convolve(death, &infections, t, 0))?;
            cumulative_deaths += new_deaths;

            let undetected = self.config.undetected_deaths.map_or(0.0, |u| u.ratio(t));
            detected_deaths.push(new_deaths * (1.0 - undetected));
            let new_reported_deaths = finite(
                t,
                "new_reported_deaths",
                convolve(reporting, &detected_deaths, t, 0),
            )?;
            cumulative_reported_deaths += new_reported_deaths;

            let new_hospitalizations = if self.config.compute_hospitalizations {
                finite(
                    t,
                    "new_hospitalizations",
                    self.config.hospitalization_rate * convolve(admission, &infections, t, 0),
                )?
            } else {
                0.0
            };
            admissions.push(new_hospitalizations);
            let active_hospitalizations = convolve(&stay_survival, &admissions, t, 0);

            let new_symptom_onsets = finite(t, "new_symptom_onsets", convolve(incubation, &infections, t, 0))?;

            days.push(DayState {
                date,
                r_t,
                r_t_effective: r_t * susceptible_share,
                new_infections,
                cumulative_infections,
                susceptible_remaining: susceptible,
                new_symptom_onsets,
                new_hospitalizations,
                active_hospitalizations,
                new_deaths,
                cumulative_deaths,
                new_reported_deaths,
                cumulative_reported_deaths,
            });
            susceptible = next_susceptible.max(0.0);
        }

        debug!(
            days = days.len(),
            cumulative_infections,
            cumulative_deaths,
            "propagation finished"
        );
        Ok(SimulationTimeline::new(
            rt.start_date(),
            population_size,
            days,
            truncated,
        ))
    }

    fn validate_inputs(
        &self,
        params: &ParameterSet,
        rt: &RtTrajectory,
        delays: &DelayLibrary,
        population_size: u64,
    ) -> Result<(), SimError> {
        params.validate()?;
        self.config.validate()?;
        if population_size == 0 {
            return Err(SimError::config("Population size must be > 0."));
        }
        if rt.start_date() != params.simulation_start_date || rt.len() < params.n_days() {
            return Err(SimError::config(format!(
                "R_t trajectory covers {}..={} but the simulation runs {}..={}",
                rt.start_date(),
                rt.end_date(),
                params.simulation_start_date,
                params.simulation_end_date
            )));
        }
        if let Some((day, r)) = rt.values().iter().enumerate().find(|(_, r)| !(r.is_finite() && **r >= 0.0)) {
            return Err(SimError::config(format!("R_t on day {day} must be finite and >= 0, got {r}")));
        }
        for (profile, dist) in delays.iter() {
            check_mass(profile, dist)?;
        }
        let gi = delays.get(DelayProfile::Infectiousness);
        if gi.get(0) > 0.0 {
            return Err(SimError::config(format!(
                "Infectiousness profile puts mass {} on day 0; same-day transmission is not allowed",
                gi.get(0)
            )));
        }
        Ok(())
    }
}

/// Run with `EngineConfig::default()`.
pub fn run_simulation(
    params: &ParameterSet,
    rt: &RtTrajectory,
    delays: &DelayLibrary,
    population_size: u64,
) -> Result<SimulationTimeline, SimError> {
    Engine::default().run(params, rt, delays, population_size)
}

fn check_mass(profile: DelayProfile, dist: &DelayDistribution) -> Result<(), SimError> {
    let total = dist.total_mass();
    if (total - 1.0).abs() > MASS_TOLERANCE {
        return Err(SimError::config(format!(
            "{} delay mass sums to {total}, expected 1",
            profile.display_name()
        )));
    }
    Ok(())
}

/// `sum_{k=first..} weights[k] * series[t-k]` over the lags available in `series`.
fn convolve(weights: &[f64], series: &[f64], t: usize, first: usize) -> f64 {
    (first..weights.len())
        .take_while(|&k| k <= t)
        .filter_map(|k| series.get(t - k).map(|x| weights[k] * x))
        .sum()
}

fn finite(day: usize, quantity: &'static str, value: f64) -> Result<f64, SimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::NumericInstability { day, quantity, value })
    }
}
