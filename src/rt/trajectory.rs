//! Reproduction-number trajectory.
//!
//! `R_t` is built by composing, in order:
//!
//! 1. lockdown transition from `INITIAL_R_0` to `LOCKDOWN_R_0` centred on `INFLECTION_DAY`
//! 2. lockdown fatigue (slow multiplicative drift after the inflection)
//! 3. reopening transition toward `REOPEN_R`, centred on `REOPEN_DATE + REOPEN_SHIFT_DAYS`
//! 4. post-reopening equilibrium transition toward `POST_REOPENING_EQUILIBRIUM_R`
//! 5. fall-wave compounding multiplier (bounded)
//! 6. quarantine scaling
//!
//! Each stage takes the previous stage's value as its baseline. The curve is a
//! pure function of the day index; it is sampled once per day to produce an
//! `RtTrajectory`.

use chrono::{Days, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Triangular};
use serde::{Deserialize, Serialize};

use crate::domain::ParameterSet;
use crate::error::SimError;
use crate::rt::sigmoid::Transition;

/// Fixed shape assumptions for the trajectory (not run-tunable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtShapeConfig {
    /// Days after the inflection day at which fatigue is half-developed.
    pub fatigue_onset_days: f64,
    pub fatigue_steepness: f64,
    /// Equilibrium steepness as a fraction of `REOPEN_INFLECTION` (in `(0, 1]`).
    pub equilibrium_steepness_ratio: f64,
    /// Delay from reopening to the equilibrium midpoint when `LOCKDOWN_R_0 <= 1`.
    pub equilibrium_delay_subcritical: f64,
    /// Same, when `LOCKDOWN_R_0 > 1`.
    pub equilibrium_delay_supercritical: f64,
    /// Fall-wave compounding starts on this date.
    pub fall_reference_date: NaiveDate,
    pub fall_multiplier_min: f64,
    pub fall_multiplier_max: f64,
}

impl Default for RtShapeConfig {
    fn default() -> Self {
        Self {
            fatigue_onset_days: 28.0,
            fatigue_steepness: 0.2,
            equilibrium_steepness_ratio: 0.5,
            equilibrium_delay_subcritical: 30.0,
            equilibrium_delay_supercritical: 15.0,
            fall_reference_date: NaiveDate::from_ymd_opt(2020, 8, 23).unwrap_or_default(),
            fall_multiplier_min: 0.9,
            fall_multiplier_max: 1.2,
        }
    }
}

impl RtShapeConfig {
    fn validate(&self) -> Result<(), SimError> {
        if !(self.fatigue_steepness.is_finite() && self.fatigue_steepness > 0.0) {
            return Err(SimError::config("Fatigue steepness must be > 0."));
        }
        if !self.fatigue_onset_days.is_finite() {
            return Err(SimError::config("Fatigue onset must be finite."));
        }
        if !(self.equilibrium_steepness_ratio > 0.0 && self.equilibrium_steepness_ratio <= 1.0) {
            return Err(SimError::config(format!(
                "Equilibrium steepness ratio must be in (0, 1], got {}",
                self.equilibrium_steepness_ratio
            )));
        }
        if !(self.equilibrium_delay_subcritical.is_finite()
            && self.equilibrium_delay_supercritical.is_finite())
        {
            return Err(SimError::config("Equilibrium delays must be finite."));
        }
        if !(self.fall_multiplier_min > 0.0 && self.fall_multiplier_min <= self.fall_multiplier_max) {
            return Err(SimError::config("Fall multiplier bounds must satisfy 0 < min <= max."));
        }
        Ok(())
    }
}

/// Source of the fall-wave daily multiplier.
///
/// The draw is always explicit so that runs are reproducible and ensemble members
/// never share a random source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallWave {
    /// Use `FALL_R_MULTIPLIER` from the parameter set.
    FromParameters,
    /// Use this value.
    Fixed(f64),
    /// Sample once from a triangular distribution with a seeded generator.
    Triangular { low: f64, mode: f64, high: f64, seed: u64 },
}

impl FallWave {
    /// Default range for seasonal (northern hemisphere) regions.
    pub fn seasonal(seed: u64) -> Self {
        FallWave::Triangular {
            low: 0.998,
            mode: 1.001,
            high: 1.005,
            seed,
        }
    }

    pub fn resolve(&self, params: &ParameterSet) -> Result<f64, SimError> {
        let value = match *self {
            FallWave::FromParameters => params.fall_r_multiplier,
            FallWave::Fixed(v) => v,
            FallWave::Triangular { low, mode, high, seed } => {
                let dist = Triangular::new(low, high, mode).map_err(|e| {
                    SimError::config(format!(
                        "Invalid fall-wave range (low={low}, mode={mode}, high={high}): {e}"
                    ))
                })?;
                let mut rng = StdRng::seed_from_u64(seed);
                dist.sample(&mut rng)
            }
        };
        if !(value.is_finite() && value > 0.0) {
            return Err(SimError::config(format!("Fall-wave multiplier must be > 0, got {value}")));
        }
        Ok(value)
    }
}

/// Intermediate values of each composition stage on one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RtStages {
    pub lockdown: f64,
    pub fatigued: f64,
    pub reopened: f64,
    pub equilibrium: f64,
    pub fall: f64,
    pub quarantined: f64,
}

/// The composed curve, evaluable at any day index (day 0 is the `origin` passed to `new`).
#[derive(Debug, Clone, PartialEq)]
pub struct RtModel {
    initial_r: f64,
    lockdown_r: f64,
    lockdown: Transition,
    fatigue: f64,
    fatigue_onset: Transition,
    reopen_r: f64,
    reopen: Transition,
    equilibrium_r: f64,
    equilibrium: Transition,
    fall_multiplier: f64,
    fall_start: f64,
    fall_bounds: (f64, f64),
    quarantine_factor: f64,
}

impl RtModel {
    pub fn new(
        params: &ParameterSet,
        config: &RtShapeConfig,
        fall_multiplier: f64,
        origin: NaiveDate,
    ) -> Result<Self, SimError> {
        params.validate()?;
        config.validate()?;
        if !(fall_multiplier.is_finite() && fall_multiplier > 0.0) {
            return Err(SimError::config(format!(
                "Fall-wave multiplier must be > 0, got {fall_multiplier}"
            )));
        }

        let day = |date: NaiveDate| (date - origin).num_days() as f64;
        let inflection = day(params.inflection_day);
        let reopen_mid = day(params.reopen_date) + params.reopen_shift_days;
        let eq_delay = if params.lockdown_r_0 <= 1.0 {
            config.equilibrium_delay_subcritical
        } else {
            config.equilibrium_delay_supercritical
        };

        let q = params.quarantine_perc;
        let quarantine_factor = (1.0 - q) + q * (1.0 - params.quarantine_effectiveness);

        Ok(Self {
            initial_r: params.initial_r_0,
            lockdown_r: params.lockdown_r_0,
            lockdown: Transition::new(inflection, params.rate_of_inflection),
            fatigue: params.lockdown_fatigue,
            fatigue_onset: Transition::new(inflection + config.fatigue_onset_days, config.fatigue_steepness),
            reopen_r: params.reopen_r,
            reopen: Transition::new(reopen_mid, params.reopen_inflection),
            equilibrium_r: params.post_reopening_equilibrium_r,
            equilibrium: Transition::new(
                reopen_mid + eq_delay,
                params.reopen_inflection * config.equilibrium_steepness_ratio,
            ),
            fall_multiplier,
            fall_start: day(config.fall_reference_date),
            fall_bounds: (config.fall_multiplier_min, config.fall_multiplier_max),
            quarantine_factor,
        })
    }

    pub fn fall_multiplier(&self) -> f64 {
        self.fall_multiplier
    }

    pub fn r_at(&self, day: f64) -> f64 {
        self.stages_at(day).quarantined
    }

    pub fn stages_at(&self, day: f64) -> RtStages {
        let lockdown = self.lockdown.blend(self.initial_r, self.lockdown_r, day);

        let fatigued = if day > self.lockdown.midpoint {
            lockdown * (1.0 + (self.fatigue - 1.0) * self.fatigue_onset.weight(day))
        } else {
            lockdown
        };

        let reopened = self.reopen.blend(fatigued, self.reopen_r, day);
        let equilibrium = self.equilibrium.blend(reopened, self.equilibrium_r, day);

        let elapsed = (day - self.fall_start).max(0.0);
        let (lo, hi) = self.fall_bounds;
        let fall = equilibrium * self.fall_multiplier.powf(elapsed).clamp(lo, hi);

        RtStages {
            lockdown,
            fatigued,
            reopened,
            equilibrium,
            fall,
            quarantined: (fall * self.quarantine_factor).max(0.0),
        }
    }
}

/// `R_t` sampled once per day over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RtTrajectory {
    start: NaiveDate,
    values: Vec<f64>,
    fall_multiplier: f64,
}

impl RtTrajectory {
    /// Wrap pre-computed daily values (e.g. produced by an external model).
    pub fn from_values(start: NaiveDate, values: Vec<f64>) -> Result<Self, SimError> {
        if values.is_empty() {
            return Err(SimError::config("R_t trajectory must cover at least one day."));
        }
        if let Some((day, r)) = values.iter().enumerate().find(|(_, r)| !(r.is_finite() && **r >= 0.0)) {
            return Err(SimError::config(format!(
                "R_t on day {day} must be finite and >= 0, got {r}"
            )));
        }
        Ok(Self {
            start,
            values,
            fall_multiplier: 1.0,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.date_at(self.values.len().saturating_sub(1))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, day: usize) -> Option<f64> {
        self.values.get(day).copied()
    }

    /// The fall-wave multiplier this trajectory was built with.
    pub fn fall_multiplier(&self) -> f64 {
        self.fall_multiplier
    }

    pub fn date_at(&self, day: usize) -> NaiveDate {
        self.start + Days::new(day as u64)
    }

    pub fn on(&self, date: NaiveDate) -> Option<f64> {
        let idx = usize::try_from((date - self.start).num_days()).ok()?;
        self.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &r)| (self.date_at(i), r))
    }
}

/// Builder for `RtTrajectory` with explicit shape config and fall-wave source.
#[derive(Debug, Clone)]
pub struct RtTrajectoryBuilder<'a> {
    params: &'a ParameterSet,
    config: RtShapeConfig,
    fall_wave: FallWave,
    start: NaiveDate,
    end: NaiveDate,
}

impl<'a> RtTrajectoryBuilder<'a> {
    /// Defaults to the parameter set's own date range and fall multiplier.
    pub fn new(params: &'a ParameterSet) -> Self {
        Self {
            params,
            config: RtShapeConfig::default(),
            fall_wave: FallWave::FromParameters,
            start: params.simulation_start_date,
            end: params.simulation_end_date,
        }
    }

    pub fn config(mut self, config: RtShapeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fall_wave(mut self, fall_wave: FallWave) -> Self {
        self.fall_wave = fall_wave;
        self
    }

    pub fn range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn build_model(&self) -> Result<RtModel, SimError> {
        let fall = self.fall_wave.resolve(self.params)?;
        RtModel::new(self.params, &self.config, fall, self.start)
    }

    pub fn build(&self) -> Result<RtTrajectory, SimError> {
        if self.end <= self.start {
            return Err(SimError::config(format!(
                "Trajectory end date {} must be after start date {}",
                self.end, self.start
            )));
        }
        let model = self.build_model()?;
        let n = (self.end - self.start).num_days() as usize + 1;
        let values = (0..n).map(|d| model.r_at(d as f64)).collect();
        Ok(RtTrajectory {
            start: self.start,
            values,
            fall_multiplier: model.fall_multiplier(),
        })
    }
}

/// `R_t` for every day in `[start, end]` using default shape assumptions.
pub fn build_r_t_trajectory(
    params: &ParameterSet,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RtTrajectory, SimError> {
    RtTrajectoryBuilder::new(params).range(start, end).build()
}
