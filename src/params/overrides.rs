//! Parameter overrides.
//!
//! Overrides are an ordered list applied functionally: each step produces a new
//! `ParameterSet` and the input is never mutated.
//!
//! - `Set` replaces a value (dates parse as `YYYY-MM-DD`).
//! - `Change` adds a delta; for date fields the delta is a whole number of days.

use chrono::{NaiveDate, TimeDelta};
use tracing::debug;

use crate::domain::{ParamName, ParamValue, ParameterSet};
use crate::error::SimError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    Set { name: ParamName, value: String },
    Change { name: ParamName, delta: String },
}

impl Override {
    pub fn set(name: &str, value: impl Into<String>) -> Result<Self, SimError> {
        Ok(Override::Set {
            name: name.parse()?,
            value: value.into(),
        })
    }

    pub fn change(name: &str, delta: impl Into<String>) -> Result<Self, SimError> {
        Ok(Override::Change {
            name: name.parse()?,
            delta: delta.into(),
        })
    }

    pub fn name(&self) -> ParamName {
        match self {
            Override::Set { name, .. } | Override::Change { name, .. } => *name,
        }
    }

    /// Apply this override to `params`, returning the updated copy.
    pub fn apply(&self, params: &ParameterSet) -> Result<ParameterSet, SimError> {
        let next = match self {
            Override::Set { name, value } => {
                let parsed = if name.is_date() {
                    ParamValue::Date(parse_date(*name, value)?)
                } else {
                    ParamValue::Number(parse_number(*name, value)?)
                };
                debug!(param = %name, value = %parsed, "setting parameter");
                parsed
            }
            Override::Change { name, delta } => {
                let changed = match params.get(*name) {
                    ParamValue::Date(current) => {
                        let days: i64 = delta.trim().parse().map_err(|_| {
                            SimError::config(format!(
                                "Change for {name} must be a whole number of days, got '{delta}'"
                            ))
                        })?;
                        let shifted = current
                            .checked_add_signed(TimeDelta::days(days))
                            .ok_or_else(|| SimError::config(format!("Shifting {name} by {days} days overflows")))?;
                        ParamValue::Date(shifted)
                    }
                    ParamValue::Number(current) => ParamValue::Number(current + parse_number(*name, delta)?),
                };
                debug!(param = %name, from = %params.get(*name), to = %changed, "changing parameter");
                changed
            }
        };
        params.with(self.name(), next)
    }
}

/// Fold `overrides` over `params` in the order given.
pub fn apply_overrides(params: &ParameterSet, overrides: &[Override]) -> Result<ParameterSet, SimError> {
    overrides
        .iter()
        .try_fold(params.clone(), |acc, op| op.apply(&acc))
}

fn parse_number(name: ParamName, raw: &str) -> Result<f64, SimError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| SimError::config(format!("Invalid number for {name}: '{raw}'")))?;
    if !value.is_finite() {
        return Err(SimError::config(format!("{name} must be finite, got '{raw}'")));
    }
    Ok(value)
}

fn parse_date(name: ParamName, raw: &str) -> Result<NaiveDate, SimError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| SimError::config(format!("Invalid date for {name}: '{raw}' ({e})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt::RtTrajectoryBuilder;

    #[test]
    fn set_replaces_and_last_write_wins() {
        let params = ParameterSet::default_scenario();
        let ops = vec![
            Override::set("REOPEN_R", "1.5").unwrap(),
            Override::set("REOPEN_R", "1.1").unwrap(),
            Override::set("reopen_date", "2020-06-01").unwrap(),
        ];
        let next = apply_overrides(&params, &ops).unwrap();
        assert_eq!(next.reopen_r, 1.1);
        assert_eq!(next.reopen_date, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
        assert_eq!(params.reopen_r, 1.2);
    }

    #[test]
    fn changes_accumulate_in_order() {
        let params = ParameterSet::default_scenario();
        let ops = vec![
            Override::set("DAILY_IMPORTS", "100").unwrap(),
            Override::change("DAILY_IMPORTS", "25").unwrap(),
            Override::change("DAILY_IMPORTS", "-5").unwrap(),
            Override::change("INFLECTION_DAY", "-7").unwrap(),
            Override::change("INFLECTION_DAY", "2").unwrap(),
        ];
        let next = apply_overrides(&params, &ops).unwrap();
        assert_eq!(next.daily_imports, 120.0);
        assert_eq!(next.inflection_day, NaiveDate::from_ymd_opt(2020, 3, 13).unwrap());
    }

    #[test]
    fn invalid_overrides_are_configuration_errors() {
        assert!(Override::set("NOT_A_PARAM", "1").is_err());

        let params = ParameterSet::default_scenario();
        for op in [
            Override::set("REOPEN_R", "fast").unwrap(),
            Override::set("INFLECTION_DAY", "March 3").unwrap(),
            Override::change("REOPEN_DATE", "1.5").unwrap(),
            Override::set("MORTALITY_RATE", "2.0").unwrap(),
        ] {
            let result = apply_overrides(&params, &[op.clone()]).and_then(|p| p.validate().map(|_| p));
            assert!(matches!(result, Err(SimError::Configuration(_))), "{op:?}");
        }
    }

    #[test]
    fn inflection_shift_shifts_trajectory() {
        let base = ParameterSet {
            initial_r_0: 3.0,
            lockdown_r_0: 0.9,
            reopen_date: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            reopen_r: 0.9,
            post_reopening_equilibrium_r: 0.9,
            fall_r_multiplier: 1.0,
            ..ParameterSet::default_scenario()
        };
        let shifted = apply_overrides(&base, &[Override::change("INFLECTION_DAY", "-7").unwrap()]).unwrap();

        let base_model = RtTrajectoryBuilder::new(&base).build_model().unwrap();
        let traj = RtTrajectoryBuilder::new(&shifted).build().unwrap();
        for (day, r) in traj.values().iter().enumerate() {
            let expected = base_model.r_at(day as f64 + 7.0);
            assert!((r - expected).abs() < 1e-9, "day {day}: {r} vs {expected}");
        }
    }
}
