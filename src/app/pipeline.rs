//! Shared "simulation pipeline" logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! params source, overrides, delays, R_t trajectory, engine, timeline
//!
//! The command handlers can then focus on presentation (printing, plotting, export).

use tracing::info;

use crate::cli::{ParamsArgs, pairs};
use crate::config::{ModelConfig, load_model_config};
use crate::delay::build_delay_distributions;
use crate::domain::ParameterSet;
use crate::engine::{Engine, IfrSchedule};
use crate::error::AppError;
use crate::params::{AggregationMode, Override, apply_overrides, load_params_file, resolve_params_file};
use crate::rt::RtTrajectoryBuilder;
use crate::timeline::SimulationTimeline;

/// Resolve the parameter set for `mode`: file (or built-in scenario), then
/// date range and quarantine from the command line, then `--set` and `--change`.
pub fn resolve_params(args: &ParamsArgs, mode: AggregationMode) -> Result<ParameterSet, AppError> {
    let base = match &args.best_params_dir {
        Some(dir) => {
            let path = resolve_params_file(
                dir,
                &args.country,
                args.region.as_deref(),
                args.subregion.as_deref(),
            )?;
            load_params_file(&path)?.parameter_set(mode)?
        }
        None => {
            info!("no params directory given; using the built-in US scenario");
            ParameterSet::default_scenario()
        }
    };

    let mut params = ParameterSet {
        quarantine_perc: args.quarantine_perc,
        quarantine_effectiveness: args.quarantine_effectiveness,
        ..base
    };
    if let Some(start) = args.simulation_start_date {
        params.simulation_start_date = start;
    }
    if let Some(end) = args.simulation_end_date {
        params.simulation_end_date = end;
    }

    let overrides = build_overrides(args)?;
    let params = apply_overrides(&params, &overrides)?;
    params.validate()?;
    Ok(params)
}

/// All `--set` operations, then all `--change` operations, each in command-line order.
pub fn build_overrides(args: &ParamsArgs) -> Result<Vec<Override>, AppError> {
    let mut out = Vec::with_capacity((args.set.len() + args.change.len()) / 2);
    for (name, value) in pairs(&args.set) {
        out.push(Override::set(name, value)?);
    }
    for (name, delta) in pairs(&args.change) {
        out.push(Override::change(name, delta)?);
    }
    Ok(out)
}

/// Model defaults, optionally replaced from a JSON file, then command-line toggles.
pub fn load_model(args: &ParamsArgs) -> Result<ModelConfig, AppError> {
    let mut model = match &args.model_config {
        Some(path) => load_model_config(path)?,
        None => ModelConfig::default(),
    };
    if args.skip_hospitalizations {
        model.engine.compute_hospitalizations = false;
    }
    if args.ifr_decay && model.engine.ifr_schedule.is_none() {
        model.engine.ifr_schedule = Some(IfrSchedule::default());
    }
    Ok(model)
}

/// Execute one simulation end to end.
pub fn run_single(params: &ParameterSet, model: &ModelConfig) -> Result<SimulationTimeline, AppError> {
    let delays = build_delay_distributions(&model.delays)?;
    let rt = RtTrajectoryBuilder::new(params)
        .config(model.rt.clone())
        .build()?;
    let timeline = Engine::new(model.engine.clone()).run(params, &rt, &delays, params.population_size)?;

    info!(
        days = timeline.len(),
        infections = timeline.final_cumulative_infections(),
        deaths = timeline.final_cumulative_deaths(),
        "simulation finished"
    );

    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::Parser;

    use crate::cli::{Cli, Command};

    fn params_args(argv: &[&str]) -> ParamsArgs {
        let mut full = vec!["epi", "compare"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Compare(args) => args.params,
            _ => unreachable!(),
        }
    }

    #[test]
    fn sets_apply_before_changes() {
        let args = params_args(&[
            "--change",
            "DAILY_IMPORTS",
            "10",
            "--set",
            "DAILY_IMPORTS",
            "100",
        ]);
        let params = resolve_params(&args, AggregationMode::Mean).unwrap();
        assert_eq!(params.daily_imports, 110.0);
    }

    #[test]
    fn command_line_dates_and_quarantine_apply() {
        let args = params_args(&[
            "--simulation-end-date",
            "2020-06-30",
            "--quarantine-perc",
            "0.5",
            "--quarantine-effectiveness",
            "0.25",
        ]);
        let params = resolve_params(&args, AggregationMode::Mean).unwrap();
        assert_eq!(params.simulation_end_date, NaiveDate::from_ymd_opt(2020, 6, 30).unwrap());
        assert_eq!(params.quarantine_perc, 0.5);

        let timeline = run_single(&params, &load_model(&args).unwrap()).unwrap();
        assert_eq!(timeline.end_date(), params.simulation_end_date);
    }

    #[test]
    fn invalid_override_is_reported_before_running() {
        let args = params_args(&["--set", "RATE_OF_INFLECTION", "0"]);
        let err = resolve_params(&args, AggregationMode::Mean).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("RATE_OF_INFLECTION"), "{err}");
    }

    #[test]
    fn model_toggles_apply() {
        let args = params_args(&["--skip-hospitalizations", "--ifr-decay"]);
        let model = load_model(&args).unwrap();
        assert!(!model.engine.compute_hospitalizations);
        assert_eq!(model.engine.ifr_schedule, Some(IfrSchedule::default()));
    }
}
