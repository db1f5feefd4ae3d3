//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves the parameter set (file or built-in scenario, then overrides)
//! - runs the simulation (single run, ensemble, or aggregation comparison)
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing::info;

use crate::cli::{Command, CompareArgs, EnsembleArgs, PlotArgs, RtArgs, RunArgs};
use crate::ensemble::{EnsembleSpec, FallRange};
use crate::error::AppError;
use crate::params::AggregationMode;
use crate::rt::{FallWave, RtTrajectoryBuilder};
use crate::timeline::SimulationTimeline;

pub mod pipeline;

/// Entry point for the `epi` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args, cli.verbose),
        Command::Rt(args) => handle_rt(args),
        Command::Ensemble(args) => handle_ensemble(args),
        Command::Compare(args) => handle_compare(args),
    }
}

fn handle_run(args: RunArgs, verbose: bool) -> Result<(), AppError> {
    let params = pipeline::resolve_params(&args.params, args.params.best_params_type)?;
    let model = pipeline::load_model(&args.params)?;
    let show_hosp = model.engine.compute_hospitalizations;

    println!("{}", crate::report::format_parameters(&params));
    let timeline = pipeline::run_single(&params, &model)?;

    if verbose {
        print!("{}", crate::report::format_daily_table(&timeline, show_hosp));
    }
    println!("{}", crate::report::format_run_summary(&timeline, show_hosp));
    print_timeline_plot(&timeline, &args.plot);

    if let Some(path) = &args.export {
        crate::io::write_timeline_csv(path, &timeline)?;
        info!(path = %path.display(), "wrote timeline CSV");
    }
    if let Some(path) = &args.export_json {
        crate::io::write_timeline_json(path, &timeline)?;
        info!(path = %path.display(), "wrote timeline JSON");
    }

    Ok(())
}

fn handle_rt(args: RtArgs) -> Result<(), AppError> {
    let params = pipeline::resolve_params(&args.params, args.params.best_params_type)?;
    let model = pipeline::load_model(&args.params)?;

    let fall_wave = match args.fall_seed {
        Some(seed) => FallWave::seasonal(seed),
        None => FallWave::FromParameters,
    };
    let rt = RtTrajectoryBuilder::new(&params)
        .config(model.rt)
        .fall_wave(fall_wave)
        .build()?;

    print!("{}", crate::report::format_rt_table(&rt, args.step));
    Ok(())
}

fn handle_ensemble(args: EnsembleArgs) -> Result<(), AppError> {
    let params = pipeline::resolve_params(&args.params, args.params.best_params_type)?;
    let model = pipeline::load_model(&args.params)?;

    let spec = EnsembleSpec {
        params,
        model,
        members: args.members,
        base_seed: args.seed,
        fall: FallRange {
            low: args.fall_low,
            mode: args.fall_mode,
            high: args.fall_high,
        },
    };
    let summary = crate::ensemble::run_ensemble(&spec)?;

    println!("{}", crate::report::format_ensemble_summary(&summary));
    if !args.plot.no_plot {
        println!(
            "{}",
            crate::plot::render_band_plot(&summary, args.plot.width, args.plot.height)
        );
    }

    if let Some(path) = &args.export {
        crate::io::write_ensemble_csv(path, &summary)?;
        info!(path = %path.display(), "wrote ensemble CSV");
    }
    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    if args.params.best_params_dir.is_none() {
        return Err(AppError::new(
            3,
            "compare needs --best-params-dir (it runs every aggregate of one params file)",
        ));
    }
    let model = pipeline::load_model(&args.params)?;

    let variants = AggregationMode::ALL
        .into_iter()
        .map(|mode| {
            pipeline::resolve_params(&args.params, mode).map(|p| (mode.display_name().to_string(), p))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let runs = crate::ensemble::run_variants(&variants, &model)?;
    println!("{}", crate::report::format_comparison(&runs));
    Ok(())
}

fn print_timeline_plot(timeline: &SimulationTimeline, plot: &PlotArgs) {
    if plot.no_plot {
        return;
    }
    println!(
        "{}",
        crate::plot::render_timeline_plot(timeline, plot.plot_metric, plot.width, plot.height)
    );
}
