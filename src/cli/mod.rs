//! Command-line parsing for the renewal-equation simulator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the simulation code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::params::AggregationMode;
use crate::plot::PlotMetric;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "epi", version, about = "Renewal-equation epidemic simulator")]
pub struct Cli {
    /// Print per-day output and debug logs (EPI_LOG overrides the log filter).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate one parameter set and print totals (optionally plot/export).
    Run(RunArgs),
    /// Print the R_t trajectory only.
    Rt(RtArgs),
    /// Run a fall-wave ensemble in parallel and print percentile bands.
    Ensemble(EnsembleArgs),
    /// Run every aggregation mode of a best-params file side by side.
    Compare(CompareArgs),
}

/// Where parameters come from and how they are overridden.
#[derive(Debug, Args, Clone)]
pub struct ParamsArgs {
    /// Directory of best-params JSON files (uses the built-in US scenario if omitted).
    #[arg(long, value_name = "DIR")]
    pub best_params_dir: Option<PathBuf>,

    /// Which aggregate of the fitted samples to use.
    #[arg(long, value_enum, default_value_t = AggregationMode::Mean)]
    pub best_params_type: AggregationMode,

    #[arg(long, default_value = "US")]
    pub country: String,

    /// State or province (`ALL` for the whole country).
    #[arg(long)]
    pub region: Option<String>,

    /// County or city.
    #[arg(long)]
    pub subregion: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub simulation_start_date: Option<NaiveDate>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub simulation_end_date: Option<NaiveDate>,

    /// Replace a parameter: `--set REOPEN_R 1.1` (repeatable).
    #[arg(long = "set", num_args = 2, value_names = ["NAME", "VALUE"], action = ArgAction::Append)]
    pub set: Vec<String>,

    /// Add to a parameter (days for dates): `--change INFLECTION_DAY -7` (repeatable).
    #[arg(
        long = "change",
        num_args = 2,
        value_names = ["NAME", "DELTA"],
        action = ArgAction::Append,
        allow_hyphen_values = true
    )]
    pub change: Vec<String>,

    /// Fraction of infectious people who self-isolate.
    #[arg(long, default_value_t = 0.0)]
    pub quarantine_perc: f64,

    /// Transmission reduction for those who isolate.
    #[arg(long, default_value_t = 0.0)]
    pub quarantine_effectiveness: f64,

    /// JSON file replacing delay, R_t-shape or engine defaults.
    #[arg(long, value_name = "JSON")]
    pub model_config: Option<PathBuf>,

    /// Do not compute hospital admissions and bed occupancy.
    #[arg(long)]
    pub skip_hospitalizations: bool,

    /// Let the IFR improve over time (x0.995 per day after day 30, floor 0.3).
    #[arg(long)]
    pub ifr_decay: bool,
}

/// Plot options shared by commands that draw.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Quantity to plot.
    #[arg(long, value_enum, default_value_t = PlotMetric::NewInfections)]
    pub plot_metric: PlotMetric,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub params: ParamsArgs,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Export the per-day timeline to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the timeline to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RtArgs {
    #[command(flatten)]
    pub params: ParamsArgs,

    /// Print every N-th day.
    #[arg(long, default_value_t = 7)]
    pub step: usize,

    /// Draw the fall-wave multiplier from the seasonal range with this seed
    /// instead of using FALL_R_MULTIPLIER.
    #[arg(long)]
    pub fall_seed: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct EnsembleArgs {
    #[command(flatten)]
    pub params: ParamsArgs,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Number of members.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub members: usize,

    /// Member `i` uses seed `seed + i`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 0.998)]
    pub fall_low: f64,

    #[arg(long, default_value_t = 1.001)]
    pub fall_mode: f64,

    #[arg(long, default_value_t = 1.005)]
    pub fall_high: f64,

    /// Export per-day percentile bands to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub params: ParamsArgs,
}

/// Pair up the flat `NAME VALUE NAME VALUE ...` list clap collects.
pub fn pairs(flat: &[String]) -> Vec<(&str, &str)> {
    flat.chunks_exact(2)
        .map(|c| (c[0].as_str(), c[1].as_str()))
        .collect()
}
