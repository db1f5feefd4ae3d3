//! Best-params file loading.
//!
//! A best-params file is the JSON written by the fitting pipeline for one region:
//!
//! ```json
//! {
//!   "first_date": "2020-02-01",
//!   "date": "2020-06-15",
//!   "projection_end_date": "2020-10-01",
//!   "population": 39512223,
//!   "mean_params": [["INITIAL_R_0", 2.2], ["INFLECTION_DAY", "2020-03-18"], ...],
//!   "median_params": [...], "top_params": [...], "top10_params": [...]
//! }
//! ```
//!
//! Lookups follow the directory layout of the published parameter sets
//! (`subregion/`, `global/`, and US states at the top level).

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ParamName, ParamValue, ParameterSet};
use crate::error::{AppError, SimError};

/// Which aggregate of the underlying samples to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    Mean,
    Median,
    Top,
    Top10,
}

impl AggregationMode {
    pub const ALL: [AggregationMode; 4] = [
        AggregationMode::Mean,
        AggregationMode::Median,
        AggregationMode::Top,
        AggregationMode::Top10,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            AggregationMode::Mean => "mean",
            AggregationMode::Median => "median",
            AggregationMode::Top => "top",
            AggregationMode::Top10 => "top10",
        }
    }

    fn key(self) -> &'static str {
        match self {
            AggregationMode::Mean => "mean_params",
            AggregationMode::Median => "median_params",
            AggregationMode::Top => "top_params",
            AggregationMode::Top10 => "top10_params",
        }
    }
}

type ParamPairs = Vec<(String, ParamValue)>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BestParamsFile {
    pub first_date: NaiveDate,
    /// Date the parameters were fitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub projection_end_date: NaiveDate,
    pub population: f64,
    #[serde(default)]
    pub mean_params: Option<ParamPairs>,
    #[serde(default)]
    pub median_params: Option<ParamPairs>,
    #[serde(default)]
    pub top_params: Option<ParamPairs>,
    #[serde(default)]
    pub top10_params: Option<ParamPairs>,
}

impl BestParamsFile {
    pub fn pairs(&self, mode: AggregationMode) -> Option<&[(String, ParamValue)]> {
        let pairs = match mode {
            AggregationMode::Mean => &self.mean_params,
            AggregationMode::Median => &self.median_params,
            AggregationMode::Top => &self.top_params,
            AggregationMode::Top10 => &self.top10_params,
        };
        pairs.as_deref()
    }

    /// Build a full `ParameterSet` from one aggregate.
    ///
    /// Every named parameter must be present exactly as listed in `ParamName::ALL`;
    /// quarantine settings are run-scoped and start at zero.
    pub fn parameter_set(&self, mode: AggregationMode) -> Result<ParameterSet, AppError> {
        let pairs = self.pairs(mode).ok_or_else(|| {
            AppError::new(3, format!("Params file has no '{}' list.", mode.key()))
        })?;

        if !(self.population.is_finite() && self.population >= 1.0) {
            return Err(AppError::new(
                3,
                format!("Params file population must be >= 1, got {}", self.population),
            ));
        }

        let mut params = ParameterSet {
            simulation_start_date: self.first_date,
            simulation_end_date: self.projection_end_date,
            population_size: self.population.round() as u64,
            quarantine_perc: 0.0,
            quarantine_effectiveness: 0.0,
            ..ParameterSet::default_scenario()
        };

        let source_err = |e: SimError| AppError::new(3, e.to_string());
        let mut seen = HashSet::new();
        for (raw_name, value) in pairs {
            let name: ParamName = raw_name.parse().map_err(source_err)?;
            params = params.with(name, *value).map_err(source_err)?;
            seen.insert(name);
        }
        let missing: Vec<&str> = ParamName::ALL
            .iter()
            .filter(|n| !seen.contains(*n))
            .map(|n| n.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::new(
                3,
                format!("Params file '{}' list is missing: {}", mode.key(), missing.join(", ")),
            ));
        }

        params.validate().map_err(source_err)?;
        Ok(params)
    }
}

pub fn load_params_file(path: &Path) -> Result<BestParamsFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(3, format!("Failed to open params file '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(3, format!("Invalid params file '{}': {e}", path.display())))
}

/// Locate the single best-params file for a region.
///
/// - US state:      `{dir}/*US_{region}.json` (or `*US_ALL.json` for the whole country)
/// - US county:     `{dir}/subregion/*US_{region}_{subregion}.json`
/// - other country: `{dir}/global/*{country}_ALL.json`
/// - other region:  `{dir}/subregion/*{country}_{subregion}.json`
///
/// Spaces in names become dashes; dotfiles are ignored.
pub fn resolve_params_file(
    dir: &Path,
    country: &str,
    region: Option<&str>,
    subregion: Option<&str>,
) -> Result<PathBuf, AppError> {
    if !dir.is_dir() {
        return Err(AppError::new(
            3,
            format!("Params directory does not exist: {}", dir.display()),
        ));
    }
    let country = dashed(country);
    let region = region.map(dashed).filter(|r| !r.is_empty());
    let subregion = subregion.map(dashed).filter(|s| !s.is_empty());
    if country.is_empty() {
        return Err(AppError::new(3, "Need a country to load a params file."));
    }

    let (search_dir, suffix) = match (country.as_str(), region.as_deref(), subregion.as_deref()) {
        ("US", Some(r), Some(s)) => (dir.join("subregion"), format!("US_{r}_{s}.json")),
        ("US", None, Some(_)) => {
            return Err(AppError::new(3, "A US subregion needs its state (--region)."));
        }
        (c, _, Some(s)) => (dir.join("subregion"), format!("{c}_{s}.json")),
        ("US", Some(r), None) => (dir.to_path_buf(), format!("US_{r}.json")),
        ("US", None, None) => (dir.to_path_buf(), "US_ALL.json".to_string()),
        (c, None | Some("ALL"), None) => (dir.join("global"), format!("{c}_ALL.json")),
        (c, Some(r), None) => {
            return Err(AppError::new(3, format!("Region not supported for {c}: {r}")));
        }
    };

    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&search_dir.display().to_string()),
        glob::Pattern::escape(&suffix)
    );
    // Dotfiles never match `*`.
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let paths = glob::glob_with(&pattern, options)
        .map_err(|e| AppError::new(3, format!("Invalid params file pattern '{pattern}': {e}")))?;
    let mut matches: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    matches.sort();

    match matches.len() {
        0 => Err(AppError::new(3, format!("File not found: {pattern}"))),
        1 => {
            let path = matches.remove(0);
            info!(path = %path.display(), "loading params file");
            Ok(path)
        }
        _ => {
            let names: Vec<String> = matches.iter().map(|p| p.display().to_string()).collect();
            Err(AppError::new(3, format!("Multiple files: {}", names.join(", "))))
        }
    }
}

fn dashed(name: &str) -> String {
    name.trim().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PAIRS: &str = r#"[
        ["INITIAL_R_0", 2.5], ["LOCKDOWN_R_0", 0.8], ["INFLECTION_DAY", "2020-03-20"],
        ["RATE_OF_INFLECTION", 0.3], ["LOCKDOWN_FATIGUE", 1.0], ["DAILY_IMPORTS", 200],
        ["MORTALITY_RATE", 0.008], ["REOPEN_DATE", "2020-05-15"], ["REOPEN_SHIFT_DAYS", 3],
        ["REOPEN_R", 1.1], ["REOPEN_INFLECTION", 0.25], ["POST_REOPEN_EQUILIBRIUM_R", 1.0],
        ["FALL_R_MULTIPLIER", 1.002]
    ]"#;

    fn sample_json() -> String {
        format!(
            r#"{{"first_date": "2020-02-10", "date": "2020-07-01",
                "projection_end_date": "2020-11-01", "population": 39512223,
                "mean_params": {PAIRS}, "top_params": [["INITIAL_R_0", 2.5]]}}"#
        )
    }

    #[test]
    fn builds_parameter_set_from_mean_params() {
        let file: BestParamsFile = serde_json::from_str(&sample_json()).unwrap();
        let params = file.parameter_set(AggregationMode::Mean).unwrap();
        assert_eq!(params.initial_r_0, 2.5);
        assert_eq!(params.daily_imports, 200.0);
        assert_eq!(params.reopen_shift_days, 3.0);
        assert_eq!(params.inflection_day, NaiveDate::from_ymd_opt(2020, 3, 20).unwrap());
        assert_eq!(params.simulation_start_date, NaiveDate::from_ymd_opt(2020, 2, 10).unwrap());
        assert_eq!(params.simulation_end_date, NaiveDate::from_ymd_opt(2020, 11, 1).unwrap());
        assert_eq!(params.population_size, 39_512_223);
    }

    #[test]
    fn incomplete_or_absent_lists_are_parameter_source_errors() {
        let file: BestParamsFile = serde_json::from_str(&sample_json()).unwrap();

        let err = file.parameter_set(AggregationMode::Top).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("missing: LOCKDOWN_R_0"), "{err}");

        let err = file.parameter_set(AggregationMode::Median).unwrap_err();
        assert!(err.to_string().contains("median_params"), "{err}");
    }

    #[test]
    fn unknown_param_name_is_rejected() {
        let json = r#"{"first_date": "2020-02-10", "projection_end_date": "2020-11-01",
            "population": 1000, "mean_params": [["SPEED_OF_LIGHT", 3.0]]}"#;
        let file: BestParamsFile = serde_json::from_str(json).unwrap();
        let err = file.parameter_set(AggregationMode::Mean).unwrap_err();
        assert!(err.to_string().contains("Unrecognized param: SPEED_OF_LIGHT"), "{err}");
    }

    #[test]
    fn resolves_files_by_region() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir(dir.join("global")).unwrap();
        fs::create_dir(dir.join("subregion")).unwrap();
        fs::write(dir.join("2020-07-01_US_CA.json"), sample_json()).unwrap();
        fs::write(dir.join("2020-07-01_US_ALL.json"), sample_json()).unwrap();
        fs::write(dir.join("global/2020-07-01_South-Korea_ALL.json"), sample_json()).unwrap();
        fs::write(dir.join("subregion/2020-07-01_US_NY_New-York.json"), sample_json()).unwrap();

        let ca = resolve_params_file(dir, "US", Some("CA"), None).unwrap();
        assert!(ca.ends_with("2020-07-01_US_CA.json"));
        let us = resolve_params_file(dir, "US", None, None).unwrap();
        assert!(us.ends_with("2020-07-01_US_ALL.json"));
        let kr = resolve_params_file(dir, "South Korea", None, None).unwrap();
        assert!(kr.ends_with("global/2020-07-01_South-Korea_ALL.json"));
        let nyc = resolve_params_file(dir, "US", Some("NY"), Some("New York")).unwrap();
        assert!(nyc.ends_with("subregion/2020-07-01_US_NY_New-York.json"));

        let loaded = load_params_file(&ca).unwrap();
        assert_eq!(loaded.population, 39_512_223.0);
    }

    #[test]
    fn missing_and_ambiguous_files_are_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("a_US_TX.json"), "{}").unwrap();
        fs::write(dir.join("b_US_TX.json"), "{}").unwrap();

        let err = resolve_params_file(dir, "US", Some("WA"), None).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("File not found"), "{err}");

        let err = resolve_params_file(dir, "US", Some("TX"), None).unwrap_err();
        assert!(err.to_string().starts_with("Multiple files"), "{err}");

        let err = resolve_params_file(&dir.join("nope"), "US", None, None).unwrap_err();
        assert!(err.to_string().contains("does not exist"), "{err}");

        let err = load_params_file(&dir.join("a_US_TX.json")).unwrap_err();
        assert!(err.to_string().contains("Invalid params file"), "{err}");
    }

    #[test]
    fn hidden_files_are_not_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("2020-07-01_US_CA.json"), sample_json()).unwrap();
        fs::write(dir.join("._2020-07-01_US_CA.json"), "\0\0").unwrap();

        let path = resolve_params_file(dir, "US", Some("CA"), None).unwrap();
        assert_eq!(path.file_name().unwrap(), "2020-07-01_US_CA.json");
    }
}
