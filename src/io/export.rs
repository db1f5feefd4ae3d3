//! Export simulated timelines and ensemble bands.
//!
//! CSV exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per day, plain column names, no index column.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::ensemble::EnsembleSummary;
use crate::error::AppError;
use crate::timeline::SimulationTimeline;

#[derive(Serialize)]
struct TimelineRow {
    date: String,
    r_t: f64,
    r_t_effective: f64,
    new_infections: f64,
    cumulative_infections: f64,
    susceptible: f64,
    new_symptom_onsets: f64,
    new_hospitalizations: f64,
    active_hospitalizations: f64,
    new_deaths: f64,
    cumulative_deaths: f64,
    new_reported_deaths: f64,
    cumulative_reported_deaths: f64,
}

#[derive(Serialize)]
struct EnsembleRow {
    date: String,
    new_infections_p5: f64,
    new_infections_p50: f64,
    new_infections_p95: f64,
    cumulative_deaths_p5: f64,
    cumulative_deaths_p50: f64,
    cumulative_deaths_p95: f64,
}

/// Write one row per simulated day.
pub fn write_timeline_csv(path: &Path, timeline: &SimulationTimeline) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;
    for d in timeline {
        writer
            .serialize(TimelineRow {
                date: d.date.to_string(),
                r_t: d.r_t,
                r_t_effective: d.r_t_effective,
                new_infections: d.new_infections,
                cumulative_infections: d.cumulative_infections,
                susceptible: d.susceptible_remaining,
                new_symptom_onsets: d.new_symptom_onsets,
                new_hospitalizations: d.new_hospitalizations,
                active_hospitalizations: d.active_hospitalizations,
                new_deaths: d.new_deaths,
                cumulative_deaths: d.cumulative_deaths,
                new_reported_deaths: d.new_reported_deaths,
                cumulative_reported_deaths: d.cumulative_reported_deaths,
            })
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Write the full timeline (including population and truncation flag) as JSON.
pub fn write_timeline_json(path: &Path, timeline: &SimulationTimeline) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create timeline JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, timeline)
        .map_err(|e| AppError::new(2, format!("Failed to write timeline JSON: {e}")))
}

/// Write per-day ensemble percentile bands.
pub fn write_ensemble_csv(path: &Path, summary: &EnsembleSummary) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;
    let rows = summary
        .dates
        .iter()
        .zip(&summary.new_infections)
        .zip(&summary.cumulative_deaths);
    for ((date, inf), deaths) in rows {
        writer
            .serialize(EnsembleRow {
                date: date.to_string(),
                new_infections_p5: inf.p5,
                new_infections_p50: inf.p50,
                new_infections_p95: inf.p95,
                cumulative_deaths_p5: deaths.p5,
                cumulative_deaths_p50: deaths.p50,
                cumulative_deaths_p95: deaths.p95,
            })
            .map_err(|e| AppError::new(2, format!("Failed to write ensemble CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush ensemble CSV: {e}")))
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::{DelayShapeConfig, build_delay_distributions};
    use crate::domain::ParameterSet;
    use crate::engine::run_simulation;
    use crate::rt::RtTrajectoryBuilder;

    fn timeline() -> SimulationTimeline {
        let params = ParameterSet::default_scenario();
        let rt = RtTrajectoryBuilder::new(&params).build().unwrap();
        let delays = build_delay_distributions(&DelayShapeConfig::default()).unwrap();
        run_simulation(&params, &rt, &delays, params.population_size).unwrap()
    }

    #[test]
    fn timeline_csv_has_header_and_one_row_per_day() {
        let timeline = timeline();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_timeline_csv(&path, &timeline).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "date",
                "r_t",
                "r_t_effective",
                "new_infections",
                "cumulative_infections",
                "susceptible",
                "new_symptom_onsets",
                "new_hospitalizations",
                "active_hospitalizations",
                "new_deaths",
                "cumulative_deaths",
                "new_reported_deaths",
                "cumulative_reported_deaths",
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), timeline.len());
        assert_eq!(&rows[0][0], "2020-02-01");
        assert_eq!(&rows[rows.len() - 1][0], "2020-10-01");
        let last_cum: f64 = rows[rows.len() - 1][4].parse().unwrap();
        assert!((last_cum - timeline.final_cumulative_infections()).abs() < 1e-6 * last_cum.max(1.0));
    }

    #[test]
    fn timeline_json_round_trips_values() {
        let timeline = timeline();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_timeline_json(&path, &timeline).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["population_size"], 332_000_000u64);
        assert_eq!(value["truncated"], false);
        assert_eq!(value["days"].as_array().unwrap().len(), timeline.len());
        assert_eq!(value["days"][0]["date"], "2020-02-01");
    }

    #[test]
    fn ensemble_csv_writes_bands() {
        let spec = crate::ensemble::EnsembleSpec {
            params: ParameterSet::default_scenario(),
            model: crate::config::ModelConfig::default(),
            members: 3,
            base_seed: 1,
            fall: crate::ensemble::FallRange::default(),
        };
        let summary = crate::ensemble::run_ensemble(&spec).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.csv");
        write_ensemble_csv(&path, &summary).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(&reader.headers().unwrap()[1], "new_infections_p5");
        assert_eq!(reader.records().count(), summary.len());
    }

    #[test]
    fn export_to_missing_directory_fails_with_input_code() {
        let timeline = timeline();
        let dir = tempfile::tempdir().unwrap();
        let err = write_timeline_csv(&dir.path().join("nope/out.csv"), &timeline).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
