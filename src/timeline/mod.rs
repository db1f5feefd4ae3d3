//! Simulation output container.
//!
//! A `SimulationTimeline` is produced once by the engine and never mutated.
//! It carries the population size so exporters and reports can derive shares
//! without going back to the parameter set.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::DayState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationTimeline {
    start_date: NaiveDate,
    population_size: u64,
    truncated: bool,
    days: Vec<DayState>,
}

impl SimulationTimeline {
    pub(crate) fn new(start_date: NaiveDate, population_size: u64, days: Vec<DayState>, truncated: bool) -> Self {
        Self {
            start_date,
            population_size,
            truncated,
            days,
        }
    }

    pub fn days(&self) -> &[DayState] {
        &self.days
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DayState> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Date of the last simulated day (the start date for an empty timeline).
    pub fn end_date(&self) -> NaiveDate {
        self.days.last().map_or(self.start_date, |d| d.date)
    }

    pub fn get(&self, index: usize) -> Option<&DayState> {
        self.days.get(index)
    }

    pub fn on(&self, date: NaiveDate) -> Option<&DayState> {
        let idx = usize::try_from((date - self.start_date).num_days()).ok()?;
        self.days.get(idx)
    }

    pub fn population_size(&self) -> u64 {
        self.population_size
    }

    /// `true` when the run was cancelled before reaching the end date.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn final_cumulative_infections(&self) -> f64 {
        self.days.last().map_or(0.0, |d| d.cumulative_infections)
    }

    pub fn final_cumulative_deaths(&self) -> f64 {
        self.days.last().map_or(0.0, |d| d.cumulative_deaths)
    }

    pub fn final_cumulative_reported_deaths(&self) -> f64 {
        self.days.last().map_or(0.0, |d| d.cumulative_reported_deaths)
    }

    pub fn peak_new_infections(&self) -> Option<&DayState> {
        self.days
            .iter()
            .max_by(|a, b| a.new_infections.total_cmp(&b.new_infections))
    }

    pub fn peak_active_hospitalizations(&self) -> Option<&DayState> {
        self.days
            .iter()
            .max_by(|a, b| a.active_hospitalizations.total_cmp(&b.active_hospitalizations))
    }

    /// Share of the population infected by the last day.
    pub fn attack_rate(&self) -> f64 {
        self.final_cumulative_infections() / self.population_size as f64
    }

    /// One value per day, extracted with `f`.
    pub fn series(&self, f: impl Fn(&DayState) -> f64) -> Vec<f64> {
        self.days.iter().map(f).collect()
    }
}

impl<'a> IntoIterator for &'a SimulationTimeline {
    type Item = &'a DayState;
    type IntoIter = std::slice::Iter<'a, DayState>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn day(start: NaiveDate, i: u64, new_inf: f64, cum_inf: f64, beds: f64) -> DayState {
        DayState {
            date: start + Days::new(i),
            r_t: 1.0,
            r_t_effective: 1.0,
            new_infections: new_inf,
            cumulative_infections: cum_inf,
            susceptible_remaining: 100.0 - cum_inf + new_inf,
            new_symptom_onsets: 0.0,
            new_hospitalizations: 0.0,
            active_hospitalizations: beds,
            new_deaths: 0.0,
            cumulative_deaths: cum_inf * 0.01,
            new_reported_deaths: 0.0,
            cumulative_reported_deaths: cum_inf * 0.005,
        }
    }

    fn sample() -> SimulationTimeline {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let days = vec![
            day(start, 0, 2.0, 2.0, 0.0),
            day(start, 1, 6.0, 8.0, 1.0),
            day(start, 2, 4.0, 12.0, 3.0),
        ];
        SimulationTimeline::new(start, 100, days, false)
    }

    #[test]
    fn accessors_report_final_and_peak_values() {
        let t = sample();
        assert_eq!(t.len(), 3);
        assert_eq!(t.end_date(), NaiveDate::from_ymd_opt(2020, 3, 3).unwrap());
        assert_eq!(t.final_cumulative_infections(), 12.0);
        assert!((t.final_cumulative_deaths() - 0.12).abs() < 1e-12);
        assert!((t.final_cumulative_reported_deaths() - 0.06).abs() < 1e-12);
        assert!((t.attack_rate() - 0.12).abs() < 1e-12);
        assert_eq!(t.peak_new_infections().unwrap().new_infections, 6.0);
        assert_eq!(t.peak_active_hospitalizations().unwrap().active_hospitalizations, 3.0);
        assert_eq!(t.series(|d| d.new_infections), vec![2.0, 6.0, 4.0]);
    }

    #[test]
    fn date_lookup_is_bounded() {
        let t = sample();
        let start = t.start_date();
        assert_eq!(t.on(start + Days::new(1)).unwrap().new_infections, 6.0);
        assert!(t.on(start + Days::new(3)).is_none());
        assert!(t.on(start - Days::new(1)).is_none());
    }

    #[test]
    fn empty_timeline_defaults() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let t = SimulationTimeline::new(start, 10, Vec::new(), true);
        assert!(t.is_empty());
        assert!(t.is_truncated());
        assert_eq!(t.end_date(), start);
        assert_eq!(t.final_cumulative_infections(), 0.0);
        assert!(t.peak_new_infections().is_none());
    }
}
