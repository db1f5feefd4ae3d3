//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the engine and loaders stay free of presentation concerns
//! - output changes are localized (important for snapshot tests)

use crate::domain::{ParamName, ParameterSet};
use crate::ensemble::{EnsembleSummary, VariantRun};
use crate::rt::RtTrajectory;
use crate::timeline::SimulationTimeline;

/// Parameter listing shown before a run.
pub fn format_parameters(params: &ParameterSet) -> String {
    let mut out = String::new();
    out.push_str("Parameters:\n");
    for name in ParamName::ALL {
        out.push_str(&format!("{:<29} : {}\n", name.as_str(), params.get(name)));
    }
    out.push_str(&format!(
        "{:<29} : {}..={}\n",
        "simulation",
        params.simulation_start_date,
        params.simulation_end_date
    ));
    out.push_str(&format!(
        "{:<29} : {}\n",
        "population",
        fmt_count(params.population_size as f64)
    ));
    if params.quarantine_perc > 0.0 {
        out.push_str(&format!(
            "{:<29} : {:.0}% isolate, {:.0}% effective\n",
            "quarantine",
            params.quarantine_perc * 100.0,
            params.quarantine_effectiveness * 100.0
        ));
    }
    out
}

/// End-of-run totals.
pub fn format_run_summary(timeline: &SimulationTimeline, show_hospitalizations: bool) -> String {
    let mut out = String::new();
    out.push_str("-------------------------------------\n");
    if timeline.is_truncated() {
        out.push_str(&format!("Run cancelled after {} days\n", timeline.len()));
    }
    out.push_str(&format!("End of simulation       : {}\n", timeline.end_date()));
    out.push_str(&format!(
        "Total infections        : {}\n",
        fmt_count(timeline.final_cumulative_infections())
    ));
    if show_hospitalizations {
        if let Some(peak) = timeline.peak_active_hospitalizations() {
            out.push_str(&format!(
                "Peak hospital beds used : {} ({})\n",
                fmt_count(peak.active_hospitalizations),
                peak.date
            ));
        }
    }
    out.push_str(&format!(
        "Total deaths            : {}\n",
        fmt_count(timeline.final_cumulative_deaths())
    ));
    out.push_str(&format!(
        "Reported deaths         : {}\n",
        fmt_count(timeline.final_cumulative_reported_deaths())
    ));
    out.push_str(&format!(
        "Attack rate             : {:.2}%\n",
        timeline.attack_rate() * 100.0
    ));
    out
}

/// One line per simulated day.
pub fn format_daily_table(timeline: &SimulationTimeline, show_hospitalizations: bool) -> String {
    let mut out = String::new();
    for (i, d) in timeline.iter().enumerate() {
        let beds = if show_hospitalizations {
            format!("Hospital beds in use: {} - ", fmt_count(d.active_hospitalizations))
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{:<3} - {} - New / total infections: {} / {} - {beds}New / total deaths: {:.2} / {:.1} - Mean R: {:.3}\n",
            i + 1,
            d.date,
            fmt_count(d.new_infections),
            fmt_count(d.cumulative_infections),
            d.new_deaths,
            d.cumulative_deaths,
            d.r_t_effective,
        ));
    }
    out
}

/// `R_t` every `step` days (and always the last day).
pub fn format_rt_table(rt: &RtTrajectory, step: usize) -> String {
    let step = step.max(1);
    let mut out = String::new();
    out.push_str(&format!("fall multiplier: {:.5}\n", rt.fall_multiplier()));
    out.push_str(&format!("{:<10} {:>8}\n", "date", "R_t"));
    out.push_str(&format!("{:-<10} {:-<8}\n", "", ""));
    let last = rt.len().saturating_sub(1);
    for (i, (date, r)) in rt.iter().enumerate() {
        if i % step == 0 || i == last {
            out.push_str(&format!("{date:<10} {r:>8.3}\n"));
        }
    }
    out
}

/// Ensemble spread of the final totals plus the band at a few checkpoints.
pub fn format_ensemble_summary(summary: &EnsembleSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Ensemble members: {}\n", summary.members.len()));

    let mut finals = summary.final_infections();
    finals.sort_by(f64::total_cmp);
    if let (Some(lo), Some(hi)) = (finals.first(), finals.last()) {
        out.push_str(&format!(
            "Total infections range : {} .. {}\n",
            fmt_count(*lo),
            fmt_count(*hi)
        ));
    }

    out.push_str(&format!(
        "\n{:<10} {:>14} {:>14} {:>14} {:>12}\n",
        "date", "inf p5", "inf p50", "inf p95", "deaths p50"
    ));
    out.push_str(&format!("{:-<10} {:-<14} {:-<14} {:-<14} {:-<12}\n", "", "", "", "", ""));
    let step = (summary.len() / 10).max(1);
    let last = summary.len().saturating_sub(1);
    for (i, date) in summary.dates.iter().enumerate() {
        if i % step != 0 && i != last {
            continue;
        }
        let inf = summary.new_infections[i];
        let deaths = summary.cumulative_deaths[i];
        out.push_str(&format!(
            "{:<10} {:>14} {:>14} {:>14} {:>12}\n",
            date.to_string(),
            fmt_count(inf.p5),
            fmt_count(inf.p50),
            fmt_count(inf.p95),
            fmt_count(deaths.p50),
        ));
    }
    out
}

/// Side-by-side totals for labelled parameter variants.
pub fn format_comparison(runs: &[VariantRun]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:>16} {:>12} {:>16} {:>10}\n",
        "variant", "infections", "deaths", "peak beds", "attack"
    ));
    out.push_str(&format!("{:-<10} {:-<16} {:-<12} {:-<16} {:-<10}\n", "", "", "", "", ""));
    for run in runs {
        let t = &run.timeline;
        let beds = t
            .peak_active_hospitalizations()
            .map_or(0.0, |d| d.active_hospitalizations);
        out.push_str(&format!(
            "{:<10} {:>16} {:>12} {:>16} {:>9.2}%\n",
            truncate(&run.label, 10),
            fmt_count(t.final_cumulative_infections()),
            fmt_count(t.final_cumulative_deaths()),
            fmt_count(beds),
            t.attack_rate() * 100.0
        ));
    }
    out
}

/// Round to a whole number and group thousands with commas.
pub fn fmt_count(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let rounded = v.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::{DelayShapeConfig, build_delay_distributions};
    use crate::engine::run_simulation;
    use crate::rt::RtTrajectoryBuilder;

    fn run() -> (ParameterSet, RtTrajectory, SimulationTimeline) {
        let params = ParameterSet::default_scenario();
        let rt = RtTrajectoryBuilder::new(&params).build().unwrap();
        let delays = build_delay_distributions(&DelayShapeConfig::default()).unwrap();
        let timeline = run_simulation(&params, &rt, &delays, params.population_size).unwrap();
        (params, rt, timeline)
    }

    #[test]
    fn fmt_count_groups_thousands() {
        assert_eq!(fmt_count(0.0), "0");
        assert_eq!(fmt_count(999.4), "999");
        assert_eq!(fmt_count(1234.5), "1,235");
        assert_eq!(fmt_count(332_000_000.0), "332,000,000");
        assert_eq!(fmt_count(-45_678.0), "-45,678");
    }

    #[test]
    fn summary_lists_totals() {
        let (_, _, timeline) = run();
        let txt = format_run_summary(&timeline, true);
        assert!(txt.contains("End of simulation       : 2020-10-01"), "{txt}");
        assert!(txt.contains("Peak hospital beds used"));
        assert!(txt.contains("Reported deaths         : "), "{txt}");
        assert!(!format_run_summary(&timeline, false).contains("Peak hospital beds"));
    }

    #[test]
    fn daily_table_has_one_line_per_day() {
        let (params, _, timeline) = run();
        let txt = format_daily_table(&timeline, false);
        assert_eq!(txt.lines().count(), params.n_days());
        assert!(txt.lines().next().unwrap().starts_with("1   - 2020-02-01 - New / total infections: 500 / 500"));
        assert!(!txt.contains("Hospital beds"));
    }

    #[test]
    fn parameter_listing_uses_upper_case_keys() {
        let (params, rt, _) = run();
        let txt = format_parameters(&params);
        assert!(txt.contains("INFLECTION_DAY                : 2020-03-18"), "{txt}");
        assert!(txt.contains("population                    : 332,000,000"));

        let table = format_rt_table(&rt, 30);
        assert!(table.lines().any(|l| l.starts_with("2020-10-01")), "{table}");
    }

    #[test]
    fn truncate_marks_long_labels() {
        assert_eq!(truncate("median", 10), "median");
        assert_eq!(truncate("a-very-long-label", 6), "a-ver.");
    }
}
