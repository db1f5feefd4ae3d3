//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! The x axis is the day index; every series shares one y range.

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::domain::DayState;
use crate::ensemble::EnsembleSummary;
use crate::timeline::SimulationTimeline;

/// Which daily quantity to plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlotMetric {
    NewInfections,
    NewDeaths,
    NewReportedDeaths,
    ActiveHospitalizations,
    RtEffective,
}

impl PlotMetric {
    pub fn display_name(self) -> &'static str {
        match self {
            PlotMetric::NewInfections => "new infections",
            PlotMetric::NewDeaths => "new deaths",
            PlotMetric::NewReportedDeaths => "new reported deaths",
            PlotMetric::ActiveHospitalizations => "hospital beds in use",
            PlotMetric::RtEffective => "effective R",
        }
    }

    fn value(self, day: &DayState) -> f64 {
        match self {
            PlotMetric::NewInfections => day.new_infections,
            PlotMetric::NewDeaths => day.new_deaths,
            PlotMetric::NewReportedDeaths => day.new_reported_deaths,
            PlotMetric::ActiveHospitalizations => day.active_hospitalizations,
            PlotMetric::RtEffective => day.r_t_effective,
        }
    }
}

/// One drawn line.
struct Series<'a> {
    values: &'a [f64],
    glyph: char,
}

/// Plot one metric of a simulated timeline.
pub fn render_timeline_plot(timeline: &SimulationTimeline, metric: PlotMetric, width: usize, height: usize) -> String {
    let values = timeline.series(|d| metric.value(d));
    render_plot(
        metric.display_name(),
        (timeline.start_date(), timeline.end_date()),
        &[Series {
            values: &values,
            glyph: '-',
        }],
        width,
        height,
    )
}

/// Plot the ensemble median of daily infections with its 5-95% band.
pub fn render_band_plot(summary: &EnsembleSummary, width: usize, height: usize) -> String {
    let p50: Vec<f64> = summary.new_infections.iter().map(|b| b.p50).collect();
    let p5: Vec<f64> = summary.new_infections.iter().map(|b| b.p5).collect();
    let p95: Vec<f64> = summary.new_infections.iter().map(|b| b.p95).collect();
    let (Some(&start), Some(&end)) = (summary.dates.first(), summary.dates.last()) else {
        return String::from("Plot: (no days)\n");
    };

    render_plot(
        "new infections p50 (-) / p5..p95 (.)",
        (start, end),
        &[
            Series { values: &p50, glyph: '-' },
            Series { values: &p5, glyph: '.' },
            Series { values: &p95, glyph: '.' },
        ],
        width,
        height,
    )
}

fn render_plot(
    title: &str,
    dates: (NaiveDate, NaiveDate),
    series: &[Series<'_>],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Earlier series win overlapping cells.
    for s in series {
        draw_series(&mut grid, s, y_min, y_max);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {title} | days=[{}, {}] | y=[{y_min:.2}, {y_max:.2}]\n",
        dates.0, dates.1
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn y_range(series: &[Series<'_>]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &y in series.iter().flat_map(|s| s.values.iter()) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        // Flat series: give it a unit-height window.
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max, row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], series: &Series<'_>, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();
    let t_max = (series.values.len().saturating_sub(1)).max(1) as f64;

    let mut prev = None;
    for (i, &y) in series.values.iter().enumerate() {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let x = map_x(i as f64, 0.0, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, series.glyph),
            None if grid[yy][x] == ' ' => grid[yy][x] = series.glyph,
            None => {}
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 5).unwrap(),
        )
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let values = [0.0, 4.0, 8.0, 4.0, 0.0];
        let txt = render_plot("test", dates(), &[Series { values: &values, glyph: '-' }], 10, 5);
        let expected = concat!(
            "Plot: test | days=[2020-03-01, 2020-03-05] | y=[-0.40, 8.40]\n",
            "     -    \n",
            "   -- -   \n",
            "  -    -  \n",
            " -      - \n",
            "-        -\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn first_series_wins_overlaps() {
        let outer = [0.0, 4.0, 8.0, 4.0, 0.0];
        let inner = [0.0, 2.0, 4.0, 2.0, 0.0];
        let txt = render_plot(
            "band",
            dates(),
            &[
                Series { values: &outer, glyph: '-' },
                Series { values: &inner, glyph: '.' },
            ],
            10,
            5,
        );
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows[3], " -..  ..- ");
        assert_eq!(rows[4], "-       .-");
    }

    #[test]
    fn flat_series_is_drawn_mid_height() {
        let values = [1.0; 4];
        let txt = render_plot("flat", dates(), &[Series { values: &values, glyph: '-' }], 10, 5);
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows[2], "----------");
    }
}
