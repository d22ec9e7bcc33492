//! ASCII/Unicode chart for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//!
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//!
//! - actual points: `o`, joined with `-` segments
//! - predicted points: `*`, joined with `.` (dashed) segments
//!
//! Non-finite values are omitted. On a linear scale, days at or below zero
//! are skipped (days before the first case); on a log scale the cutoff is 10.

use crate::domain::dates::days_between;
use crate::domain::{Metric, TimeSeries};

struct PlotPoint {
    x: f64,
    y: f64,
    value: f64,
    predicted: bool,
}

/// Render one series for `metric` into a `width` × `height` character grid.
pub fn render_series(
    series: &TimeSeries,
    metric: Metric,
    log_scale: bool,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let kept = plottable_points(series, metric, log_scale);
    if kept.len() < 2 {
        return "(no plottable points)\n".to_string();
    }

    let x_max = kept.last().map(|p| p.x).unwrap_or(1.0).max(1.0);
    let (y_min, y_max) = pad_range(
        kept.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
        kept.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max),
        0.05,
    );

    let mut grid = vec![vec![' '; width]; height];

    // Segments first, so markers can overlay.
    for pair in kept.windows(2) {
        let (x0, y0) = cell(&pair[0], x_max, y_min, y_max, width, height);
        let (x1, y1) = cell(&pair[1], x_max, y_min, y_max, width, height);
        let ch = if pair[1].predicted { '.' } else { '-' };
        draw_line(&mut grid, x0, y0, x1, y1, ch);
    }
    for p in &kept {
        let (x, y) = cell(p, x_max, y_min, y_max, width, height);
        grid[y][x] = if p.predicted { '*' } else { 'o' };
    }

    let first = series.points.first().map(|p| p.date);
    let last_kept_date = first
        .map(|f| f + chrono::Duration::days(x_max as i64))
        .unwrap_or_default();

    let mut out = String::new();
    let (value_min, value_max) = (
        kept.iter().map(|p| p.value).fold(f64::INFINITY, f64::min),
        kept.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max),
    );
    out.push_str(&format!(
        "Plot: {}..{} | {}=[{:.0}, {:.0}]{}\n",
        first.unwrap_or_default(),
        last_kept_date,
        metric.display_name(),
        value_min,
        value_max,
        if log_scale { " (log)" } else { "" },
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn plottable_points(series: &TimeSeries, metric: Metric, log_scale: bool) -> Vec<PlotPoint> {
    let Some(first_date) = series.points.first().map(|p| p.date) else {
        return Vec::new();
    };
    let cutoff = if log_scale { 10.0 } else { 0.0 };

    series
        .points
        .iter()
        .filter_map(|p| {
            let value = p.value(metric)?;
            if value <= cutoff {
                return None;
            }
            Some(PlotPoint {
                x: days_between(first_date, p.date) as f64,
                y: if log_scale { value.log10() } else { value },
                value,
                predicted: p.predicted,
            })
        })
        .collect()
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn cell(
    p: &PlotPoint,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
) -> (usize, usize) {
    let ux = (p.x / x_max).clamp(0.0, 1.0);
    let uy = ((p.y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    let x = (ux * (width as f64 - 1.0)).round() as usize;
    // y grows downward: the max value sits on row 0.
    let y = (height as f64 - 1.0 - uy * (height as f64 - 1.0)).round() as usize;
    (x, y)
}

/// Integer line drawing (Bresenham-ish); only fills empty cells.
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
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::SeriesPoint;

    fn series(values: &[(f64, bool)]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        TimeSeries {
            points: values
                .iter()
                .enumerate()
                .map(|(idx, &(v, predicted))| SeriesPoint {
                    date: start + chrono::Duration::days(idx as i64),
                    values: BTreeMap::from([(Metric::Confirmed, v)]),
                    previous: idx.saturating_sub(1),
                    predicted,
                })
                .collect(),
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let series = series(&[(100.0, false), (110.0, false)]);
        let txt = render_series(&series, Metric::Confirmed, false, 10, 5);
        let expected = concat!(
            "Plot: 2020-03-01..2020-03-02 | confirmed=[100, 110]\n",
            "        -o\n",
            "      --  \n",
            "    --    \n",
            "  --      \n",
            "o-        \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn predicted_points_render_dashed() {
        let series = series(&[(100.0, false), (110.0, false), (120.0, true)]);
        let txt = render_series(&series, Metric::Confirmed, false, 20, 8);
        assert!(txt.contains('*'), "predicted marker missing:\n{txt}");
        assert!(txt.contains('.'), "dashed segment missing:\n{txt}");
    }

    #[test]
    fn log_scale_drops_low_values() {
        let series = series(&[(5.0, false), (100.0, false), (1000.0, false)]);
        let txt = render_series(&series, Metric::Confirmed, true, 20, 8);
        // 5 <= 10 is cut; the header range starts at 100.
        assert!(txt.contains("confirmed=[100, 1000] (log)"), "{txt}");
    }

    #[test]
    fn non_finite_values_are_omitted() {
        let series = series(&[(100.0, false), (f64::NAN, true), (f64::NAN, true)]);
        let txt = render_series(&series, Metric::Confirmed, false, 10, 5);
        assert_eq!(txt, "(no plottable points)\n");
    }
}
