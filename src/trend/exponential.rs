//! Exponential-regression trend model.
//!
//! Fits `v = a·exp(b·t)` (t = days since the series start) by least squares
//! over every actual point with a finite positive value, linearized as
//! `ln v = ln a + b·t`. Future values evaluate the fit at `t = n, n+1, …`.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::domain::dates::next_day;
use crate::domain::{Metric, SeriesPoint, TimeSeries};
use crate::math::solve_least_squares;

pub(crate) fn extend(series: &mut TimeSeries, horizon: usize, metrics: &[Metric]) {
    let n = series.points.len();
    let fits: BTreeMap<Metric, Option<(f64, f64)>> = metrics
        .iter()
        .map(|&metric| (metric, fit_exponential(series, metric)))
        .collect();

    for step in 0..horizon {
        let prev_idx = series.points.len() - 1;
        let date = next_day(series.points[prev_idx].date);

        let values: BTreeMap<Metric, f64> = metrics
            .iter()
            .map(|&metric| {
                let value = match fits[&metric] {
                    Some((a, b)) => a * (b * (n + step) as f64).exp(),
                    None => f64::NAN,
                };
                (metric, value)
            })
            .collect();

        series.points.push(SeriesPoint {
            date,
            values,
            previous: prev_idx,
            predicted: true,
        });
    }
}

/// Fit `(a, b)` of `v = a·exp(b·t)`, or `None` when fewer than two usable
/// points exist or the regression fails.
fn fit_exponential(series: &TimeSeries, metric: Metric) -> Option<(f64, f64)> {
    let observations: Vec<(f64, f64)> = series
        .points
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.predicted)
        .filter_map(|(idx, p)| {
            let v = p.value(metric)?;
            (v > 0.0).then(|| (idx as f64, v.ln()))
        })
        .collect();

    if observations.len() < 2 {
        return None;
    }

    let rows = observations.len();
    let mut design = DMatrix::zeros(rows, 2);
    let mut y = DVector::zeros(rows);
    for (row, &(t, ln_v)) in observations.iter().enumerate() {
        design[(row, 0)] = 1.0;
        design[(row, 1)] = t;
        y[row] = ln_v;
    }

    let beta = solve_least_squares(&design, &y)?;
    Some((beta[0].exp(), beta[1]))
}
