//! Ratio-average trend model.
//!
//! Each metric's growth rate is the average of the day-over-day ratios
//! `v[i] / v[previous(i)]` over the last three points; each future value is
//! `floor(previous * rate)`. Rates are fitted independently per metric.
//!
//! A zero baseline makes a ratio non-finite, which poisons the average and
//! with it every predicted value; that is the defined degradation (renderers
//! omit non-finite values). Fewer than two points leaves no real transition
//! to measure, so the rate is NaN as well.

use std::collections::BTreeMap;

use crate::domain::dates::next_day;
use crate::domain::{Metric, SeriesPoint, TimeSeries};

pub(crate) fn extend(series: &mut TimeSeries, horizon: usize, metrics: &[Metric]) {
    let rates: BTreeMap<Metric, f64> = metrics
        .iter()
        .map(|&metric| (metric, average_ratio(series, metric)))
        .collect();

    for _ in 0..horizon {
        let prev_idx = series.points.len() - 1;
        let prev_date = series.points[prev_idx].date;

        let values: BTreeMap<Metric, f64> = metrics
            .iter()
            .map(|&metric| {
                let base = series.points[prev_idx]
                    .values
                    .get(&metric)
                    .copied()
                    .unwrap_or(f64::NAN);
                (metric, (base * rates[&metric]).floor())
            })
            .collect();

        series.points.push(SeriesPoint {
            date: next_day(prev_date),
            values,
            previous: prev_idx,
            predicted: true,
        });
    }
}

/// Average day-over-day ratio over the last three points.
///
/// Only real transitions count (a point whose `previous` is itself has none);
/// with no transitions the rate is undefined.
fn average_ratio(series: &TimeSeries, metric: Metric) -> f64 {
    let n = series.points.len();
    let start = n.saturating_sub(3);

    let mut sum = 0.0;
    let mut count = 0usize;
    for idx in start..n {
        let prev_idx = series.points[idx].previous;
        if prev_idx == idx {
            continue;
        }
        let cur = series.points[idx].values.get(&metric).copied();
        let prev = series.points[prev_idx].values.get(&metric).copied();
        match (cur, prev) {
            (Some(cur), Some(prev)) => sum += cur / prev,
            _ => sum += f64::NAN,
        }
        count += 1;
    }

    if count == 0 {
        return f64::NAN;
    }
    sum / count as f64
}
