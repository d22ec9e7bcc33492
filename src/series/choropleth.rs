//! Per-region fills for map mode.
//!
//! Map mode colors each US state by its latest value of a metric relative to
//! a reference threshold: a quarter of the national latest value. A state at
//! or above the threshold saturates the fill.

use crate::domain::{ALL, DataSource, DayBatch, KeyPart, Metric, TimeSeries};
use crate::error::AppError;
use crate::series::{chain, filter_by_key, group, list_keys, prune_empty, sanitize};

/// One region's fill: its latest value and the saturation ratio in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFill {
    pub name: String,
    pub latest: f64,
    pub ratio: f64,
}

/// Compute per-state fills for `metric`, sorted by latest value descending.
///
/// Empty output (no US data, or no state carries the metric) means map
/// rendering is skipped; it is not an error.
pub fn state_fills(
    days: &[DayBatch],
    source: DataSource,
    metric: Metric,
) -> Result<Vec<RegionFill>, AppError> {
    let us = filter_by_key(days, KeyPart::Country, "US");

    let Some(national) = latest_value(&us, source, metric, KeyPart::State, ALL)? else {
        return Ok(Vec::new());
    };
    let threshold = national / 4.0;

    let mut fills = Vec::new();
    for state in list_keys(&us, KeyPart::State) {
        let Some(latest) = latest_value(&us, source, metric, KeyPart::State, &state)? else {
            continue;
        };
        let ratio = if threshold > 0.0 {
            (latest / threshold).min(1.0)
        } else {
            0.0
        };
        fills.push(RegionFill {
            name: state,
            latest,
            ratio,
        });
    }

    fills.sort_by(|a, b| {
        b.latest
            .partial_cmp(&a.latest)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(fills)
}

/// Latest sanitized value of `metric` for one key selection, if any.
fn latest_value(
    days: &[DayBatch],
    source: DataSource,
    metric: Metric,
    part: KeyPart,
    value: &str,
) -> Result<Option<f64>, AppError> {
    let pruned = prune_empty(&filter_by_key(days, part, value));
    if pruned.is_empty() {
        return Ok(None);
    }
    let mut series: TimeSeries = chain(group(&pruned)?);
    sanitize(&mut series, source.monotone_metrics());
    Ok(series
        .points
        .last()
        .and_then(|p| p.value(metric)))
}
