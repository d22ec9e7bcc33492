//! Trend extrapolation.
//!
//! Given a sanitized series, synthesize `horizon` future points by one of two
//! strategies (a tagged choice, selected once per derivation):
//!
//! - `ratio`: average of the last three day-over-day growth ratios
//! - `exp`: least-squares exponential regression over the whole history
//!
//! Predicted points are flagged, chain onto the immediately preceding point
//! (real or synthetic), and may carry non-finite values when the rate is
//! undefined (too little history, or a zero baseline under the ratio model).
//! Renderers omit non-finite values; extrapolation never errors.

use crate::domain::{Metric, TimeSeries, TrendModel};

pub mod exponential;
pub mod ratio;

/// Append `horizon` predicted points for each of `metrics`.
///
/// A horizon of 0 disables extrapolation. Metrics outside `metrics` are
/// absent from predicted points.
pub fn extrapolate(series: &mut TimeSeries, model: TrendModel, horizon: usize, metrics: &[Metric]) {
    if horizon == 0 || series.is_empty() {
        return;
    }
    match model {
        TrendModel::RatioAverage => ratio::extend(series, horizon, metrics),
        TrendModel::ExpRegression => exponential::extend(series, horizon, metrics),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use crate::domain::{Metric, SeriesPoint, TimeSeries};

    /// Build an actual-only confirmed series from consecutive daily values.
    pub fn confirmed_series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(idx, &v)| SeriesPoint {
                date: start + chrono::Duration::days(idx as i64),
                values: BTreeMap::from([(Metric::Confirmed, v)]),
                previous: idx.saturating_sub(1),
                predicted: false,
            })
            .collect();
        TimeSeries { points }
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::confirmed_series;
    use super::*;

    #[test]
    fn zero_horizon_is_a_no_op() {
        let mut series = confirmed_series(&[100.0, 150.0, 225.0]);
        let before = series.clone();
        extrapolate(&mut series, TrendModel::RatioAverage, 0, &[Metric::Confirmed]);
        assert_eq!(series, before);
    }

    #[test]
    fn predicted_points_chain_onto_the_tail() {
        let mut series = confirmed_series(&[100.0, 150.0, 225.0]);
        extrapolate(&mut series, TrendModel::RatioAverage, 2, &[Metric::Confirmed]);

        assert_eq!(series.len(), 5);
        assert_eq!(series.actual_len(), 3);
        assert!(series.points[3].predicted && series.points[4].predicted);
        assert_eq!(series.points[3].previous, 2);
        assert_eq!(series.points[4].previous, 3);
        assert!(series.points.windows(2).all(|w| w[0].date < w[1].date));
    }
}
