//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can
//! be:
//!
//! - used in-memory during aggregation and extrapolation
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::collections::BTreeMap;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Sentinel selection value meaning "do not filter on this key part".
pub const ALL: &str = "ALL";

/// One tracked metric.
///
/// Which metrics actually carry values depends on the data source: the CSSE
/// daily reports publish `confirmed`/`deaths`/`recovered`, the COVID Tracking
/// states API publishes `confirmed` (as "positive"), `deaths`, `negative`,
/// `pending`, and `total` (test results).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Confirmed,
    Deaths,
    Recovered,
    Negative,
    Pending,
    Total,
}

impl Metric {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Confirmed => "confirmed",
            Metric::Deaths => "deaths",
            Metric::Recovered => "recovered",
            Metric::Negative => "negative",
            Metric::Pending => "pending",
            Metric::Total => "total",
        }
    }
}

/// Which component of a `GeoKey` a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPart {
    Country,
    State,
    County,
}

/// Geographic identity of a record.
///
/// Empty string means "not applicable at this granularity" (e.g., county is
/// empty for non-US records). Multiple raw records may normalize to the same
/// key; aggregation combines them by key equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoKey {
    pub country: String,
    pub state: String,
    pub county: String,
}

impl GeoKey {
    pub fn country(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            state: String::new(),
            county: String::new(),
        }
    }

    pub fn part(&self, part: KeyPart) -> &str {
        match part {
            KeyPart::Country => &self.country,
            KeyPart::State => &self.state,
            KeyPart::County => &self.county,
        }
    }
}

/// One normalized raw record: a geographic key plus non-negative counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub key: GeoKey,
    pub values: BTreeMap<Metric, u64>,
    /// Free-text annotation stripped out of the state field during
    /// normalization (e.g., "From Diamond Princess").
    pub note: Option<String>,
}

/// All records for one calendar date.
///
/// A `DayBatch` exists only for days that fetched successfully; failed days
/// are never materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBatch {
    pub date: NaiveDate,
    pub records: Vec<MetricRecord>,
}

/// One point of a derived time series.
///
/// `previous` is an index into the owning `TimeSeries` (index 0 points at
/// itself) rather than a reference, so the chain stays a plain `Vec` with no
/// self-borrowing. A point never references a later index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub values: BTreeMap<Metric, f64>,
    pub previous: usize,
    pub predicted: bool,
}

impl SeriesPoint {
    /// Value of `metric`, if present and finite.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied().filter(|v| v.is_finite())
    }
}

/// A derived per-region time series, sorted by strictly increasing date.
///
/// Derivations are always recomputed from the immutable base dataset; a
/// `TimeSeries` shares no state with the `DayBatch`es it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of actual (non-predicted) points.
    pub fn actual_len(&self) -> usize {
        self.points.iter().filter(|p| !p.predicted).count()
    }

    pub fn previous(&self, idx: usize) -> &SeriesPoint {
        &self.points[self.points[idx].previous]
    }

    pub fn value(&self, idx: usize, metric: Metric) -> Option<f64> {
        self.points.get(idx).and_then(|p| p.value(metric))
    }

    /// Integer percent change vs the previous point, truncated toward zero.
    ///
    /// `None` when either value is missing/non-finite, the previous value is
    /// zero, or the value did not change (matching the chart's delta labels,
    /// which are only drawn for real transitions).
    pub fn delta_percent(&self, idx: usize, metric: Metric) -> Option<i64> {
        let cur = self.value(idx, metric)?;
        let prev = self.previous(idx).value(metric)?;
        if prev == 0.0 || cur == prev {
            return None;
        }
        Some(((cur - prev) / prev * 100.0) as i64)
    }

    pub fn last_actual(&self) -> Option<&SeriesPoint> {
        self.points.iter().rev().find(|p| !p.predicted)
    }
}

/// Which public dataset to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// CSSE daily reports (CSV, one file per day, global coverage).
    Csse,
    /// COVID Tracking Project states API (JSON, one request, US testing data).
    Tracking,
    /// Both providers, fetched concurrently and merged by date.
    Both,
}

impl DataSource {
    pub fn display_name(self) -> &'static str {
        match self {
            DataSource::Csse => "csse",
            DataSource::Tracking => "tracking",
            DataSource::Both => "csse+tracking",
        }
    }

    /// Metrics this source publishes.
    pub fn metrics(self) -> &'static [Metric] {
        match self {
            DataSource::Csse => &[Metric::Confirmed, Metric::Deaths, Metric::Recovered],
            DataSource::Tracking => &[
                Metric::Confirmed,
                Metric::Deaths,
                Metric::Negative,
                Metric::Pending,
                Metric::Total,
            ],
            DataSource::Both => &[
                Metric::Confirmed,
                Metric::Deaths,
                Metric::Recovered,
                Metric::Negative,
                Metric::Pending,
                Metric::Total,
            ],
        }
    }

    /// Cumulative metrics clamped to be non-decreasing day-over-day.
    ///
    /// Kept per-source on purpose: neither source clamps `recovered` or
    /// `total`, and that asymmetry is preserved as observed upstream.
    pub fn monotone_metrics(self) -> &'static [Metric] {
        match self {
            DataSource::Csse | DataSource::Tracking | DataSource::Both => {
                &[Metric::Confirmed, Metric::Deaths]
            }
        }
    }

    /// Metrics the trend extrapolator generates future values for.
    pub fn predictable_metrics(self) -> &'static [Metric] {
        self.monotone_metrics()
    }
}

/// Trend-fitting strategy, selected once per derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrendModel {
    /// Average of the last three day-over-day growth ratios.
    #[value(name = "ratio")]
    RatioAverage,
    /// Least-squares fit of `v = a·exp(b·t)` over the whole history.
    #[value(name = "exp")]
    ExpRegression,
}

impl TrendModel {
    pub fn display_name(self) -> &'static str {
        match self {
            TrendModel::RatioAverage => "ratio-average",
            TrendModel::ExpRegression => "exp-regression",
        }
    }
}

/// Render mode for the interactive view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Plot,
    Map,
}

/// The effective inputs of one derivation, as chosen by the user.
///
/// Derived series are recomputed from the base dataset whenever (and only
/// when) the cache key of this struct changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub country: String,
    pub state: String,
    pub county: String,
    pub metric: Metric,
    pub horizon: usize,
    pub model: TrendModel,
    pub log_scale: bool,
    pub show_deltas: bool,
    pub compare: Option<String>,
}

impl Selection {
    /// Stable key over all effective inputs, used to suppress redundant
    /// recomputation on rapid repeated interactions.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{:?}|{}|{}|{}",
            self.country,
            self.state,
            self.county,
            self.metric.display_name(),
            self.horizon,
            self.model,
            self.log_scale,
            self.show_deltas,
            self.compare.as_deref().unwrap_or(""),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: NaiveDate, confirmed: f64, previous: usize) -> SeriesPoint {
        SeriesPoint {
            date,
            values: BTreeMap::from([(Metric::Confirmed, confirmed)]),
            previous,
            predicted: false,
        }
    }

    #[test]
    fn delta_percent_truncates_toward_zero() {
        let d1 = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
        let series = TimeSeries {
            points: vec![point(d1, 300.0, 0), point(d2, 350.0, 0)],
        };
        // 50/300 = 16.66..% -> 16
        assert_eq!(series.delta_percent(1, Metric::Confirmed), Some(16));
    }

    #[test]
    fn delta_percent_skips_zero_baseline_and_flat_days() {
        let d1 = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
        let flat = TimeSeries {
            points: vec![point(d1, 10.0, 0), point(d2, 10.0, 0)],
        };
        assert_eq!(flat.delta_percent(1, Metric::Confirmed), None);

        let from_zero = TimeSeries {
            points: vec![point(d1, 0.0, 0), point(d2, 10.0, 0)],
        };
        assert_eq!(from_zero.delta_percent(1, Metric::Confirmed), None);
    }

    #[test]
    fn cache_key_changes_with_any_effective_input() {
        let base = Selection {
            country: "US".to_string(),
            state: ALL.to_string(),
            county: ALL.to_string(),
            metric: Metric::Confirmed,
            horizon: 0,
            model: TrendModel::RatioAverage,
            log_scale: false,
            show_deltas: false,
            compare: None,
        };
        let mut changed = base.clone();
        changed.horizon = 7;
        assert_ne!(base.cache_key(), changed.cache_key());
        assert_eq!(base.cache_key(), base.clone().cache_key());
    }
}
