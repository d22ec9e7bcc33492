//! Data fetching.
//!
//! - static reference data (`lookup`)
//! - the CSSE daily-report archive (`csse`, one CSV per day)
//! - the COVID Tracking states API (`tracking`, one JSON request)
//! - source dispatch and the per-day join/trim helpers (this module)
//!
//! The lookup table always loads before any data fetch; its failure is fatal.
//! Individual day failures are silent and local.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{DataSource, DayBatch, MetricRecord};
use crate::error::AppError;

pub mod csse;
pub mod lookup;
pub mod tracking;

pub use csse::CsseClient;
pub use lookup::StateLookup;
pub use tracking::TrackingClient;

/// Fetch the selected source(s) for `[first, last]`.
///
/// `Both` fans out one fetch per source and joins them, merging batches by
/// date.
pub fn load(
    source: DataSource,
    lookup: &StateLookup,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<DayBatch>, AppError> {
    match source {
        DataSource::Csse => CsseClient::from_env()?.fetch_range(lookup, first, last),
        DataSource::Tracking => TrackingClient::from_env()?.fetch_daily(lookup, first, last),
        DataSource::Both => {
            let (csse, tracking) = rayon::join(
                || CsseClient::from_env()?.fetch_range(lookup, first, last),
                || TrackingClient::from_env()?.fetch_daily(lookup, first, last),
            );
            Ok(merge_by_date(csse?, tracking?))
        }
    }
}

/// Drop the trailing run of failed days, then discard interior failures.
///
/// Only the trailing run is trimmed as a run: a mid-range failed day leaves a
/// gap (the day is simply absent) while the days after it are kept. The
/// common case this handles is the current day's report not being published
/// yet.
pub fn trim_trailing_failures(mut days: Vec<Option<DayBatch>>) -> Vec<DayBatch> {
    while matches!(days.last(), Some(None)) {
        days.pop();
    }
    days.into_iter().flatten().collect()
}

/// Merge two date-ordered datasets, concatenating records on shared dates.
pub fn merge_by_date(a: Vec<DayBatch>, b: Vec<DayBatch>) -> Vec<DayBatch> {
    let mut by_date: BTreeMap<NaiveDate, Vec<MetricRecord>> = BTreeMap::new();
    for batch in a.into_iter().chain(b) {
        by_date.entry(batch.date).or_default().extend(batch.records);
    }
    by_date
        .into_iter()
        .map(|(date, records)| DayBatch { date, records })
        .collect()
}
