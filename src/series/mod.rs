//! The aggregation pipeline.
//!
//! Pure transformations over an immutable dataset of `DayBatch`es:
//!
//! filter → prune → group → chain → sanitize
//!
//! Nothing here mutates its input; every UI interaction re-derives a fresh
//! `TimeSeries` from the base dataset.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{ALL, DayBatch, KeyPart, Metric, SeriesPoint, TimeSeries};
use crate::error::AppError;

pub mod choropleth;

pub use choropleth::{RegionFill, state_fills};

/// Restrict each day's records to those whose key `part` equals `value`.
///
/// The literal `"ALL"` is the identity transform, not a filter-to-empty.
pub fn filter_by_key(days: &[DayBatch], part: KeyPart, value: &str) -> Vec<DayBatch> {
    if value == ALL {
        return days.to_vec();
    }
    days.iter()
        .map(|batch| DayBatch {
            date: batch.date,
            records: batch
                .records
                .iter()
                .filter(|r| r.key.part(part) == value)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Drop leading and trailing days with no records, until both ends are
/// non-empty (or nothing remains).
pub fn prune_empty(days: &[DayBatch]) -> Vec<DayBatch> {
    let first = days.iter().position(|b| !b.records.is_empty());
    let last = days.iter().rposition(|b| !b.records.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => days[first..=last].to_vec(),
        _ => Vec::new(),
    }
}

/// Distinct non-empty values of a key part, sorted (for selection controls).
pub fn list_keys(days: &[DayBatch], part: KeyPart) -> Vec<String> {
    let set: BTreeSet<&str> = days
        .iter()
        .flat_map(|b| &b.records)
        .map(|r| r.key.part(part))
        .filter(|v| !v.is_empty())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// Sum every metric across a day's records into one synthetic row per day.
///
/// The summed metric set is taken from the last day's first record; metrics
/// absent there are silently dropped. Callers must prune trailing empty days
/// first; an empty final day is a precondition violation.
pub fn group(days: &[DayBatch]) -> Result<Vec<(NaiveDate, BTreeMap<Metric, u64>)>, AppError> {
    let template = days
        .last()
        .and_then(|b| b.records.first())
        .ok_or_else(|| {
            AppError::new(3, "Cannot group an empty dataset; prune empty days first.")
        })?;
    let metric_set: Vec<Metric> = template.values.keys().copied().collect();

    Ok(days
        .iter()
        .map(|batch| {
            let mut totals: BTreeMap<Metric, u64> =
                metric_set.iter().map(|&m| (m, 0u64)).collect();
            for record in &batch.records {
                for (metric, total) in totals.iter_mut() {
                    *total += record.values.get(metric).copied().unwrap_or(0);
                }
            }
            (batch.date, totals)
        })
        .collect())
}

/// Link grouped days into a `TimeSeries` chain.
///
/// `previous` is the prior index; index 0 points at itself.
pub fn chain(grouped: Vec<(NaiveDate, BTreeMap<Metric, u64>)>) -> TimeSeries {
    let points = grouped
        .into_iter()
        .enumerate()
        .map(|(idx, (date, values))| SeriesPoint {
            date,
            values: values.into_iter().map(|(m, v)| (m, v as f64)).collect(),
            previous: idx.saturating_sub(1),
            predicted: false,
        })
        .collect();
    TimeSeries { points }
}

/// Clamp each monotone metric to be non-decreasing, in date order, so the
/// clamp propagates forward (10, 20, 15 becomes 10, 20, 20).
///
/// Idempotent: a second pass changes nothing.
pub fn sanitize(series: &mut TimeSeries, monotone: &[Metric]) {
    for idx in 0..series.points.len() {
        let prev_idx = series.points[idx].previous;
        for &metric in monotone {
            let Some(prev) = series.points[prev_idx].values.get(&metric).copied() else {
                continue;
            };
            if let Some(value) = series.points[idx].values.get_mut(&metric) {
                if *value < prev {
                    *value = prev;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeoKey, MetricRecord};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn us_record(state: &str, county: &str, confirmed: u64) -> MetricRecord {
        MetricRecord {
            key: GeoKey {
                country: "US".to_string(),
                state: state.to_string(),
                county: county.to_string(),
            },
            values: BTreeMap::from([
                (Metric::Confirmed, confirmed),
                (Metric::Deaths, confirmed / 10),
            ]),
            note: None,
        }
    }

    fn batch(d: u32, records: Vec<MetricRecord>) -> DayBatch {
        DayBatch {
            date: date(d),
            records,
        }
    }

    #[test]
    fn filter_all_is_identity() {
        let days = vec![
            batch(1, vec![us_record("California", "", 10)]),
            batch(2, vec![us_record("Washington", "", 20)]),
        ];
        assert_eq!(filter_by_key(&days, KeyPart::State, ALL), days);
    }

    #[test]
    fn filter_restricts_by_part() {
        let days = vec![batch(
            1,
            vec![
                us_record("California", "", 10),
                us_record("Washington", "", 20),
            ],
        )];
        let filtered = filter_by_key(&days, KeyPart::State, "California");
        assert_eq!(filtered[0].records.len(), 1);
        assert_eq!(filtered[0].records[0].key.state, "California");
    }

    #[test]
    fn prune_drops_leading_and_trailing_empties() {
        let days = vec![
            batch(1, vec![]),
            batch(2, vec![]),
            batch(3, vec![us_record("California", "", 1)]),
            batch(4, vec![us_record("California", "", 2)]),
            batch(5, vec![]),
        ];
        let pruned = prune_empty(&days);
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned[0].date, date(3));
        assert_eq!(pruned[1].date, date(4));

        assert!(prune_empty(&[batch(1, vec![])]).is_empty());
    }

    #[test]
    fn group_metric_set_comes_from_last_day_first_record() {
        // Day 1 carries Recovered; the last day's first record does not, so
        // Recovered is dropped from the grouped output.
        let mut rich = us_record("California", "", 5);
        rich.values.insert(Metric::Recovered, 2);
        let days = vec![
            batch(1, vec![rich]),
            batch(2, vec![us_record("California", "", 7)]),
        ];
        let grouped = group(&days).unwrap();
        let metrics: Vec<Metric> = grouped[0].1.keys().copied().collect();
        assert_eq!(metrics, vec![Metric::Confirmed, Metric::Deaths]);
    }

    #[test]
    fn group_sums_across_records() {
        let days = vec![batch(
            1,
            vec![
                us_record("California", "Los Angeles", 10),
                us_record("California", "Orange", 30),
            ],
        )];
        let grouped = group(&days).unwrap();
        assert_eq!(grouped[0].1[&Metric::Confirmed], 40);
    }

    #[test]
    fn group_on_empty_final_day_is_an_error() {
        assert!(group(&[batch(1, vec![])]).is_err());
        assert!(group(&[]).is_err());
    }

    #[test]
    fn chain_links_previous_indices() {
        let days = vec![
            batch(1, vec![us_record("California", "", 1)]),
            batch(2, vec![us_record("California", "", 2)]),
        ];
        let series = chain(group(&days).unwrap());
        assert_eq!(series.points[0].previous, 0);
        assert_eq!(series.points[1].previous, 0);
        assert!(series.points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn sanitize_clamps_and_propagates() {
        // Confirmed dips 10, 20, 15: day 3 must clamp to 20.
        let days = vec![
            batch(1, vec![us_record("California", "Los Angeles", 10)]),
            batch(2, vec![us_record("California", "Los Angeles", 20)]),
            batch(3, vec![us_record("California", "Los Angeles", 15)]),
        ];
        let filtered = filter_by_key(&days, KeyPart::State, "California");
        let mut series = chain(group(&prune_empty(&filtered)).unwrap());
        sanitize(&mut series, &[Metric::Confirmed, Metric::Deaths]);

        assert_eq!(series.value(2, Metric::Confirmed), Some(20.0));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let days = vec![
            batch(1, vec![us_record("California", "", 30)]),
            batch(2, vec![us_record("California", "", 10)]),
            batch(3, vec![us_record("California", "", 25)]),
        ];
        let mut once = chain(group(&days).unwrap());
        sanitize(&mut once, &[Metric::Confirmed]);
        let mut twice = once.clone();
        sanitize(&mut twice, &[Metric::Confirmed]);
        assert_eq!(once, twice);
    }

    #[test]
    fn leading_empty_days_prune_before_grouping() {
        // Key matches nothing on days 1-2, everything on days 3-5.
        let days = vec![
            batch(1, vec![us_record("Washington", "", 1)]),
            batch(2, vec![us_record("Washington", "", 2)]),
            batch(3, vec![us_record("California", "", 3)]),
            batch(4, vec![us_record("California", "", 4)]),
            batch(5, vec![us_record("California", "", 5)]),
        ];
        let filtered = filter_by_key(&days, KeyPart::State, "California");
        let pruned = prune_empty(&filtered);
        assert_eq!(pruned.len(), 3);
        let grouped = group(&pruned).unwrap();
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].0, date(3));
    }

    #[test]
    fn list_keys_sorted_distinct_non_empty() {
        let days = vec![batch(
            1,
            vec![
                us_record("Washington", "", 1),
                us_record("California", "", 2),
                us_record("California", "", 3),
                us_record("", "", 4),
            ],
        )];
        assert_eq!(
            list_keys(&days, KeyPart::State),
            vec!["California".to_string(), "Washington".to_string()]
        );
    }
}
