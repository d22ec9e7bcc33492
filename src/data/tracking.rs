//! COVID Tracking Project states API client.
//!
//! Unlike the CSSE archive, the whole history arrives in one JSON request:
//! an array of rows, one per state per day, with compact numeric dates
//! (`20200315`). Rows are grouped by date into ordered `DayBatch`es.
//!
//! State identity comes as a two-letter code and is resolved through the same
//! lookup table as the CSSE path; a code missing from the table aborts the
//! run.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::data::lookup::StateLookup;
use crate::domain::dates::parse_compact;
use crate::domain::{DayBatch, GeoKey, Metric, MetricRecord};
use crate::error::AppError;

const DEFAULT_URL: &str = "https://api.covidtracking.com/v1/states/daily.json";

/// One raw API row. Counts may be null or (rarely) fractional; both normalize
/// to non-negative integers.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingRow {
    pub date: u32,
    pub state: String,
    #[serde(default)]
    pub positive: Option<f64>,
    #[serde(default)]
    pub negative: Option<f64>,
    #[serde(default)]
    pub pending: Option<f64>,
    #[serde(default)]
    pub death: Option<f64>,
    #[serde(default, rename = "totalTestResults")]
    pub total_test_results: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

pub struct TrackingClient {
    client: Client,
    url: String,
}

impl TrackingClient {
    /// Build a client, honoring a `COVID_TRACKING_URL` override.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let url = std::env::var("COVID_TRACKING_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Ok(Self {
            client: Client::new(),
            url,
        })
    }

    /// Fetch the full states-daily history and keep days in `[first, last]`.
    pub fn fetch_daily(
        &self,
        lookup: &StateLookup,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<DayBatch>, AppError> {
        log::info!("Loading data: states daily history...");

        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::new(4, format!("States API request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("States API request failed with status {}.", resp.status()),
            ));
        }
        let rows: Vec<TrackingRow> = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse states API response: {e}")))?;

        let days = batches_from_rows(&rows, lookup, first, last)?;
        log::info!("Loaded {} days of state history.", days.len());
        Ok(days)
    }
}

/// Group raw rows into date-ordered batches.
pub fn batches_from_rows(
    rows: &[TrackingRow],
    lookup: &StateLookup,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<DayBatch>, AppError> {
    let mut by_date: BTreeMap<NaiveDate, Vec<MetricRecord>> = BTreeMap::new();

    for row in rows {
        let Some(date) = parse_compact(row.date) else {
            log::debug!("skipping row with invalid date {}", row.date);
            continue;
        };
        if date < first || date > last {
            continue;
        }

        let state = lookup.resolve(&row.state).ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "States API row for {date} references unknown state code '{}'; the state lookup table is stale.",
                    row.state
                ),
            )
        })?;

        let values = BTreeMap::from([
            (Metric::Confirmed, coerce(row.positive)),
            (Metric::Deaths, coerce(row.death)),
            (Metric::Negative, coerce(row.negative)),
            (Metric::Pending, coerce(row.pending)),
            (Metric::Total, coerce(row.total_test_results.or(row.total))),
        ]);

        by_date.entry(date).or_default().push(MetricRecord {
            key: GeoKey {
                country: "US".to_string(),
                state: state.to_string(),
                county: String::new(),
            },
            values,
            note: None,
        });
    }

    Ok(by_date
        .into_iter()
        .map(|(date, records)| DayBatch { date, records })
        .collect())
}

fn coerce(v: Option<f64>) -> u64 {
    v.filter(|v| v.is_finite()).map(|v| v.max(0.0) as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup() -> StateLookup {
        StateLookup::from_map(HashMap::from([
            ("CA".to_string(), "California".to_string()),
            ("WA".to_string(), "Washington".to_string()),
        ]))
    }

    fn row(date: u32, state: &str, positive: f64) -> TrackingRow {
        TrackingRow {
            date,
            state: state.to_string(),
            positive: Some(positive),
            negative: Some(100.0),
            pending: None,
            death: Some(1.0),
            total_test_results: Some(positive + 100.0),
            total: None,
        }
    }

    #[test]
    fn groups_rows_by_date_in_order() {
        let rows = vec![
            row(20200316, "CA", 335.0),
            row(20200315, "CA", 293.0),
            row(20200315, "WA", 642.0),
        ];
        let first = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2020, 3, 31).unwrap();
        let days = batches_from_rows(&rows, &lookup(), first, last).unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2020, 3, 15).unwrap());
        assert_eq!(days[0].records.len(), 2);
        assert_eq!(days[1].records.len(), 1);
        assert_eq!(days[0].records[1].key.state, "Washington");
        assert_eq!(days[0].records[1].values[&Metric::Confirmed], 642);
        assert_eq!(days[0].records[1].values[&Metric::Total], 742);
    }

    #[test]
    fn range_filter_applies() {
        let rows = vec![row(20200315, "CA", 293.0), row(20200401, "CA", 1000.0)];
        let first = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2020, 3, 31).unwrap();
        let days = batches_from_rows(&rows, &lookup(), first, last).unwrap();
        assert_eq!(days.len(), 1);
    }

    #[test]
    fn unknown_state_code_is_fatal() {
        let rows = vec![row(20200315, "ZZ", 1.0)];
        let first = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2020, 3, 31).unwrap();
        assert!(batches_from_rows(&rows, &lookup(), first, last).is_err());
    }
}
