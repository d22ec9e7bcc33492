//! CSSE daily-report archive client.
//!
//! The archive publishes one CSV per calendar day
//! (`<base>/<MM-DD-YYYY>.csv`, one record per region). Fetching a range means
//! one request per day, fanned out in parallel and joined; each day resolves
//! to either a `DayBatch` or "no data".
//!
//! Failure semantics:
//!
//! - per-day failures (network, HTTP status, CSV parse, malformed rows) are
//!   local and silent: the day is simply absent, logged at debug level only,
//!   never retried
//! - an unknown US state code aborts the whole run (stale lookup table)

use chrono::NaiveDate;
use rayon::prelude::*;
use reqwest::blocking::Client;

use crate::data::lookup::StateLookup;
use crate::data::trim_trailing_failures;
use crate::domain::DayBatch;
use crate::domain::dates::{csse_file_stem, date_range};
use crate::error::AppError;
use crate::normalize::{RawRecord, RecordError, build_header_map, normalize_record};

const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_daily_reports";

pub struct CsseClient {
    client: Client,
    base_url: String,
}

impl CsseClient {
    /// Build a client, honoring a `COVID_CSSE_BASE_URL` override.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("COVID_CSSE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch every day in `[first, last]`, in parallel, and trim the trailing
    /// run of failed days (today's report is usually not published yet).
    /// Interior gaps are preserved: a failed mid-range day is absent while
    /// later days are kept.
    pub fn fetch_range(
        &self,
        lookup: &StateLookup,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<DayBatch>, AppError> {
        let dates = date_range(first, last);
        log::info!("Loading data: {} daily reports...", dates.len());

        let fetched: Result<Vec<Option<DayBatch>>, AppError> = dates
            .into_par_iter()
            .map(|date| self.fetch_day(lookup, date))
            .collect();

        let days = trim_trailing_failures(fetched?);
        log::info!("Loaded {} days of reports.", days.len());
        Ok(days)
    }

    /// Fetch one day. `Ok(None)` means "no data for this day".
    fn fetch_day(
        &self,
        lookup: &StateLookup,
        date: NaiveDate,
    ) -> Result<Option<DayBatch>, AppError> {
        let url = format!("{}/{}.csv", self.base_url, csse_file_stem(date));

        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(e) => {
                log::debug!("{date}: fetch failed: {e}");
                return Ok(None);
            }
        };
        if !resp.status().is_success() {
            log::debug!("{date}: status {}", resp.status());
            return Ok(None);
        }
        let body = match resp.text() {
            Ok(body) => body,
            Err(e) => {
                log::debug!("{date}: body read failed: {e}");
                return Ok(None);
            }
        };

        match parse_daily_csv(&body, lookup, date) {
            Ok(batch) => Ok(Some(batch)),
            Err(RecordError::UnknownRegionCode(code)) => Err(AppError::new(
                2,
                format!("Daily report {date} references unknown US state code '{code}'; the state lookup table is stale."),
            )),
            Err(RecordError::Invalid(msg)) => {
                log::debug!("{date}: {msg}");
                Ok(None)
            }
        }
    }
}

/// Parse one daily-report CSV into a `DayBatch`.
pub fn parse_daily_csv(
    text: &str,
    lookup: &StateLookup,
    date: NaiveDate,
) -> Result<DayBatch, RecordError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| RecordError::Invalid(format!("CSV header parse error: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| RecordError::Invalid(format!("CSV parse error: {e}")))?;
        let raw = RawRecord::new(&header_map, &record);
        records.push(normalize_record(&raw, lookup)?);
    }

    Ok(DayBatch { date, records })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::Metric;

    fn lookup() -> StateLookup {
        StateLookup::from_map(HashMap::from([(
            "CA".to_string(),
            "California".to_string(),
        )]))
    }

    #[test]
    fn parses_a_daily_report() {
        let text = "\
Province/State,Country/Region,Confirmed,Deaths,Recovered
\"Los Angeles, CA\",US,10,1,0
Hubei,Mainland China,444,17,28
";
        let date = NaiveDate::from_ymd_opt(2020, 1, 22).unwrap();
        let batch = parse_daily_csv(text, &lookup(), date).unwrap();
        assert_eq!(batch.date, date);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].key.state, "California");
        assert_eq!(batch.records[0].key.county, "Los Angeles");
        assert_eq!(batch.records[1].key.country, "China");
        assert_eq!(batch.records[1].values[&Metric::Confirmed], 444);
    }

    #[test]
    fn unknown_code_propagates() {
        let text = "\
Province/State,Country/Region,Confirmed
ZZ,US,10
";
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let err = parse_daily_csv(text, &lookup(), date).unwrap_err();
        assert_eq!(err, RecordError::UnknownRegionCode("ZZ".to_string()));
    }
}
