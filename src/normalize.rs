//! Raw-record normalization.
//!
//! This module turns one heterogeneous raw record (the CSSE daily reports
//! changed both header scheme and region naming several times over their
//! lifetime) into a canonical `MetricRecord`:
//!
//! - a `GeoKey` with country/state/county resolved and aliased
//! - non-negative integer counts, with absent/non-numeric values as zero
//!
//! Two failure classes are distinguished. A missing two-letter state code in
//! the lookup table means the reference data is stale or incompatible and the
//! whole run must stop; anything else is a malformed row, which costs only
//! the surrounding day.

use std::collections::{BTreeMap, HashMap};

use csv::StringRecord;

use crate::data::lookup::StateLookup;
use crate::domain::{GeoKey, Metric, MetricRecord};

/// How one record failed to normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A two-letter US state code was not in the lookup table. Stale
    /// reference data; aborts the run.
    UnknownRegionCode(String),
    /// A malformed row; the surrounding day is dropped.
    Invalid(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::UnknownRegionCode(code) => {
                write!(f, "unknown US state code '{code}' (stale state lookup table?)")
            }
            RecordError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

/// A field-name view over one CSV row.
pub struct RawRecord<'a> {
    headers: &'a HashMap<String, usize>,
    fields: &'a StringRecord,
}

impl<'a> RawRecord<'a> {
    pub fn new(headers: &'a HashMap<String, usize>, fields: &'a StringRecord) -> Self {
        Self { headers, fields }
    }

    fn get(&self, name: &str) -> Option<&'a str> {
        let idx = self.headers.get(name)?;
        self.fields
            .get(*idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn first_of(&self, names: &[&str]) -> Option<&'a str> {
        names.iter().find_map(|name| self.get(name))
    }
}

/// Build a lowercase header-name → column-index map.
///
/// Some report files carry a UTF-8 BOM on the first header; without stripping
/// it, the country column would never resolve.
pub fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = name.trim().trim_start_matches('\u{feff}');
            (name.to_ascii_lowercase(), idx)
        })
        .collect()
}

/// Normalize one raw record.
///
/// The rules apply in order, each idempotent given the prior ones:
///
/// 1. resolve country/state/county from either header scheme
/// 2. fixed country aliases
/// 3. split a parenthesized sub-region out of the country when no state is
///    given
/// 4. US-specific state/county cleanup, including the two-letter code lookup
/// 5. coerce counts to non-negative integers
pub fn normalize_record(
    raw: &RawRecord<'_>,
    lookup: &StateLookup,
) -> Result<MetricRecord, RecordError> {
    let mut country = raw
        .first_of(&["country/region", "country_region"])
        .ok_or_else(|| RecordError::Invalid("missing country field".to_string()))?
        .to_string();
    let mut state = raw
        .first_of(&["province/state", "province_state"])
        .unwrap_or("")
        .to_string();
    let mut county = raw.get("admin2").unwrap_or("").to_string();
    let mut note = String::new();

    country = match country.as_str() {
        "UK" => "United Kingdom".to_string(),
        "Mainland China" => "China".to_string(),
        "Iran (Islamic Republic of)" => "Iran".to_string(),
        "occupied Palestinian territory" => "Palestine".to_string(),
        _ => country,
    };

    if country.contains('(') && state.is_empty() {
        if let Some((name, rest)) = country.split_once(" (") {
            state = rest.trim_end_matches(')').to_string();
            country = name.to_string();
        }
    }

    if country == "US" {
        // Early reports used a combined "County, ST" state field.
        if state.contains(',') {
            if let Some((c, s)) = state.split_once(", ") {
                county = c.to_string();
                state = s.to_string();
            }
        }
        if state.contains('(') {
            if let Some((s, n)) = state.split_once(" (") {
                note = n.trim_end_matches(')').to_string();
                state = s.to_string();
            }
        }
        state = state.trim().to_string();
        if matches!(
            state.as_str(),
            "US" | "U.S." | "Unassigned Location" | "Recovered"
        ) {
            state.clear();
        }
        if state == "D.C." {
            state = "District of Columbia".to_string();
        }
        // Cruise-ship and evacuee placeholders are annotations, not states.
        if matches!(
            state.as_str(),
            "Wuhan Evacuee" | "Diamond Princess" | "Grand Princess" | "Grand Princess Cruise Ship"
        ) {
            note = state.clone();
            state.clear();
        }
        if state.len() == 2 {
            state = lookup
                .resolve(&state)
                .ok_or_else(|| RecordError::UnknownRegionCode(state.clone()))?
                .to_string();
        }
        if county.contains("County") {
            county = county.replacen("County", "", 1).trim().to_string();
        }
    }

    let values = BTreeMap::from([
        (Metric::Confirmed, coerce_count(raw.get("confirmed"))),
        (Metric::Deaths, coerce_count(raw.get("deaths"))),
        (Metric::Recovered, coerce_count(raw.get("recovered"))),
    ]);

    Ok(MetricRecord {
        key: GeoKey {
            country,
            state,
            county,
        },
        values,
        note: (!note.is_empty()).then_some(note),
    })
}

/// Coerce a raw count to a non-negative integer; absent/non-numeric → 0.
pub(crate) fn coerce_count(s: Option<&str>) -> u64 {
    s.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> StateLookup {
        StateLookup::from_map(HashMap::from([
            ("CA".to_string(), "California".to_string()),
            ("WA".to_string(), "Washington".to_string()),
        ]))
    }

    fn record(headers: &[&str], fields: &[&str]) -> (HashMap<String, usize>, StringRecord) {
        let header_record = StringRecord::from(headers.to_vec());
        (
            build_header_map(&header_record),
            StringRecord::from(fields.to_vec()),
        )
    }

    #[test]
    fn resolves_both_header_schemes() {
        let (headers, fields) = record(
            &["Country_Region", "Province_State", "Confirmed", "Deaths"],
            &["Italy", "Lombardia", "17", "1"],
        );
        let raw = RawRecord::new(&headers, &fields);
        let rec = normalize_record(&raw, &lookup()).unwrap();
        assert_eq!(rec.key.country, "Italy");
        assert_eq!(rec.key.state, "Lombardia");
        assert_eq!(rec.values[&Metric::Confirmed], 17);
        assert_eq!(rec.values[&Metric::Deaths], 1);
        assert_eq!(rec.values[&Metric::Recovered], 0);
    }

    #[test]
    fn non_us_records_never_touch_the_lookup() {
        // An empty lookup would fail any resolve call.
        let empty = StateLookup::from_map(HashMap::new());
        let (headers, fields) = record(
            &["Country/Region", "Province/State", "Confirmed"],
            &["UK", "", "9"],
        );
        let raw = RawRecord::new(&headers, &fields);
        let rec = normalize_record(&raw, &empty).unwrap();
        assert_eq!(rec.key.country, "United Kingdom");
        assert_eq!(rec.key.county, "");
    }

    #[test]
    fn country_aliases_apply() {
        for (alias, canonical) in [
            ("UK", "United Kingdom"),
            ("Mainland China", "China"),
            ("Iran (Islamic Republic of)", "Iran"),
            ("occupied Palestinian territory", "Palestine"),
        ] {
            let (headers, fields) =
                record(&["Country/Region", "Confirmed"], &[alias, "1"]);
            let raw = RawRecord::new(&headers, &fields);
            let rec = normalize_record(&raw, &lookup()).unwrap();
            assert_eq!(rec.key.country, canonical, "alias {alias}");
        }
    }

    #[test]
    fn parenthesized_subregion_becomes_state() {
        let (headers, fields) = record(
            &["Country/Region", "Province/State", "Confirmed"],
            &["Denmark (Faroe Islands)", "", "2"],
        );
        let raw = RawRecord::new(&headers, &fields);
        let rec = normalize_record(&raw, &lookup()).unwrap();
        assert_eq!(rec.key.country, "Denmark");
        assert_eq!(rec.key.state, "Faroe Islands");
    }

    #[test]
    fn us_combined_county_state_splits_and_code_resolves() {
        let (headers, fields) = record(
            &["Country/Region", "Province/State", "Confirmed"],
            &["US", "Los Angeles County, CA", "10"],
        );
        let raw = RawRecord::new(&headers, &fields);
        let rec = normalize_record(&raw, &lookup()).unwrap();
        assert_eq!(rec.key.state, "California");
        assert_eq!(rec.key.county, "Los Angeles");
    }

    #[test]
    fn unknown_state_code_is_a_hard_error() {
        let (headers, fields) = record(
            &["Country/Region", "Province/State", "Confirmed"],
            &["US", "ZZ", "10"],
        );
        let raw = RawRecord::new(&headers, &fields);
        assert_eq!(
            normalize_record(&raw, &lookup()).unwrap_err(),
            RecordError::UnknownRegionCode("ZZ".to_string())
        );
    }

    #[test]
    fn us_placeholder_states_blank_out() {
        for placeholder in ["US", "U.S.", "Unassigned Location", "Recovered"] {
            let (headers, fields) = record(
                &["Country/Region", "Province/State", "Confirmed"],
                &["US", placeholder, "3"],
            );
            let raw = RawRecord::new(&headers, &fields);
            let rec = normalize_record(&raw, &lookup()).unwrap();
            assert_eq!(rec.key.state, "", "placeholder {placeholder}");
        }
    }

    #[test]
    fn cruise_ship_placeholders_become_notes() {
        let (headers, fields) = record(
            &["Country/Region", "Province/State", "Confirmed"],
            &["US", "Diamond Princess", "40"],
        );
        let raw = RawRecord::new(&headers, &fields);
        let rec = normalize_record(&raw, &lookup()).unwrap();
        assert_eq!(rec.key.state, "");
        assert_eq!(rec.note.as_deref(), Some("Diamond Princess"));
    }

    #[test]
    fn dc_expands_and_state_annotation_becomes_note() {
        let (headers, fields) = record(
            &["Country/Region", "Province/State", "Confirmed"],
            &["US", "D.C.", "5"],
        );
        let raw = RawRecord::new(&headers, &fields);
        let rec = normalize_record(&raw, &lookup()).unwrap();
        assert_eq!(rec.key.state, "District of Columbia");

        let (headers, fields) = record(
            &["Country/Region", "Province/State", "Confirmed"],
            &["US", "CA (From Diamond Princess)", "7"],
        );
        let raw = RawRecord::new(&headers, &fields);
        let rec = normalize_record(&raw, &lookup()).unwrap();
        assert_eq!(rec.key.state, "California");
        assert_eq!(rec.note.as_deref(), Some("From Diamond Princess"));
    }

    #[test]
    fn counts_default_to_zero() {
        assert_eq!(coerce_count(None), 0);
        assert_eq!(coerce_count(Some("")), 0);
        assert_eq!(coerce_count(Some("n/a")), 0);
        assert_eq!(coerce_count(Some("-3")), 0);
        assert_eq!(coerce_count(Some("12")), 12);
    }

    #[test]
    fn header_map_strips_bom_and_case() {
        let headers = StringRecord::from(vec!["\u{feff}Province/State", "Country/Region"]);
        let map = build_header_map(&headers);
        assert!(map.contains_key("province/state"));
        assert!(map.contains_key("country/region"));
    }
}
