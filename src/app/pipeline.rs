//! Shared derivation pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! lookup fetch → data fetch → filter → prune → group → chain → sanitize →
//! extrapolate.
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use chrono::NaiveDate;

use crate::data::{self, StateLookup};
use crate::domain::{ALL, DataSource, DayBatch, KeyPart, Selection, TimeSeries};
use crate::error::AppError;
use crate::series::{chain, filter_by_key, group, prune_empty, sanitize};
use crate::trend;

/// The immutable base dataset of one session.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub source: DataSource,
    pub days: Vec<DayBatch>,
}

/// Fetch the reference data and the selected source(s).
///
/// The state lookup loads first; its failure is fatal before any data fetch
/// begins.
pub fn load_dataset(
    source: DataSource,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<LoadedData, AppError> {
    let client = reqwest::blocking::Client::new();
    let lookup = StateLookup::fetch(&client)?;
    log::info!("State lookup table: {} entries.", lookup.len());

    let days = data::load(source, &lookup, first, last)?;
    Ok(LoadedData { source, days })
}

/// Derive one sanitized (and optionally extrapolated) series.
///
/// `Ok(None)` means the selection matched no records on any day; rendering
/// is skipped, it is not an error.
pub fn derive_series(
    days: &[DayBatch],
    source: DataSource,
    selection: &Selection,
) -> Result<Option<TimeSeries>, AppError> {
    let filtered = filter_by_key(days, KeyPart::Country, &selection.country);
    let filtered = filter_by_key(&filtered, KeyPart::State, &selection.state);
    let filtered = filter_by_key(&filtered, KeyPart::County, &selection.county);

    let pruned = prune_empty(&filtered);
    if pruned.is_empty() {
        return Ok(None);
    }

    let mut series = chain(group(&pruned)?);
    sanitize(&mut series, source.monotone_metrics());
    trend::extrapolate(
        &mut series,
        selection.model,
        selection.horizon,
        source.predictable_metrics(),
    );
    Ok(Some(series))
}

/// A derived primary series plus the optional comparison overlay.
#[derive(Debug, Clone)]
pub struct DerivedView {
    pub series: TimeSeries,
    pub compare: Option<(String, TimeSeries)>,
}

/// Derive the primary series and, when requested, a second state's series
/// for comparison mode.
pub fn derive_view(
    loaded: &LoadedData,
    selection: &Selection,
) -> Result<Option<DerivedView>, AppError> {
    let Some(series) = derive_series(&loaded.days, loaded.source, selection)? else {
        return Ok(None);
    };

    let compare = match &selection.compare {
        Some(state) if state != &selection.state => {
            let mut compare_selection = selection.clone();
            compare_selection.state = state.clone();
            compare_selection.county = ALL.to_string();
            derive_series(&loaded.days, loaded.source, &compare_selection)?
                .map(|s| (state.clone(), s))
        }
        _ => None,
    };

    Ok(Some(DerivedView { series, compare }))
}
