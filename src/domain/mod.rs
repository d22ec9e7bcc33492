//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - geographic identity (`GeoKey`, `KeyPart`)
//! - raw per-day observations (`MetricRecord`, `DayBatch`)
//! - derived time series (`SeriesPoint`, `TimeSeries`)
//! - configuration enums (`Metric`, `DataSource`, `TrendModel`, `ViewMode`)
//! - calendar helpers (`dates`)

pub mod dates;
pub mod types;

pub use types::*;
