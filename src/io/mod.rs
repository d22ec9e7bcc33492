//! Output helpers.
//!
//! - derived-series exports (CSV/JSON) (`export`)

pub mod export;

pub use export::*;
