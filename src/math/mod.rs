//! Numeric helpers.

pub mod ols;

pub use ols::*;
