//! Least-squares solver.
//!
//! The exponential trend fit linearizes `v = a·exp(b·t)` to
//! `ln v = ln a + b·t` and solves the resulting two-column regression over
//! the whole observed history. SVD handles the tall (many days, two columns)
//! design matrix robustly; nalgebra's `QR::solve` is intended for square
//! systems.

use nalgebra::{DMatrix, DVector};

/// Solve `min ‖Xβ − y‖²` via SVD.
///
/// Returns `None` when the system is too ill-conditioned to solve or the
/// solution is non-finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let beta = svd.solve(y, 1e-10).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}
