//! Yearly Fourier basis for monthly series.
//!
//! For calendar month `m` (1–12) and harmonic `k`, the basis pair is:
//!
//! - `sin(2πk·m / 12)`
//! - `cos(2πk·m / 12)`
//!
//! Using the calendar month (rather than the position in the series) keeps the
//! seasonal phase correct across gaps in the history.

use std::f64::consts::PI;

/// Months per seasonal cycle.
pub const YEAR_PERIOD: f64 = 12.0;

/// `(sin, cos)` of harmonic `k` for calendar month `month`.
pub fn fourier_pair(month: u32, k: usize) -> (f64, f64) {
    let angle = 2.0 * PI * k as f64 * month as f64 / YEAR_PERIOD;
    angle.sin_cos()
}
