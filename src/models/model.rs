//! Model evaluation for the membership regression family.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a month (for least squares)
//! - predict membership for a month given coefficients (for fitted values and forecasts)
//!
//! Both are implemented here for each model kind.

use chrono::{Datelike, NaiveDate};

use crate::domain::{MembershipModel, ModelKind};
use crate::math::fourier_pair;

/// Whole months from `origin` to `date` (ignoring the day of month).
pub fn month_ordinal(origin: NaiveDate, date: NaiveDate) -> f64 {
    let a = origin.year() as i64 * 12 + origin.month0() as i64;
    let b = date.year() as i64 * 12 + date.month0() as i64;
    (b - a) as f64
}

/// Fill a design row for the given model kind.
///
/// The row includes the constant term first (intercept), then the month
/// ordinal `t`, then `(sin, cos)` for each yearly harmonic.
///
/// # Panics
/// Panics if `out` does not have length `kind.param_count()`. Callers should size
/// the row correctly.
pub fn fill_design_row(kind: ModelKind, t: f64, month: u32, out: &mut [f64]) {
    out[0] = 1.0;
    if kind == ModelKind::Flat {
        return;
    }
    out[1] = t;
    for k in 1..=kind.fourier_order() {
        let (s, c) = fourier_pair(month, k);
        out[2 * k] = s;
        out[2 * k + 1] = c;
    }
}

/// Predict the value for month ordinal `t` / calendar month `month`.
pub fn predict_raw(kind: ModelKind, t: f64, month: u32, coefficients: &[f64]) -> f64 {
    let mut row = vec![0.0; kind.param_count()];
    fill_design_row(kind, t, month, &mut row);
    row.iter().zip(coefficients).map(|(x, b)| x * b).sum()
}

/// Predict membership for the month containing `date`.
pub fn predict(model: &MembershipModel, date: NaiveDate) -> f64 {
    let t = month_ordinal(model.origin, date);
    predict_raw(model.kind, t, date.month(), &model.coefficients)
}
