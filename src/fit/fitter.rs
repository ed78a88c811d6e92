//! Low-level fitting routines for a single model kind.
//!
//! Given monthly membership history `(period_start_i, y_i)` we build the design
//! matrix for the requested kind, solve the least squares problem for its
//! coefficients, and report the resulting SSE / RMSE.

use nalgebra::{DMatrix, DVector};

use crate::domain::{MembershipPoint, ModelKind};
use crate::error::AppError;
use crate::math::solve_least_squares;
use crate::models::{fill_design_row, month_ordinal, predict_raw};
use chrono::Datelike;

/// Best fit for a single model kind.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub kind: ModelKind,
    pub coefficients: Vec<f64>,
    pub fitted: Vec<f64>,
    pub sse: f64,
    pub rmse: f64,
}

/// Fit a regression kind to monthly history.
///
/// `history` must be sorted by month; the first entry is the ordinal origin.
pub fn fit_model(kind: ModelKind, history: &[MembershipPoint]) -> Result<ModelFit, AppError> {
    if kind == ModelKind::Flat {
        return Ok(fit_flat(history));
    }

    let n = history.len();
    let p = kind.param_count();
    let Some(origin) = history.first().map(|h| h.period_start) else {
        return Err(AppError::new(3, "Cannot fit a model to empty membership history."));
    };

    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    for (i, h) in history.iter().enumerate() {
        let t = month_ordinal(origin, h.period_start);
        fill_design_row(kind, t, h.period_start.month(), &mut row);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
    }
    let y = DVector::from_iterator(n, history.iter().map(|h| h.value));

    let beta = solve_least_squares(&x, &y).ok_or_else(|| {
        AppError::new(
            4,
            format!("Least squares solve failed for model {}.", kind.display_name()),
        )
    })?;
    let coefficients: Vec<f64> = beta.iter().copied().collect();

    let fitted: Vec<f64> = history
        .iter()
        .map(|h| {
            let t = month_ordinal(origin, h.period_start);
            predict_raw(kind, t, h.period_start.month(), &coefficients)
        })
        .collect();

    let (sse, rmse) = error_stats(history, &fitted);
    if !sse.is_finite() {
        return Err(AppError::new(
            4,
            format!("Non-finite SSE for model {}.", kind.display_name()),
        ));
    }

    Ok(ModelFit {
        kind,
        coefficients,
        fitted,
        sse,
        rmse,
    })
}

/// Naive flat model: every month equals the last observed value (0 with no history).
pub fn fit_flat(history: &[MembershipPoint]) -> ModelFit {
    let last = history.last().map(|h| h.value).unwrap_or(0.0);
    let fitted = vec![last; history.len()];
    let (sse, rmse) = error_stats(history, &fitted);
    ModelFit {
        kind: ModelKind::Flat,
        coefficients: vec![last],
        fitted,
        sse,
        rmse,
    }
}

fn error_stats(history: &[MembershipPoint], fitted: &[f64]) -> (f64, f64) {
    let sse: f64 = history
        .iter()
        .zip(fitted)
        .map(|(h, f)| (h.value - f).powi(2))
        .sum();
    let rmse = if history.is_empty() {
        0.0
    } else {
        (sse / history.len() as f64).sqrt()
    };
    (sse, rmse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly(values: &[f64]) -> Vec<MembershipPoint> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| MembershipPoint {
                period_start: start.checked_add_months(chrono::Months::new(i as u32)).unwrap(),
                value: v,
            })
            .collect()
    }

    #[test]
    fn trend_fit_recovers_line() {
        let values: Vec<f64> = (0..10).map(|i| 1000.0 + 25.0 * i as f64).collect();
        let fit = fit_model(ModelKind::Trend, &monthly(&values)).unwrap();
        assert!((fit.coefficients[0] - 1000.0).abs() < 1e-6);
        assert!((fit.coefficients[1] - 25.0).abs() < 1e-6);
        assert!(fit.sse < 1e-6);
    }

    #[test]
    fn yearly_fit_recovers_seasonal_signal() {
        let history: Vec<MembershipPoint> = monthly(&[0.0; 36])
            .into_iter()
            .enumerate()
            .map(|(i, mut h)| {
                let (s, c) = crate::math::fourier_pair(h.period_start.month(), 1);
                h.value = 5000.0 + 10.0 * i as f64 + 300.0 * s - 120.0 * c;
                h
            })
            .collect();

        let fit = fit_model(ModelKind::Yearly1, &history).unwrap();
        let expected = [5000.0, 10.0, 300.0, -120.0];
        for (got, want) in fit.coefficients.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
        assert!(fit.rmse < 1e-6);
    }

    #[test]
    fn flat_fit_uses_last_value() {
        let fit = fit_flat(&monthly(&[10.0, 20.0]));
        assert_eq!(fit.coefficients, vec![20.0]);
        assert_eq!(fit.sse, 100.0);

        let empty = fit_flat(&[]);
        assert_eq!(empty.coefficients, vec![0.0]);
        assert_eq!(empty.rmse, 0.0);
    }

    #[test]
    fn empty_history_is_rejected_for_regression() {
        let err = fit_model(ModelKind::Trend, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
