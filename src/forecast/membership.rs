use std::collections::BTreeMap;

use chrono::{Local, Months, NaiveDate};
use tracing::{debug, warn};

use crate::domain::{HistoricalRecord, MembershipForecastRow, MembershipPoint, ModelKind};
use crate::error::AppError;
use crate::fit::{FitSelection, MIN_TREND_MONTHS, fit_and_select, flat_selection};
use crate::io::first_of_month;
use crate::models::predict;

/// z-score for an 80% two-sided band.
pub const BAND_Z: f64 = 1.2816;

/// Membership projection for one LOB.
#[derive(Debug, Clone)]
pub struct MembershipForecast {
    pub selection: FitSelection,
    pub rows: Vec<MembershipForecastRow>,
    /// In-sample predictions aligned with the history used for fitting.
    pub fitted: Vec<f64>,
}

impl MembershipForecast {
    pub fn is_flat(&self) -> bool {
        self.selection.best.model.kind == ModelKind::Flat
    }
}

/// Collapse records to one membership point per calendar month.
///
/// Records are expected in date order; the last finite value in each month wins.
pub fn aggregate_monthly(records: &[HistoricalRecord]) -> Vec<MembershipPoint> {
    let mut by_month: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        let Some(v) = r.membership.filter(|v| v.is_finite()) else {
            continue;
        };
        by_month.insert(first_of_month(r.date), v);
    }
    by_month
        .into_iter()
        .map(|(period_start, value)| MembershipPoint { period_start, value })
        .collect()
}

/// Forecast `periods` months of membership after the last history month.
///
/// With fewer than two history months the result is a flat projection of the
/// last value (0 without history) when `fallback_on_insufficient` is set.
pub fn forecast_membership(
    history: &[MembershipPoint],
    periods: usize,
    fallback_on_insufficient: bool,
) -> Result<MembershipForecast, AppError> {
    if periods == 0 {
        return Err(AppError::new(2, "Forecast periods must be at least 1."));
    }

    let selection = if history.len() < MIN_TREND_MONTHS {
        let msg = format!(
            "Insufficient membership history after monthly aggregation: {} rows.",
            history.len()
        );
        if !fallback_on_insufficient {
            return Err(AppError::new(3, msg));
        }
        warn!("{msg} Returning a naive flat forecast.");
        flat_selection(history)
    } else {
        fit_and_select(history)?
    };

    let model = &selection.best.model;
    let last_month = history
        .last()
        .map(|h| h.period_start)
        .unwrap_or_else(|| first_of_month(Local::now().date_naive()));

    let flat = model.kind == ModelKind::Flat;
    let half_width = if flat {
        0.0
    } else {
        BAND_Z * selection.best.quality.rmse
    };

    let mut rows = Vec::with_capacity(periods);
    for i in 1..=periods {
        let period_start = last_month
            .checked_add_months(Months::new(i as u32))
            .ok_or_else(|| AppError::new(4, "Forecast horizon overflows the calendar."))?;
        let yhat = if flat {
            model.coefficients.first().copied().unwrap_or(0.0)
        } else {
            predict(model, period_start)
        };
        rows.push(MembershipForecastRow {
            period_start,
            yhat,
            yhat_lower: yhat - half_width,
            yhat_upper: yhat + half_width,
        });
    }

    let fitted = history
        .iter()
        .map(|h| {
            if flat {
                model.coefficients.first().copied().unwrap_or(0.0)
            } else {
                predict(model, h.period_start)
            }
        })
        .collect();

    debug!(
        model = %model.display_name,
        periods,
        history_months = history.len(),
        "membership forecast ready"
    );

    Ok(MembershipForecast {
        selection,
        rows,
        fitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_LOB;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(date: NaiveDate, membership: Option<f64>) -> HistoricalRecord {
        HistoricalRecord {
            date,
            call_volume: None,
            membership,
            lob: DEFAULT_LOB.to_string(),
        }
    }

    fn point(y: i32, m: u32, value: f64) -> MembershipPoint {
        MembershipPoint {
            period_start: d(y, m, 1),
            value,
        }
    }

    #[test]
    fn monthly_aggregation_keeps_last_value() {
        let records = vec![
            record(d(2024, 1, 3), Some(100.0)),
            record(d(2024, 1, 28), Some(110.0)),
            record(d(2024, 1, 30), None),
            record(d(2024, 2, 2), Some(120.0)),
            record(d(2024, 2, 9), Some(f64::NAN)),
        ];
        let monthly = aggregate_monthly(&records);
        assert_eq!(monthly, vec![point(2024, 1, 110.0), point(2024, 2, 120.0)]);
    }

    #[test]
    fn forecast_starts_after_last_history_month() {
        let history: Vec<MembershipPoint> = (1..=10)
            .map(|m| point(2024, m, 1000.0 + 10.0 * m as f64))
            .collect();
        let fc = forecast_membership(&history, 4, true).unwrap();
        assert_eq!(fc.rows.len(), 4);
        assert_eq!(fc.rows[0].period_start, d(2024, 11, 1));
        assert_eq!(fc.rows[3].period_start, d(2025, 2, 1));
        assert!((fc.rows[0].yhat - 1110.0).abs() < 1e-6);
        assert!(fc.rows[0].yhat_lower <= fc.rows[0].yhat);
        assert!(fc.rows[0].yhat_upper >= fc.rows[0].yhat);
        assert_eq!(fc.fitted.len(), history.len());
    }

    #[test]
    fn single_month_falls_back_to_flat() {
        let fc = forecast_membership(&[point(2024, 6, 5000.0)], 3, true).unwrap();
        assert!(fc.is_flat());
        assert_eq!(fc.rows[0].period_start, d(2024, 7, 1));
        for row in &fc.rows {
            assert_eq!(row.yhat, 5000.0);
            assert_eq!(row.yhat_lower, 5000.0);
            assert_eq!(row.yhat_upper, 5000.0);
        }
    }

    #[test]
    fn empty_history_flat_forecast_is_zero() {
        let fc = forecast_membership(&[], 2, true).unwrap();
        assert_eq!(fc.rows.len(), 2);
        assert!(fc.rows.iter().all(|r| r.yhat == 0.0));
    }

    #[test]
    fn insufficient_history_without_fallback_errors() {
        let err = forecast_membership(&[point(2024, 6, 5000.0)], 3, false).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn zero_periods_is_rejected() {
        let err = forecast_membership(&[point(2024, 6, 5000.0)], 0, true).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
