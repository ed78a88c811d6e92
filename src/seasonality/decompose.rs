//! Expansion of monthly forecasts into weekly rows.
//!
//! Week `i` of a forecast month starts `7 * i` days after the first of the
//! month. This is a fixed-stride model, not ISO week alignment: weeks 2–4 do not
//! necessarily start on the same weekday as calendar weeks, and the last few
//! days of the month are covered by week 4.

use chrono::{Datelike, Duration};

use crate::domain::{MonthlyForecastRow, WeeklyForecastRow};
use crate::seasonality::pattern::WeeklyPattern;
use crate::seasonality::weights::{WEEKS_PER_MONTH, resolve_month_weights};

/// Days between consecutive weekly buckets.
pub const WEEK_STRIDE_DAYS: i64 = 7;

/// Lower edge of the weekly band, as a multiple of the estimate.
pub const BAND_LOWER: f64 = 0.95;

/// Upper edge of the weekly band, as a multiple of the estimate.
pub const BAND_UPPER: f64 = 1.05;

/// Split each monthly row into four weekly rows using `pattern`.
///
/// Always returns `4 * monthly.len()` rows, grouped by parent row in input order.
pub fn decompose(monthly: &[MonthlyForecastRow], pattern: &WeeklyPattern) -> Vec<WeeklyForecastRow> {
    let mut out = Vec::with_capacity(monthly.len() * WEEKS_PER_MONTH);

    for row in monthly {
        let resolved = resolve_month_weights(pattern, row.period_start.month());

        for (i, &weight) in resolved.weights.iter().enumerate() {
            let week_start = row
                .period_start
                .checked_add_signed(Duration::days(i as i64 * WEEK_STRIDE_DAYS))
                .unwrap_or(row.period_start);
            let estimated = row.monthly_call_volume * weight;

            out.push(WeeklyForecastRow {
                week_start,
                estimated_weekly_call_volume: estimated,
                monthly_call_volume: row.monthly_call_volume,
                weight,
                confidence_interval_lower: estimated * BAND_LOWER,
                confidence_interval_upper: estimated * BAND_UPPER,
                lob: row.lob.clone(),
            });
        }
    }

    out
}
