use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{HistoricalRecord, MembershipForecastRow, MonthlyForecastRow};
use crate::io::first_of_month;

/// Months per year; contact rates are annual calls per member.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Average number of weeks in a month.
pub const AVG_WEEKS_PER_MONTH: f64 = 4.345;

/// Convert membership rows into monthly call-volume rows.
///
/// `Monthly_Call_Volume = yhat * contact_rate / 12`; the band is converted the same way.
pub fn forecast_call_volume(
    membership: &[MembershipForecastRow],
    contact_rate: f64,
    lob: Option<&str>,
) -> Vec<MonthlyForecastRow> {
    let per_month = |v: f64| v * contact_rate / MONTHS_PER_YEAR;
    membership
        .iter()
        .map(|m| MonthlyForecastRow {
            period_start: m.period_start,
            yhat: Some(m.yhat),
            yhat_lower: Some(m.yhat_lower),
            yhat_upper: Some(m.yhat_upper),
            monthly_call_volume: per_month(m.yhat),
            monthly_call_volume_lower: Some(per_month(m.yhat_lower)),
            monthly_call_volume_upper: Some(per_month(m.yhat_upper)),
            lob: lob.map(str::to_string),
        })
        .collect()
}

/// Weekly call volume implied by a membership level and contact rate.
pub fn sensitivity_weekly_volume(membership: f64, contact_rate: f64) -> f64 {
    membership * contact_rate / MONTHS_PER_YEAR / AVG_WEEKS_PER_MONTH
}

/// Historical call volume summed per calendar month (months with no volume are omitted).
pub fn monthly_call_totals(records: &[HistoricalRecord]) -> Vec<(NaiveDate, f64)> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        if let Some(v) = r.call_volume.filter(|v| v.is_finite()) {
            *totals.entry(first_of_month(r.date)).or_insert(0.0) += v;
        }
    }
    totals.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_membership_to_calls() {
        let rows = vec![MembershipForecastRow {
            period_start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            yhat: 120_000.0,
            yhat_lower: 108_000.0,
            yhat_upper: 132_000.0,
        }];
        let out = forecast_call_volume(&rows, 0.45, Some("Medicare"));
        assert_eq!(out.len(), 1);
        assert!((out[0].monthly_call_volume - 4_500.0).abs() < 1e-9);
        assert!((out[0].monthly_call_volume_lower.unwrap() - 4_050.0).abs() < 1e-9);
        assert!((out[0].monthly_call_volume_upper.unwrap() - 4_950.0).abs() < 1e-9);
        assert_eq!(out[0].yhat, Some(120_000.0));
        assert_eq!(out[0].lob.as_deref(), Some("Medicare"));
    }

    #[test]
    fn sensitivity_at_defaults() {
        let v = sensitivity_weekly_volume(170_000.0, 0.45);
        assert!((v - 170_000.0 * 0.45 / 12.0 / 4.345).abs() < 1e-9);
        assert!(v > 1_467.0 && v < 1_468.0);
    }

    #[test]
    fn monthly_totals_skip_missing_volume() {
        let rec = |day: u32, v: Option<f64>| HistoricalRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            call_volume: v,
            membership: None,
            lob: "ALL".to_string(),
        };
        let totals = monthly_call_totals(&[rec(1, Some(10.0)), rec(2, None), rec(20, Some(5.0))]);
        assert_eq!(totals, vec![(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 15.0)]);
    }
}
