//! Resolution of exactly four weekly weights for a calendar month.
//!
//! A calendar month overlaps four or five ISO weeks (occasionally fewer in
//! sparse history). Consumers always need four buckets, so this module owns all
//! of the calendar irregularity and missing-data handling:
//!
//! 1. month not in the pattern → equal weights
//! 2. more than four weeks → keep the first three, fold the rest into the fourth
//! 3. fewer than four weeks → pad with zeros
//! 4. renormalize over finite entries; a non-positive or non-finite total → equal weights
//!
//! Resolution has no error path. Every anomaly lands in the same equal-weight
//! branch, tagged with a [`FallbackReason`] so callers can report it.

use serde::Serialize;

use crate::seasonality::pattern::WeeklyPattern;

/// Number of weekly buckets per forecast month.
pub const WEEKS_PER_MONTH: usize = 4;

/// The equal-weight fallback distribution.
pub const EQUAL_WEIGHTS: [f64; WEEKS_PER_MONTH] = [0.25; WEEKS_PER_MONTH];

/// Why a month resolved to [`EQUAL_WEIGHTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The month has no entry in the pattern.
    MonthAbsent,
    /// The month's coerced weights had no positive, finite total.
    DegenerateTotal,
}

/// Where a month's weights came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    Historical,
    Fallback(FallbackReason),
}

/// Four normalized weekly weights plus their provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthWeights {
    pub weights: [f64; WEEKS_PER_MONTH],
    pub source: WeightSource,
}

impl MonthWeights {
    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            weights: EQUAL_WEIGHTS,
            source: WeightSource::Fallback(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, WeightSource::Fallback(_))
    }
}

/// Resolve the four weekly weights for `month` (1–12).
///
/// Months outside 1–12 are simply absent from any pattern and fall back.
pub fn resolve_month_weights(pattern: &WeeklyPattern, month: u32) -> MonthWeights {
    let Some(weeks) = pattern.weeks(month) else {
        return MonthWeights::fallback(FallbackReason::MonthAbsent);
    };

    let raw: Vec<f64> = weeks.iter().map(|w| w.weight).collect();
    normalize(coerce_to_four(&raw))
}

/// Resolve weights for every calendar month (1–12), in order.
pub fn resolve_calendar(pattern: &WeeklyPattern) -> Vec<(u32, MonthWeights)> {
    (1..=12)
        .map(|month| (month, resolve_month_weights(pattern, month)))
        .collect()
}

/// Fold or pad a weekly sequence to exactly four values.
///
/// The tail of a five-week month is summed into the fourth bucket rather than
/// averaged or dropped, so the bucket total still matches the month total.
fn coerce_to_four(values: &[f64]) -> [f64; WEEKS_PER_MONTH] {
    let mut out = [0.0; WEEKS_PER_MONTH];
    if values.len() > WEEKS_PER_MONTH {
        out[..3].copy_from_slice(&values[..3]);
        out[3] = values[3..].iter().sum();
    } else {
        out[..values.len()].copy_from_slice(values);
    }
    out
}

fn normalize(values: [f64; WEEKS_PER_MONTH]) -> MonthWeights {
    let total: f64 = values.iter().filter(|v| v.is_finite()).sum();
    if !(total.is_finite() && total > 0.0) {
        return MonthWeights::fallback(FallbackReason::DegenerateTotal);
    }

    let weights = values.map(|v| if v.is_finite() { v / total } else { 0.0 });
    MonthWeights {
        weights,
        source: WeightSource::Historical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HistoricalRecord;
    use chrono::NaiveDate;

    const EPS: f64 = 1e-12;

    fn assert_weights(actual: [f64; 4], expected: [f64; 4]) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < EPS, "got {actual:?}, expected {expected:?}");
        }
    }

    /// Records for ISO weeks of 2024; each entry is (week, volume) placed on
    /// that week's Monday, which must fall inside `month`.
    fn month_history(month: u32, weeks: &[(u32, f64)]) -> Vec<HistoricalRecord> {
        weeks
            .iter()
            .map(|&(week, volume)| {
                let date = NaiveDate::from_isoywd_opt(2024, week, chrono::Weekday::Mon).unwrap();
                assert_eq!(chrono::Datelike::month(&date), month);
                HistoricalRecord {
                    date,
                    call_volume: Some(volume),
                    membership: None,
                    lob: "ALL".to_string(),
                }
            })
            .collect()
    }

    #[test]
    fn five_week_month_folds_tail_into_fourth_bucket() {
        // March 2024 spans ISO weeks 9..=13; the Monday of week 9 is Feb 26,
        // so week 9 is placed on Friday Mar 1 instead.
        let mut records = month_history(3, &[(10, 200.0), (11, 300.0), (12, 0.0), (13, 400.0)]);
        records.push(HistoricalRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            call_volume: Some(100.0),
            membership: None,
            lob: "ALL".to_string(),
        });

        let pattern = WeeklyPattern::build(&records);
        assert_eq!(pattern.weeks(3).unwrap().len(), 5);

        let resolved = resolve_month_weights(&pattern, 3);
        assert_eq!(resolved.source, WeightSource::Historical);
        assert_weights(resolved.weights, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn short_month_is_padded_with_zeros() {
        let pattern = WeeklyPattern::build(&month_history(5, &[(20, 50.0), (21, 50.0)]));
        let resolved = resolve_month_weights(&pattern, 5);
        assert_eq!(resolved.source, WeightSource::Historical);
        assert_weights(resolved.weights, [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn absent_month_uses_equal_weights() {
        let pattern = WeeklyPattern::build(&month_history(5, &[(20, 50.0)]));
        let resolved = resolve_month_weights(&pattern, 7);
        assert_eq!(resolved.weights, EQUAL_WEIGHTS);
        assert_eq!(resolved.source, WeightSource::Fallback(FallbackReason::MonthAbsent));
    }

    #[test]
    fn all_zero_month_uses_equal_weights() {
        let pattern = WeeklyPattern::build(&month_history(5, &[(20, 0.0), (21, 0.0)]));
        let resolved = resolve_month_weights(&pattern, 5);
        assert_eq!(resolved.weights, EQUAL_WEIGHTS);
        assert!(resolved.is_fallback());
    }

    #[test]
    fn out_of_range_month_uses_equal_weights() {
        let pattern = WeeklyPattern::from_weeks([(1, vec![(1, 1.0)])]);
        assert_eq!(resolve_month_weights(&pattern, 0).weights, EQUAL_WEIGHTS);
        assert_eq!(resolve_month_weights(&pattern, 13).weights, EQUAL_WEIGHTS);
    }

    #[test]
    fn always_four_weights_for_three_four_and_five_weeks() {
        let pattern = WeeklyPattern::from_weeks([
            (1, vec![(1, 0.2), (2, 0.3), (3, 0.5)]),
            (2, vec![(5, 0.25), (6, 0.25), (7, 0.25), (8, 0.25)]),
            (3, vec![(9, 0.1), (10, 0.2), (11, 0.3), (12, 0.2), (13, 0.2)]),
        ]);
        for month in 1..=3 {
            let resolved = resolve_month_weights(&pattern, month);
            assert_eq!(resolved.weights.len(), 4);
            let total: f64 = resolved.weights.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "month {month} sums to {total}");
        }
    }

    #[test]
    fn empty_week_list_degrades_to_fallback() {
        let pattern = WeeklyPattern::from_weeks([(4, Vec::new())]);
        let resolved = resolve_month_weights(&pattern, 4);
        assert_eq!(resolved.weights, EQUAL_WEIGHTS);
        assert_eq!(resolved.source, WeightSource::Fallback(FallbackReason::DegenerateTotal));
    }

    #[test]
    fn non_finite_entries_are_excluded_and_zeroed() {
        let pattern = WeeklyPattern::from_weeks([(8, vec![(31, 0.5), (32, f64::NAN), (33, 0.5)])]);
        let resolved = resolve_month_weights(&pattern, 8);
        assert_eq!(resolved.source, WeightSource::Historical);
        assert_weights(resolved.weights, [0.5, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn negative_total_falls_back() {
        let pattern = WeeklyPattern::from_weeks([(9, vec![(36, -0.5), (37, 0.2)])]);
        assert_eq!(resolve_month_weights(&pattern, 9).weights, EQUAL_WEIGHTS);
    }

    #[test]
    fn calendar_covers_all_months() {
        let pattern = WeeklyPattern::from_weeks([(6, vec![(23, 1.0)])]);
        let table = resolve_calendar(&pattern);
        assert_eq!(table.len(), 12);
        assert_eq!(table[5].1.source, WeightSource::Historical);
        assert_eq!(table.iter().filter(|(_, w)| w.is_fallback()).count(), 11);
    }
}
