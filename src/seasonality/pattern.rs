//! Historical (month, ISO week) volume pattern.

use std::collections::BTreeMap;

use chrono::Datelike;
use tracing::debug;

use crate::domain::HistoricalRecord;

/// One ISO week's share of its calendar month's historical volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekShare {
    pub week: u32,
    pub weight: f64,
}

/// Within-month weekly volume fractions, keyed by calendar month (1–12).
///
/// Weeks are stored in ascending ISO week order because position (not week
/// number) decides which of the four forecast weeks a share maps to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyPattern {
    months: BTreeMap<u32, Vec<WeekShare>>,
}

impl WeeklyPattern {
    /// Aggregate historical records into a normalized pattern.
    ///
    /// Records without a finite call volume are skipped. A month whose summed
    /// volume is zero is left out entirely; lookups for it resolve to the
    /// equal-weight fallback.
    pub fn build(records: &[HistoricalRecord]) -> Self {
        // BTreeMap keyed by (month, week) keeps weeks sorted within each month.
        let mut sums: BTreeMap<(u32, u32), f64> = BTreeMap::new();
        for r in records {
            let Some(volume) = r.call_volume.filter(|v| v.is_finite()) else {
                continue;
            };
            let key = (r.date.month(), r.date.iso_week().week());
            *sums.entry(key).or_insert(0.0) += volume;
        }

        let mut totals: BTreeMap<u32, f64> = BTreeMap::new();
        for (&(month, _), &v) in &sums {
            *totals.entry(month).or_insert(0.0) += v;
        }

        let mut months: BTreeMap<u32, Vec<WeekShare>> = BTreeMap::new();
        for ((month, week), v) in sums {
            let total = totals.get(&month).copied().unwrap_or(0.0);
            if total == 0.0 || !total.is_finite() {
                continue;
            }
            months.entry(month).or_default().push(WeekShare {
                week,
                weight: v / total,
            });
        }

        for (month, total) in &totals {
            if !months.contains_key(month) {
                debug!(month, total, "month has no usable weekly volume; left out of pattern");
            }
        }

        Self { months }
    }

    /// Build a pattern from already-normalized `(month, [(week, weight)])` entries.
    ///
    /// Weeks are sorted by ISO week number; no normalization is applied.
    pub fn from_weeks<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, Vec<(u32, f64)>)>,
    {
        let months = entries
            .into_iter()
            .map(|(month, weeks)| {
                let mut shares: Vec<WeekShare> = weeks
                    .into_iter()
                    .map(|(week, weight)| WeekShare { week, weight })
                    .collect();
                shares.sort_by_key(|s| s.week);
                (month, shares)
            })
            .collect();
        Self { months }
    }

    /// Weekly shares for a calendar month, if the month has pattern data.
    pub fn weeks(&self, month: u32) -> Option<&[WeekShare]> {
        self.months.get(&month).map(Vec::as_slice)
    }

    /// Calendar months present in the pattern, ascending.
    pub fn months(&self) -> Vec<u32> {
        self.months.keys().copied().collect()
    }

    pub fn contains_month(&self, month: u32) -> bool {
        self.months.contains_key(&month)
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}
