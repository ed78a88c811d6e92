//! Synthetic call-center history for demos and tests.
//!
//! Each LOB gets daily rows with:
//! - membership: linear growth + yearly cycle + Gaussian noise
//! - call volume: membership * contact rate / 365, shaped by weekday and noise

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, Months, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::Serialize;
use tracing::info;

use crate::domain::HistoricalRecord;
use crate::error::AppError;

/// Call-volume multipliers Monday..Sunday (mean 1.0).
const WEEKDAY_FACTORS: [f64; 7] = [1.35, 1.2, 1.1, 1.05, 1.0, 0.7, 0.6];

/// Relative amplitude of the yearly membership cycle.
const YEARLY_AMPLITUDE: f64 = 0.02;

/// Relative std dev of daily membership noise.
const MEMBERSHIP_NOISE: f64 = 0.002;

/// Relative std dev of daily call-volume noise.
const VOLUME_NOISE: f64 = 0.08;

/// LOBs generated when none are requested.
pub const DEFAULT_SAMPLE_LOBS: [&str; 2] = ["Medicare", "Commercial"];

/// Parameters for synthetic history.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub start: NaiveDate,
    pub months: u32,
    pub seed: u64,
    pub lobs: Vec<String>,
    /// Membership at `start` for the first LOB; later LOBs are scaled down.
    pub base_membership: f64,
    /// Relative membership growth per month.
    pub monthly_growth: f64,
    pub contact_rate: f64,
}

impl SampleSpec {
    pub fn new(start: NaiveDate, months: u32, seed: u64, lobs: Vec<String>) -> Self {
        let lobs = if lobs.is_empty() {
            DEFAULT_SAMPLE_LOBS.iter().map(|s| s.to_string()).collect()
        } else {
            lobs
        };
        Self {
            start,
            months,
            seed,
            lobs,
            base_membership: 170_000.0,
            monthly_growth: 0.004,
            contact_rate: 0.45,
        }
    }
}

#[derive(Debug, Serialize)]
struct SampleRow<'a> {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Historical_Call_Volume")]
    call_volume: f64,
    #[serde(rename = "Membership_Count")]
    membership: f64,
    #[serde(rename = "LOB")]
    lob: &'a str,
}

/// Generate daily records for every LOB in `spec`, sorted by date then LOB.
pub fn generate_history(spec: &SampleSpec) -> Result<Vec<HistoricalRecord>, AppError> {
    if spec.months == 0 {
        return Err(AppError::new(2, "Sample months must be > 0."));
    }
    if spec.lobs.is_empty() {
        return Err(AppError::new(2, "At least one LOB is required for sample data."));
    }
    if !(spec.base_membership.is_finite() && spec.base_membership > 0.0) {
        return Err(AppError::new(2, "Base membership must be positive."));
    }
    let end = spec
        .start
        .checked_add_months(Months::new(spec.months))
        .ok_or_else(|| AppError::new(2, "Sample range overflows the calendar."))?;

    let member_noise = Normal::new(0.0, MEMBERSHIP_NOISE)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let volume_noise = Normal::new(0.0, VOLUME_NOISE)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut records = Vec::new();
    for (idx, lob) in spec.lobs.iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(lob_seed(spec.seed, lob));
        let base = spec.base_membership / (1.0 + idx as f64);

        let mut date = spec.start;
        while date < end {
            let months_elapsed = months_between(spec.start, date);
            let cycle = (2.0 * PI * date.month0() as f64 / 12.0).sin();
            let level = base
                * (1.0 + spec.monthly_growth * months_elapsed)
                * (1.0 + YEARLY_AMPLITUDE * cycle);
            let membership = (level * (1.0 + member_noise.sample(&mut rng))).round();

            let weekday = WEEKDAY_FACTORS[date.weekday().num_days_from_monday() as usize];
            let expected = membership * spec.contact_rate / 365.0 * weekday;
            let calls = (expected * (1.0 + volume_noise.sample(&mut rng))).max(0.0).round();

            records.push(HistoricalRecord {
                date,
                call_volume: Some(calls),
                membership: Some(membership),
                lob: lob.clone(),
            });
            date += Duration::days(1);
        }
    }

    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.lob.cmp(&b.lob)));
    Ok(records)
}

/// Write one `history_<lob>.csv` per LOB into `dir`.
pub fn write_sample_csvs(dir: &Path, records: &[HistoricalRecord]) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::new(4, format!("Failed to create sample directory '{}': {e}", dir.display()))
    })?;

    let mut lobs: Vec<&str> = records.iter().map(|r| r.lob.as_str()).collect();
    lobs.sort_unstable();
    lobs.dedup();

    let mut paths = Vec::with_capacity(lobs.len());
    for lob in lobs {
        let path = dir.join(format!("history_{}.csv", file_stem(lob)));
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| AppError::new(4, format!("Failed to create '{}': {e}", path.display())))?;
        for r in records.iter().filter(|r| r.lob == lob) {
            writer
                .serialize(SampleRow {
                    date: r.date,
                    call_volume: r.call_volume.unwrap_or(0.0),
                    membership: r.membership.unwrap_or(0.0),
                    lob,
                })
                .map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::new(4, format!("Failed to flush '{}': {e}", path.display())))?;
        info!(path = %path.display(), lob, "wrote sample history");
        paths.push(path);
    }
    Ok(paths)
}

fn months_between(start: NaiveDate, date: NaiveDate) -> f64 {
    let months = (date.year() - start.year()) * 12 + date.month() as i32 - start.month() as i32;
    months as f64 + (date.day() as f64 - 1.0) / 30.0
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Per-LOB seed: FNV-1a over the seed's little-endian bytes, then the LOB name.
fn lob_seed(seed: u64, lob: &str) -> u64 {
    seed.to_le_bytes()
        .iter()
        .chain(lob.as_bytes())
        .fold(FNV_OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(FNV_PRIME))
}

fn file_stem(lob: &str) -> String {
    lob.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_and_merge_csv;

    fn spec(seed: u64) -> SampleSpec {
        SampleSpec::new(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), 3, seed, Vec::new())
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = generate_history(&spec(7)).unwrap();
        let b = generate_history(&spec(7)).unwrap();
        let c = generate_history(&spec(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn lob_seeds_are_fixed_fnv_values() {
        // FNV-1a of eight zero bytes.
        assert_eq!(lob_seed(0, ""), 0xa8c7_f832_281a_39c5);
        assert_eq!(lob_seed(42, "Medicare"), 0x86be_3876_c716_ba53);
        assert_ne!(lob_seed(42, "Medicare"), lob_seed(42, "Commercial"));
        assert_ne!(lob_seed(42, "Medicare"), lob_seed(43, "Medicare"));
    }

    #[test]
    fn covers_every_day_for_each_lob() {
        let records = generate_history(&spec(1)).unwrap();
        // Jan + Feb + Mar 2023 = 90 days, two LOBs.
        assert_eq!(records.len(), 180);
        assert!(records.windows(2).all(|w| w[0].date <= w[1].date));
        assert!(records.iter().all(|r| r.call_volume.unwrap() >= 0.0));
        let medicare = records.iter().find(|r| r.lob == "Medicare").unwrap();
        assert!(medicare.membership.unwrap() > 160_000.0);
    }

    #[test]
    fn rejects_empty_range() {
        let mut s = spec(1);
        s.months = 0;
        assert_eq!(generate_history(&s).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn written_csvs_reload_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let records = generate_history(&spec(3)).unwrap();
        let paths = write_sample_csvs(dir.path(), &records).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("history_commercial.csv"));

        let ingest = load_and_merge_csv(dir.path()).unwrap();
        assert_eq!(ingest.records.len(), records.len());
        assert_eq!(ingest.lobs(), vec!["Commercial".to_string(), "Medicare".to_string()]);
        assert!(ingest.row_errors.is_empty());
    }
}
