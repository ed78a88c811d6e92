//! Shared "forecast pipeline" logic used by both the CLI and the dashboard.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> monthly membership -> model fit/selection -> call volume -> weekly split
//!
//! Each LOB is processed independently on the rayon pool.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{
    ForecastConfig, ForecastMetrics, HistoricalRecord, LobSummary, MonthlyForecastRow, SummaryFile,
    WeeklyForecastRow,
};
use crate::error::AppError;
use crate::forecast::{MembershipForecast, aggregate_monthly, forecast_call_volume, forecast_membership};
use crate::io::ingest::{IngestedData, load_and_merge_csv};
use crate::io::{
    MONTHLY_FILE, SUMMARY_FILE, WEEKLY_FILE, build_summary, write_monthly_csv, write_summary_json,
    write_weekly_csv,
};
use crate::seasonality::{MonthWeights, WeeklyPattern, decompose, resolve_month_weights};
use crate::validation::validate_forecast;

/// Outputs computed for a single LOB.
#[derive(Debug, Clone)]
pub struct LobRun {
    pub lob: String,
    pub records: usize,
    pub membership: MembershipForecast,
    pub monthly: Vec<MonthlyForecastRow>,
    pub weekly: Vec<WeeklyForecastRow>,
    pub pattern: WeeklyPattern,
    /// Weights resolved for each forecast month.
    pub weights: Vec<(NaiveDate, MonthWeights)>,
    pub metrics: Option<ForecastMetrics>,
    pub summary: LobSummary,
}

/// All computed outputs of a single `callvol forecast` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub lobs: Vec<LobRun>,
    pub summary: SummaryFile,
}

impl RunOutput {
    pub fn monthly_rows(&self) -> Vec<MonthlyForecastRow> {
        self.lobs.iter().flat_map(|l| l.monthly.iter().cloned()).collect()
    }

    pub fn weekly_rows(&self) -> Vec<WeeklyForecastRow> {
        self.lobs.iter().flat_map(|l| l.weekly.iter().cloned()).collect()
    }
}

/// Paths written by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub monthly: PathBuf,
    pub weekly: PathBuf,
    pub summary: PathBuf,
}

/// Execute the full forecasting pipeline and return the computed outputs.
pub fn run_forecast(config: &ForecastConfig) -> Result<RunOutput, AppError> {
    let ingest = load_and_merge_csv(&config.input_dir)?;
    run_forecast_with_data(config, ingest)
}

/// Execute the pipeline over already-ingested records.
pub fn run_forecast_with_data(config: &ForecastConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let lobs: Vec<String> = ingest
        .lobs()
        .into_iter()
        .filter(|lob| config.includes_lob(lob))
        .collect();
    if lobs.is_empty() {
        return Err(AppError::new(3, "No records found for the requested LOBs."));
    }
    for wanted in &config.lobs {
        if !lobs.iter().any(|l| l.eq_ignore_ascii_case(wanted.trim())) {
            warn!(lob = %wanted, "requested LOB not present in input data");
        }
    }

    let runs = lobs
        .par_iter()
        .map(|lob| run_lob(config, lob, &ingest.records_for(lob)))
        .collect::<Result<Vec<_>, AppError>>()?;

    let summary = build_summary(runs.iter().map(|r| r.summary.clone()).collect(), config.periods);
    info!(lobs = runs.len(), periods = config.periods, "forecast complete");

    Ok(RunOutput {
        ingest,
        lobs: runs,
        summary,
    })
}

fn run_lob(config: &ForecastConfig, lob: &str, records: &[HistoricalRecord]) -> Result<LobRun, AppError> {
    let contact_rate = config.contact_rate_for(lob);

    let history = aggregate_monthly(records);
    let membership = forecast_membership(&history, config.periods, config.fallback_on_insufficient)
        .map_err(|e| AppError::new(e.exit_code(), format!("LOB '{lob}': {e}")))?;
    if membership.is_flat() {
        warn!(lob, history_months = history.len(), "using flat membership forecast");
    }

    let monthly = forecast_call_volume(&membership.rows, contact_rate, Some(lob));
    let pattern = WeeklyPattern::build(records);
    let weekly = decompose(&monthly, &pattern);

    let weights: Vec<(NaiveDate, MonthWeights)> = monthly
        .iter()
        .map(|m| (m.period_start, resolve_month_weights(&pattern, m.period_start.month())))
        .collect();
    let mut fallback_months: Vec<u32> = weights
        .iter()
        .filter(|(_, w)| w.is_fallback())
        .map(|(d, _)| d.month())
        .collect();
    fallback_months.sort_unstable();
    fallback_months.dedup();
    if !fallback_months.is_empty() {
        warn!(lob, months = ?fallback_months, "equal weekly weights used for months without pattern data");
    }

    let actual: Vec<f64> = history.iter().map(|h| h.value).collect();
    let metrics = if actual.is_empty() {
        None
    } else {
        validate_forecast(&actual, &membership.fitted).ok()
    };

    let summary = LobSummary {
        lob: lob.to_string(),
        records: records.len(),
        history_months: history.len(),
        contact_rate,
        model: membership.selection.best.clone(),
        metrics,
        pattern_months: pattern.months(),
        fallback_months,
    };

    info!(
        lob,
        model = %summary.model.model.display_name,
        months = monthly.len(),
        weeks = weekly.len(),
        "LOB forecast ready"
    );

    Ok(LobRun {
        lob: lob.to_string(),
        records: records.len(),
        membership,
        monthly,
        weekly,
        pattern,
        weights,
        metrics,
        summary,
    })
}

/// Write the monthly/weekly CSVs and the JSON summary into `output_dir`.
pub fn write_outputs(output_dir: &Path, run: &RunOutput) -> Result<OutputPaths, AppError> {
    let paths = OutputPaths {
        monthly: output_dir.join(MONTHLY_FILE),
        weekly: output_dir.join(WEEKLY_FILE),
        summary: output_dir.join(SUMMARY_FILE),
    };
    write_monthly_csv(&paths.monthly, &run.monthly_rows())?;
    write_weekly_csv(&paths.weekly, &run.weekly_rows())?;
    write_summary_json(&paths.summary, &run.summary)?;
    Ok(paths)
}

/// Decompose an existing monthly forecast using patterns from ingested history.
///
/// Rows tagged with a LOB use that LOB's history; untagged rows (or LOBs absent
/// from the history) use the whole history.
pub fn decompose_monthly(monthly: &[MonthlyForecastRow], ingest: &IngestedData) -> Vec<WeeklyForecastRow> {
    let overall = WeeklyPattern::build(&ingest.records);
    let mut out = Vec::with_capacity(monthly.len() * crate::seasonality::WEEKS_PER_MONTH);

    // Consecutive rows with the same LOB share one pattern.
    let mut start = 0;
    while start < monthly.len() {
        let lob = monthly[start].lob.clone();
        let end = monthly[start..]
            .iter()
            .position(|m| m.lob != lob)
            .map_or(monthly.len(), |p| start + p);

        let lob_records = lob
            .as_deref()
            .map(|l| ingest.records_for(l))
            .unwrap_or_default();
        if lob_records.is_empty() {
            out.extend(decompose(&monthly[start..end], &overall));
        } else {
            out.extend(decompose(&monthly[start..end], &WeeklyPattern::build(&lob_records)));
        }
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;

    use crate::domain::ModelKind;
    use crate::io::{read_monthly_csv, read_summary_json, read_weekly_csv};

    fn config(input: &Path, output: &Path) -> ForecastConfig {
        ForecastConfig {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            periods: 6,
            contact_rate: 0.45,
            contact_rates: BTreeMap::from([("Commercial".to_string(), 0.3)]),
            fallback_on_insufficient: true,
            lobs: Vec::new(),
            plot: false,
            plot_width: 80,
            plot_height: 20,
        }
    }

    fn write_history(dir: &Path) {
        // 24 months of first-of-month and mid-month rows for two LOBs.
        let mut csv = String::from("Date,Historical_Call_Volume,Membership_Count,LOB\n");
        for i in 0..24u32 {
            let year = 2022 + (i / 12) as i32;
            let month = i % 12 + 1;
            let members = 150_000 + 500 * i;
            csv.push_str(&format!("{year}-{month:02}-01,100,\"{members}\",Medicare\n"));
            csv.push_str(&format!("{year}-{month:02}-15,300,{members},Medicare\n"));
            csv.push_str(&format!("{year}-{month:02}-01,50,{},Commercial\n", members / 2));
        }
        fs::write(dir.join("history.csv"), csv).unwrap();
    }

    #[test]
    fn end_to_end_forecast_writes_outputs() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_history(input.path());
        let cfg = config(input.path(), output.path());

        let run = run_forecast(&cfg).unwrap();
        assert_eq!(run.lobs.len(), 2);
        assert_eq!(run.lobs[0].lob, "Commercial");
        assert_eq!(run.lobs[1].lob, "Medicare");

        for lob in &run.lobs {
            assert_eq!(lob.monthly.len(), 6);
            assert_eq!(lob.weekly.len(), 24);
            assert_eq!(lob.monthly[0].period_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
            assert_eq!(lob.summary.model.model.kind, ModelKind::Trend);
            assert!(lob.metrics.is_some());
            assert!(lob.summary.fallback_months.is_empty());
        }

        let commercial = &run.lobs[0];
        assert_eq!(commercial.summary.contact_rate, 0.3);
        let m = &commercial.monthly[0];
        let yhat = m.yhat.unwrap();
        assert!((m.monthly_call_volume - yhat * 0.3 / 12.0).abs() < 1e-6);

        // Medicare: weekly volume sums back to the monthly total.
        let medicare = &run.lobs[1];
        for (month, weeks) in medicare.monthly.iter().zip(medicare.weekly.chunks(4)) {
            let total: f64 = weeks.iter().map(|w| w.estimated_weekly_call_volume).sum();
            assert!((total - month.monthly_call_volume).abs() < 1e-6);
        }

        let paths = write_outputs(output.path(), &run).unwrap();
        assert_eq!(read_monthly_csv(&paths.monthly).unwrap().len(), 12);
        assert_eq!(read_weekly_csv(&paths.weekly).unwrap().len(), 48);
        let summary = read_summary_json(&paths.summary).unwrap();
        assert_eq!(summary.lobs.len(), 2);
        assert_eq!(summary.periods, 6);
    }

    #[test]
    fn lob_filter_limits_processing() {
        let input = tempfile::tempdir().unwrap();
        write_history(input.path());
        let mut cfg = config(input.path(), input.path());
        cfg.lobs = vec!["medicare".to_string()];

        let run = run_forecast(&cfg).unwrap();
        assert_eq!(run.lobs.len(), 1);
        assert_eq!(run.lobs[0].lob, "Medicare");

        cfg.lobs = vec!["Dental".to_string()];
        assert_eq!(run_forecast(&cfg).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn decompose_monthly_uses_lob_pattern() {
        let input = tempfile::tempdir().unwrap();
        write_history(input.path());
        let ingest = load_and_merge_csv(input.path()).unwrap();

        let monthly = vec![
            MonthlyForecastRow::bare(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 1000.0, Some("Medicare".into())),
            MonthlyForecastRow::bare(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 1000.0, None),
        ];
        let weekly = decompose_monthly(&monthly, &ingest);
        assert_eq!(weekly.len(), 8);
        assert_eq!(weekly[0].lob.as_deref(), Some("Medicare"));
        assert!(weekly[4].lob.is_none());
        let total: f64 = weekly[..4].iter().map(|w| w.estimated_weekly_call_volume).sum();
        assert!((total - 1000.0).abs() < 1e-9);
    }
}
