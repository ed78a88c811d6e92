//! Read/write run summary JSON files.
//!
//! The summary is the portable record of a forecast run:
//! - per-LOB model choice + coefficients + fit quality
//! - in-sample metrics
//! - which calendar months had weekly pattern data and which fell back
//!
//! The schema is defined by `domain::SummaryFile`.

use std::fs::File;
use std::path::Path;

use chrono::Local;

use crate::domain::{LobSummary, SummaryFile};
use crate::error::AppError;

pub const SUMMARY_FILE: &str = "forecast_summary.json";

/// Build a summary file for the given LOB results.
pub fn build_summary(lobs: Vec<LobSummary>, periods: usize) -> SummaryFile {
    SummaryFile {
        tool: "callvol".to_string(),
        generated_at: Local::now().to_rfc3339(),
        periods,
        lobs,
    }
}

/// Write a summary JSON file.
pub fn write_summary_json(path: &Path, summary: &SummaryFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(4, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Read a summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<SummaryFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let summary: SummaryFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, FitResult, ForecastMetrics, MembershipModel, ModelKind};
    use chrono::NaiveDate;

    #[test]
    fn summary_survives_a_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        let lob = LobSummary {
            lob: "Medicare".to_string(),
            records: 730,
            history_months: 24,
            contact_rate: 0.45,
            model: FitResult {
                model: MembershipModel {
                    kind: ModelKind::Yearly1,
                    display_name: ModelKind::Yearly1.display_name().to_string(),
                    origin: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                    coefficients: vec![150_000.0, 800.0, 1200.0, -300.0],
                },
                quality: FitQuality { sse: 1.0, rmse: 0.2, bic: -10.0, n: 24 },
            },
            metrics: Some(ForecastMetrics { mape: 0.01, rmse: 0.2 }),
            pattern_months: (1..=12).collect(),
            fallback_months: vec![],
        };

        write_summary_json(&path, &build_summary(vec![lob], 12)).unwrap();
        let back = read_summary_json(&path).unwrap();
        assert_eq!(back.tool, "callvol");
        assert_eq!(back.periods, 12);
        assert_eq!(back.lobs.len(), 1);
        assert_eq!(back.lobs[0].model.model.kind, ModelKind::Yearly1);
        assert_eq!(back.lobs[0].pattern_months.len(), 12);
    }
}
