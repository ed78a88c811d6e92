//! Forecast CSV exports (and reload for the dashboard).
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts; column names match the historical reporting layout.

use std::fs::{self, File};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::domain::{MonthlyForecastRow, WeeklyForecastRow};
use crate::error::AppError;

pub const MONTHLY_FILE: &str = "monthly_forecast.csv";
pub const WEEKLY_FILE: &str = "weekly_forecast.csv";

/// Write monthly forecast rows to `path`.
pub fn write_monthly_csv(path: &Path, rows: &[MonthlyForecastRow]) -> Result<(), AppError> {
    write_rows(path, rows)
}

/// Write weekly forecast rows to `path`.
pub fn write_weekly_csv(path: &Path, rows: &[WeeklyForecastRow]) -> Result<(), AppError> {
    write_rows(path, rows)
}

/// Read a `monthly_forecast.csv` written by [`write_monthly_csv`].
pub fn read_monthly_csv(path: &Path) -> Result<Vec<MonthlyForecastRow>, AppError> {
    read_rows(path)
}

/// Read a `weekly_forecast.csv` written by [`write_weekly_csv`].
pub fn read_weekly_csv(path: &Path) -> Result<Vec<WeeklyForecastRow>, AppError> {
    read_rows(path)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new(4, format!("Failed to create output directory '{}': {e}", parent.display()))
        })?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV '{}': {e}", path.display())))?;

    info!(path = %path.display(), rows = rows.len(), "data saved");
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    reader
        .deserialize()
        .enumerate()
        .map(|(idx, row)| {
            row.map_err(|e| {
                AppError::new(2, format!("Invalid row {} in '{}': {e}", idx + 2, path.display()))
            })
        })
        .collect()
}
