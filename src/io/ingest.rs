//! CSV ingest and normalization.
//!
//! This module turns a directory of heterogeneous history exports into one
//! date-sorted list of `HistoricalRecord`s, and reads monthly forecast CSVs
//! for the standalone weekly breakdown.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Lenient numerics**: unparseable volumes become missing, not fatal
//! - **Deterministic behavior**: files are read in sorted path order

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{DEFAULT_LOB, HistoricalRecord, MonthlyForecastRow};
use crate::error::AppError;

const COL_DATE: &str = "date";
const COL_CALL_VOLUME: &str = "historical_call_volume";
const COL_MEMBERSHIP: &str = "membership_count";
const COL_LOB: &str = "lob";
const COL_DS: &str = "ds";
const COL_MONTHLY_VOLUME: &str = "monthly_call_volume";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

/// Ingest output: merged records + provenance + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<HistoricalRecord>,
    pub files: Vec<PathBuf>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedData {
    /// Distinct LOB names, sorted.
    pub fn lobs(&self) -> Vec<String> {
        let mut lobs: Vec<String> = self.records.iter().map(|r| r.lob.clone()).collect();
        lobs.sort();
        lobs.dedup();
        lobs
    }

    /// Records belonging to one LOB, in date order.
    pub fn records_for(&self, lob: &str) -> Vec<HistoricalRecord> {
        self.records.iter().filter(|r| r.lob == lob).cloned().collect()
    }
}

/// Load every `*.csv` file in `dir` and merge them into one date-sorted list.
pub fn load_and_merge_csv(dir: &Path) -> Result<IngestedData, AppError> {
    let files = discover_csv_files(dir)?;
    if files.is_empty() {
        return Err(AppError::new(
            2,
            format!("No CSV files found in '{}'.", dir.display()),
        ));
    }

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for path in &files {
        let before = records.len();
        rows_read += read_history_file(path, &mut records, &mut row_errors)?;
        debug!(file = %path.display(), rows = records.len() - before, "read history file");
    }

    // Stable sort keeps per-file order for records sharing a date.
    records.sort_by_key(|r| r.date);

    if !row_errors.is_empty() {
        warn!(count = row_errors.len(), "skipped malformed history rows");
        for e in row_errors.iter().take(5) {
            warn!(file = %e.file.display(), line = e.line, "{}", e.message);
        }
    }
    info!(
        files = files.len(),
        rows_read,
        rows_used = records.len(),
        "merged historical CSV files"
    );

    Ok(IngestedData {
        records,
        files,
        row_errors,
        rows_read,
    })
}

fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to read input directory '{}': {e}", dir.display()),
        )
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn read_history_file(
    path: &Path,
    records: &mut Vec<HistoricalRecord>,
    row_errors: &mut Vec<RowError>,
) -> Result<usize, AppError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers in '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);

    if !header_map.contains_key(COL_DATE) {
        return Err(AppError::new(
            2,
            format!("Missing required column `Date` in '{}'.", path.display()),
        ));
    }
    if !header_map.contains_key(COL_CALL_VOLUME) && !header_map.contains_key(COL_MEMBERSHIP) {
        return Err(AppError::new(
            2,
            format!(
                "'{}' needs at least one of `Historical_Call_Volume` or `Membership_Count`.",
                path.display()
            ),
        ));
    }

    let mut rows_read = 0usize;
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, plus the header line.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    file: path.to_path_buf(),
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_history_row(&record, &header_map) {
            Ok(row) => records.push(row),
            Err(message) => row_errors.push(RowError {
                file: path.to_path_buf(),
                line,
                message,
            }),
        }
    }

    Ok(rows_read)
}

fn parse_history_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<HistoricalRecord, String> {
    let date = parse_date(get_required(record, header_map, COL_DATE)?)?;
    let call_volume = parse_opt_f64(get_optional(record, header_map, COL_CALL_VOLUME));
    let membership = parse_opt_count(get_optional(record, header_map, COL_MEMBERSHIP));
    let lob = get_optional(record, header_map, COL_LOB)
        .unwrap_or(DEFAULT_LOB)
        .to_string();

    Ok(HistoricalRecord {
        date,
        call_volume,
        membership,
        lob,
    })
}

/// Read a monthly forecast CSV (`ds`, `Monthly_Call_Volume`, optional `LOB`).
///
/// `ds` may be any day of the month; it is normalized to the first of the month.
pub fn load_monthly_forecast(path: &Path) -> Result<Vec<MonthlyForecastRow>, AppError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers in '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);

    for col in [COL_DS, COL_MONTHLY_VOLUME] {
        if !header_map.contains_key(col) {
            return Err(AppError::new(
                2,
                format!("Missing required column `{col}` in '{}'.", path.display()),
            ));
        }
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::new(2, format!("CSV parse error in '{}' line {line}: {e}", path.display()))
        })?;

        let row = parse_monthly_row(&record, &header_map)
            .map_err(|e| AppError::new(2, format!("'{}' line {line}: {e}", path.display())))?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(AppError::new(
            3,
            format!("No monthly forecast rows in '{}'.", path.display()),
        ));
    }
    Ok(rows)
}

fn parse_monthly_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<MonthlyForecastRow, String> {
    let ds = parse_date(get_required(record, header_map, COL_DS)?)?;
    let volume = parse_opt_f64(Some(get_required(record, header_map, COL_MONTHLY_VOLUME)?))
        .ok_or_else(|| "Invalid `Monthly_Call_Volume` value.".to_string())?;
    let lob = get_optional(record, header_map, COL_LOB).map(str::to_string);
    Ok(MonthlyForecastRow::bare(first_of_month(ds), volume, lob))
}

/// First day of `date`'s month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    date.with_day(1).unwrap_or(date)
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a date in one of the accepted formats.
///
/// A trailing time component (`YYYY-MM-DD HH:MM:SS`, as written by pandas) is ignored.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    let head = s.split([' ', 'T']).next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(head, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, MM/DD/YYYY, DD-MM-YYYY."
    ))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse a count that may carry thousands separators or other decoration
/// (`"1,234"`, `"12 500 members"`): everything but digits, sign, and `.` is stripped.
fn parse_opt_count(s: Option<&str>) -> Option<f64> {
    let cleaned: String = s?
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        .collect();
    parse_opt_f64(Some(&cleaned))
}
