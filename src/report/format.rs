use chrono::NaiveDate;

use crate::domain::{ForecastConfig, LobSummary, MonthlyForecastRow};
use crate::fit::selection::FitSelection;
use crate::io::ingest::IngestedData;
use crate::seasonality::{FallbackReason, MonthWeights, WeightSource};

/// Number of row errors listed before the rest are summarized.
const MAX_ROW_ERRORS_SHOWN: usize = 5;

/// Format the dataset header (files, rows, LOBs, row errors).
pub fn format_run_header(ingest: &IngestedData, config: &ForecastConfig) -> String {
    let mut out = String::new();

    out.push_str("=== callvol - Call Volume Forecast ===\n");
    out.push_str(&format!("Input: {}\n", config.input_dir.display()));
    out.push_str(&format!(
        "Files: {} | rows read={} | records={} | LOBs={}\n",
        ingest.files.len(),
        ingest.rows_read,
        ingest.records.len(),
        ingest.lobs().join(", "),
    ));
    out.push_str(&format!(
        "Horizon: {} months | default contact rate={:.3}\n",
        config.periods, config.contact_rate
    ));

    if !ingest.row_errors.is_empty() {
        out.push_str(&format!("Row errors: {}\n", ingest.row_errors.len()));
        for e in ingest.row_errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
            out.push_str(&format!(
                "  {}:{} {}\n",
                e.file.display(),
                e.line,
                e.message
            ));
        }
        if ingest.row_errors.len() > MAX_ROW_ERRORS_SHOWN {
            out.push_str(&format!(
                "  ... and {} more\n",
                ingest.row_errors.len() - MAX_ROW_ERRORS_SHOWN
            ));
        }
    }

    out
}

/// Format one LOB's model diagnostics, metrics and monthly forecast.
pub fn format_lob_summary(
    summary: &LobSummary,
    selection: &FitSelection,
    monthly: &[MonthlyForecastRow],
) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n--- LOB: {} ---\n", summary.lob));
    out.push_str(&format!(
        "Records: {} | membership months: {} | contact rate: {:.3}\n",
        summary.records, summary.history_months, summary.contact_rate
    ));

    out.push_str("\nModel diagnostics:\n");
    for fit in &selection.fits {
        let chosen = if fit.model.kind == selection.best.model.kind { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<16} SSE={:.3} RMSE={:.3} BIC={:.3}\n",
            fit.model.display_name, fit.quality.sse, fit.quality.rmse, fit.quality.bic
        ));
    }
    for (kind, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }

    out.push_str(&format!(
        "\nChosen model: {} coefficients={}\n",
        selection.best.model.display_name,
        fmt_vec(&selection.best.model.coefficients)
    ));
    match &summary.metrics {
        Some(m) => out.push_str(&format!(
            "In-sample: MAPE={:.2}% RMSE={:.1}\n",
            m.mape * 100.0,
            m.rmse
        )),
        None => out.push_str("In-sample: n/a (no membership history)\n"),
    }

    out.push('\n');
    out.push_str(&format_monthly_table(monthly));
    out
}

/// Format the monthly forecast table.
pub fn format_monthly_table(rows: &[MonthlyForecastRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:>12} {:>12} {:>12} {:>12}\n",
            "month", "members", "calls", "calls_lo", "calls_hi"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<12} {:-<12} {:-<12} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<10} {:>12} {:>12.1} {:>12} {:>12}\n",
                r.period_start.format("%Y-%m").to_string(),
                fmt_opt(r.yhat, 0),
                r.monthly_call_volume,
                fmt_opt(r.monthly_call_volume_lower, 1),
                fmt_opt(r.monthly_call_volume_upper, 1),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Format the resolved weekly weights for each forecast month.
pub fn format_month_weights(weights: &[(NaiveDate, MonthWeights)]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:>7} {:>7} {:>7} {:>7}  {:<10}\n",
            "month", "wk1", "wk2", "wk3", "wk4", "source"
        )
        .trim_end(),
    );
    out.push('\n');

    for (month, w) in weights {
        out.push_str(
            format!(
                "{:<10} {:>7.4} {:>7.4} {:>7.4} {:>7.4}  {:<10}\n",
                month.format("%Y-%m").to_string(),
                w.weights[0],
                w.weights[1],
                w.weights[2],
                w.weights[3],
                source_label(w.source),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn source_label(source: WeightSource) -> &'static str {
    match source {
        WeightSource::Historical => "history",
        WeightSource::Fallback(FallbackReason::MonthAbsent) => "equal (no data)",
        WeightSource::Fallback(FallbackReason::DegenerateTotal) => "equal (zero total)",
    }
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "-".to_string(),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.3}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seasonality::EQUAL_WEIGHTS;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn month_weights_table_shows_source() {
        let weights = vec![
            (
                d(2025, 3),
                MonthWeights {
                    weights: [0.1, 0.2, 0.3, 0.4],
                    source: WeightSource::Historical,
                },
            ),
            (d(2025, 7), MonthWeights::fallback(FallbackReason::MonthAbsent)),
        ];
        let table = format_month_weights(&weights);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2025-03"));
        assert!(lines[1].contains("0.1000"));
        assert!(lines[1].ends_with("history"));
        assert!(lines[2].ends_with("equal (no data)"));
        assert_eq!(
            MonthWeights::fallback(FallbackReason::MonthAbsent).weights,
            EQUAL_WEIGHTS
        );
    }

    #[test]
    fn monthly_table_handles_missing_band() {
        let rows = vec![MonthlyForecastRow::bare(d(2025, 1), 4500.0, None)];
        let table = format_monthly_table(&rows);
        let last = table.lines().last().unwrap();
        assert!(last.starts_with("2025-01"));
        assert!(last.contains("4500.0"));
        assert!(last.ends_with('-'));
    }

    #[test]
    fn fmt_helpers() {
        assert_eq!(fmt_opt(Some(1.26), 1), "1.3");
        assert_eq!(fmt_opt(None, 1), "-");
        assert_eq!(fmt_vec(&[1.0, -2.5]), "[1.000, -2.500]");
    }
}
