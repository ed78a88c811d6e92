//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during forecasting and decomposition
//! - exported to CSV/JSON
//! - reloaded later by the dashboard

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// LOB tag used when the input files carry no `LOB` column.
pub const DEFAULT_LOB: &str = "ALL";

/// One merged row of historical input.
///
/// Numeric fields are `None` when the raw value was missing or not coercible to a
/// number; such rows are still kept so other columns can be used.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub call_volume: Option<f64>,
    pub membership: Option<f64>,
    pub lob: String,
}

/// Month-level membership observation (last value seen in the month).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembershipPoint {
    /// First day of the calendar month.
    pub period_start: NaiveDate,
    pub value: f64,
}

/// Membership forecast for one future month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MembershipForecastRow {
    pub period_start: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Monthly call-volume forecast row.
///
/// Serialized column names follow the `monthly_forecast.csv` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyForecastRow {
    /// First day of the forecasted month.
    #[serde(rename = "ds")]
    pub period_start: NaiveDate,
    #[serde(default)]
    pub yhat: Option<f64>,
    #[serde(default)]
    pub yhat_lower: Option<f64>,
    #[serde(default)]
    pub yhat_upper: Option<f64>,
    #[serde(rename = "Monthly_Call_Volume")]
    pub monthly_call_volume: f64,
    #[serde(rename = "Monthly_Call_Volume_Lower", default)]
    pub monthly_call_volume_lower: Option<f64>,
    #[serde(rename = "Monthly_Call_Volume_Upper", default)]
    pub monthly_call_volume_upper: Option<f64>,
    #[serde(rename = "LOB", default)]
    pub lob: Option<String>,
}

impl MonthlyForecastRow {
    /// A row carrying only the fields the weekly decomposition needs.
    pub fn bare(period_start: NaiveDate, monthly_call_volume: f64, lob: Option<String>) -> Self {
        Self {
            period_start,
            yhat: None,
            yhat_lower: None,
            yhat_upper: None,
            monthly_call_volume,
            monthly_call_volume_lower: None,
            monthly_call_volume_upper: None,
            lob,
        }
    }
}

/// One of the four weekly rows derived from a [`MonthlyForecastRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyForecastRow {
    #[serde(rename = "Week_Start")]
    pub week_start: NaiveDate,
    #[serde(rename = "Estimated_Weekly_Call_Volume")]
    pub estimated_weekly_call_volume: f64,
    #[serde(rename = "Monthly_Call_Volume")]
    pub monthly_call_volume: f64,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "Confidence_Interval_Lower")]
    pub confidence_interval_lower: f64,
    #[serde(rename = "Confidence_Interval_Upper")]
    pub confidence_interval_upper: f64,
    #[serde(rename = "LOB", default)]
    pub lob: Option<String>,
}

/// Membership model family.
///
/// All non-flat kinds share the design row `[1, t, sin/cos pairs...]`; the kind
/// only decides how many yearly Fourier pairs are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Naive flat forecast at the last observed value.
    Flat,
    /// Linear trend only.
    Trend,
    /// Linear trend + 1 yearly Fourier pair.
    Yearly1,
    /// Linear trend + 2 yearly Fourier pairs.
    Yearly2,
    /// Linear trend + 3 yearly Fourier pairs.
    Yearly3,
}

impl ModelKind {
    /// Regression kinds in order of increasing complexity.
    pub const REGRESSION: [ModelKind; 4] = [
        ModelKind::Trend,
        ModelKind::Yearly1,
        ModelKind::Yearly2,
        ModelKind::Yearly3,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Flat => "Flat (naive)",
            ModelKind::Trend => "Trend",
            ModelKind::Yearly1 => "Trend+Yearly(1)",
            ModelKind::Yearly2 => "Trend+Yearly(2)",
            ModelKind::Yearly3 => "Trend+Yearly(3)",
        }
    }

    /// Number of yearly Fourier pairs.
    pub fn fourier_order(self) -> usize {
        match self {
            ModelKind::Flat | ModelKind::Trend => 0,
            ModelKind::Yearly1 => 1,
            ModelKind::Yearly2 => 2,
            ModelKind::Yearly3 => 3,
        }
    }

    /// Number of coefficients (intercept, slope, then 2 per Fourier pair).
    pub fn param_count(self) -> usize {
        match self {
            ModelKind::Flat => 1,
            _ => 2 + 2 * self.fourier_order(),
        }
    }

    pub fn is_seasonal(self) -> bool {
        self.fourier_order() > 0
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub n: usize,
}

/// Fitted membership model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipModel {
    pub kind: ModelKind,
    pub display_name: String,
    /// First history month; month ordinals `t` are counted from here.
    pub origin: NaiveDate,
    pub coefficients: Vec<f64>,
}

/// Fit output for a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub model: MembershipModel,
    pub quality: FitQuality,
}

/// In-sample forecast accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean absolute percentage error, as a fraction.
    pub mape: f64,
    pub rmse: f64,
}

/// Per-LOB outcome recorded in `forecast_summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobSummary {
    pub lob: String,
    pub records: usize,
    pub history_months: usize,
    pub contact_rate: f64,
    pub model: FitResult,
    pub metrics: Option<ForecastMetrics>,
    /// Calendar months with usable weekly pattern data.
    pub pattern_months: Vec<u32>,
    /// Forecasted calendar months that fell back to equal weekly weights.
    pub fallback_months: Vec<u32>,
}

/// A saved run summary (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryFile {
    pub tool: String,
    pub generated_at: String,
    pub periods: usize,
    pub lobs: Vec<LobSummary>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from the TOML config file plus CLI overrides.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Number of future months to forecast.
    pub periods: usize,
    /// Default contact rate (annual calls per member).
    pub contact_rate: f64,
    /// Per-LOB contact-rate overrides.
    pub contact_rates: BTreeMap<String, f64>,
    /// Produce a flat forecast instead of failing when history is too short.
    pub fallback_on_insufficient: bool,
    /// LOBs to process; empty means all LOBs found in the data.
    pub lobs: Vec<String>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl ForecastConfig {
    /// Contact rate for a LOB (override or default).
    pub fn contact_rate_for(&self, lob: &str) -> f64 {
        self.contact_rates.get(lob).copied().unwrap_or(self.contact_rate)
    }

    /// Whether a LOB passes the configured filter (case-insensitive).
    pub fn includes_lob(&self, lob: &str) -> bool {
        self.lobs.is_empty() || self.lobs.iter().any(|l| l.trim().eq_ignore_ascii_case(lob.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ForecastConfig {
        ForecastConfig {
            input_dir: PathBuf::from("in"),
            output_dir: PathBuf::from("out"),
            periods: 12,
            contact_rate: 0.45,
            contact_rates: BTreeMap::from([("Medicare".to_string(), 0.6)]),
            fallback_on_insufficient: true,
            lobs: Vec::new(),
            plot: false,
            plot_width: 80,
            plot_height: 20,
        }
    }

    #[test]
    fn contact_rate_override_wins() {
        let cfg = config();
        assert_eq!(cfg.contact_rate_for("Medicare"), 0.6);
        assert_eq!(cfg.contact_rate_for("Commercial"), 0.45);
    }

    #[test]
    fn lob_filter_is_case_insensitive() {
        let mut cfg = config();
        assert!(cfg.includes_lob("anything"));
        cfg.lobs = vec!["medicare".to_string()];
        assert!(cfg.includes_lob("Medicare"));
        assert!(!cfg.includes_lob("Commercial"));
    }

    #[test]
    fn param_counts() {
        assert_eq!(ModelKind::Flat.param_count(), 1);
        assert_eq!(ModelKind::Trend.param_count(), 2);
        assert_eq!(ModelKind::Yearly3.param_count(), 8);
    }
}
