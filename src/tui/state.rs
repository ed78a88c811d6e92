//! Dashboard data and interaction state (no terminal I/O).

use std::path::Path;

use crate::domain::{DEFAULT_LOB, LobSummary, MonthlyForecastRow, SummaryFile, WeeklyForecastRow};
use crate::error::AppError;
use crate::forecast::sensitivity_weekly_volume;
use crate::io::{MONTHLY_FILE, SUMMARY_FILE, WEEKLY_FILE, read_monthly_csv, read_summary_json, read_weekly_csv};

pub const MEMBERSHIP_MIN: u32 = 150_000;
pub const MEMBERSHIP_MAX: u32 = 200_000;
pub const MEMBERSHIP_STEP: u32 = 1_000;
pub const MEMBERSHIP_DEFAULT: u32 = 170_000;

/// Contact rate bounds in hundredths (0.30 .. 0.60).
pub const RATE_MIN_PCT: u32 = 30;
pub const RATE_MAX_PCT: u32 = 60;
pub const RATE_DEFAULT_PCT: u32 = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Sensitivity,
    Intervals,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Overview, Tab::Sensitivity, Tab::Intervals];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Sensitivity => "Sensitivity",
            Tab::Intervals => "Intervals",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

/// Sensitivity input being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Membership,
    ContactRate,
}

/// Forecast outputs loaded from disk.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub monthly: Vec<MonthlyForecastRow>,
    pub weekly: Vec<WeeklyForecastRow>,
    pub summary: Option<SummaryFile>,
    pub lobs: Vec<String>,
}

impl DashboardData {
    /// Load the forecast CSVs (required) and the JSON summary (optional).
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        let monthly_path = dir.join(MONTHLY_FILE);
        if !monthly_path.exists() {
            return Err(AppError::new(
                2,
                format!(
                    "'{}' not found. Run `callvol forecast` first.",
                    monthly_path.display()
                ),
            ));
        }
        let monthly = read_monthly_csv(&monthly_path)?;
        let weekly = read_weekly_csv(&dir.join(WEEKLY_FILE))?;

        let summary_path = dir.join(SUMMARY_FILE);
        let summary = if summary_path.exists() {
            Some(read_summary_json(&summary_path)?)
        } else {
            None
        };
        Ok(Self::new(monthly, weekly, summary))
    }

    pub fn new(
        monthly: Vec<MonthlyForecastRow>,
        weekly: Vec<WeeklyForecastRow>,
        summary: Option<SummaryFile>,
    ) -> Self {
        let mut lobs: Vec<String> = monthly.iter().map(|m| lob_name(m.lob.as_deref()).to_string()).collect();
        lobs.sort();
        lobs.dedup();
        Self {
            monthly,
            weekly,
            summary,
            lobs,
        }
    }

    pub fn monthly_for(&self, lob: &str) -> Vec<&MonthlyForecastRow> {
        self.monthly.iter().filter(|m| lob_name(m.lob.as_deref()) == lob).collect()
    }

    pub fn weekly_for(&self, lob: &str) -> Vec<&WeeklyForecastRow> {
        self.weekly.iter().filter(|w| lob_name(w.lob.as_deref()) == lob).collect()
    }

    pub fn summary_for(&self, lob: &str) -> Option<&LobSummary> {
        self.summary.as_ref()?.lobs.iter().find(|l| l.lob == lob)
    }

    /// Mean forecast weekly volume for a LOB.
    pub fn mean_weekly_volume(&self, lob: &str) -> Option<f64> {
        let weeks = self.weekly_for(lob);
        if weeks.is_empty() {
            return None;
        }
        Some(weeks.iter().map(|w| w.estimated_weekly_call_volume).sum::<f64>() / weeks.len() as f64)
    }
}

fn lob_name(lob: Option<&str>) -> &str {
    lob.unwrap_or(DEFAULT_LOB)
}

/// Interactive selection state.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub tab: Tab,
    pub lob_index: usize,
    pub field: Field,
    pub membership: u32,
    pub rate_pct: u32,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            tab: Tab::Overview,
            lob_index: 0,
            field: Field::Membership,
            membership: MEMBERSHIP_DEFAULT,
            rate_pct: RATE_DEFAULT_PCT,
        }
    }
}

impl DashboardState {
    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
    }

    /// Move the LOB selection, wrapping around.
    pub fn shift_lob(&mut self, delta: isize, lob_count: usize) {
        if lob_count == 0 {
            self.lob_index = 0;
            return;
        }
        let n = lob_count as isize;
        self.lob_index = ((self.lob_index as isize + delta).rem_euclid(n)) as usize;
    }

    pub fn select_field(&mut self, field: Field) {
        self.field = field;
    }

    /// Step the selected sensitivity input, clamped to its range.
    pub fn adjust(&mut self, steps: i32) {
        match self.field {
            Field::Membership => {
                let next = self.membership as i64 + steps as i64 * MEMBERSHIP_STEP as i64;
                self.membership = next.clamp(MEMBERSHIP_MIN as i64, MEMBERSHIP_MAX as i64) as u32;
            }
            Field::ContactRate => {
                let next = self.rate_pct as i64 + steps as i64;
                self.rate_pct = next.clamp(RATE_MIN_PCT as i64, RATE_MAX_PCT as i64) as u32;
            }
        }
    }

    pub fn contact_rate(&self) -> f64 {
        self.rate_pct as f64 / 100.0
    }

    /// Weekly call volume implied by the current sensitivity inputs.
    pub fn adjusted_weekly_volume(&self) -> f64 {
        sensitivity_weekly_volume(self.membership as f64, self.contact_rate())
    }
}
