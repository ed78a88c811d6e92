//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - merged historical input rows (`HistoricalRecord`)
//! - monthly and weekly forecast rows (`MonthlyForecastRow`, `WeeklyForecastRow`)
//! - membership model outputs (`FitResult`, `MembershipModel`, etc.)
//! - the resolved run configuration (`ForecastConfig`)

pub mod types;

pub use types::*;
