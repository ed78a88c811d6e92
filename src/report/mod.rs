//! Reporting utilities: formatted terminal output for forecast runs.
//!
//! We keep formatting code in one place so:
//! - the forecasting code stays clean and testable
//! - output changes are localized

pub mod format;

pub use format::*;
