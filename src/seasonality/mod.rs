//! Weekly seasonality decomposition.
//!
//! Monthly call-volume forecasts are split into four weekly buckets using the
//! shape of historical call volume within each calendar month:
//!
//! ```text
//! HistoricalRecord[] ──► WeeklyPattern::build ──► resolve_month_weights (per month)
//!                                                  └─► decompose ──► WeeklyForecastRow[]
//! ```
//!
//! Everything here is pure and in-memory. The pattern is always passed in
//! explicitly, so separate LOBs can be processed in parallel.

pub mod decompose;
pub mod pattern;
pub mod weights;

pub use decompose::*;
pub use pattern::*;
pub use weights::*;
