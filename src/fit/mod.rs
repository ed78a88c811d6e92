//! Membership model fitting orchestration.
//!
//! Responsibilities:
//!
//! - least squares fit per model kind
//! - select best model using BIC + guardrails

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
