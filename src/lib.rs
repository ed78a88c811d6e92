//! `callvol` library crate.
//!
//! The binary (`callvol`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the forecast pipeline is shared by the CLI and the dashboard
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod seasonality;
pub mod tui;
pub mod validation;
