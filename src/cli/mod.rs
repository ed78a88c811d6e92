//! Command-line parsing for the call-volume forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the forecasting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

/// Subcommand names, used when rewriting argv for the default command.
pub const SUBCOMMANDS: [&str; 4] = ["forecast", "weekly", "sample", "dashboard"];

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "callvol", version, about = "Call-center volume forecaster (monthly + weekly)")]
pub struct Cli {
    /// TOML configuration file (defaults to ./config.toml when present).
    #[arg(long, global = true, env = "CALLVOL_CONFIG", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace). `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline: ingest, forecast membership, convert, decompose, export.
    Forecast(ForecastArgs),
    /// Split an existing monthly forecast CSV into weekly rows.
    Weekly(WeeklyArgs),
    /// Write synthetic historical CSVs for demos and testing.
    Sample(SampleArgs),
    /// Launch the terminal dashboard over previously written outputs.
    Dashboard(DashboardArgs),
}

/// Options for the full forecast run.
#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Directory of historical CSV files.
    #[arg(short = 'i', long, value_name = "DIR")]
    pub input: Option<PathBuf>,

    /// Directory for output files.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of months to forecast.
    #[arg(short = 'p', long)]
    pub periods: Option<usize>,

    /// Annual calls per member.
    #[arg(long)]
    pub contact_rate: Option<f64>,

    /// Restrict the run to these LOBs (repeatable).
    #[arg(long = "lob", value_name = "NAME")]
    pub lobs: Vec<String>,

    /// Render an ASCII plot per LOB (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}

impl ForecastArgs {
    pub fn overrides(&self, log_level: Option<String>) -> Overrides {
        Overrides {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            periods: self.periods,
            contact_rate: self.contact_rate,
            lobs: self.lobs.clone(),
            log_level,
        }
    }
}

/// Options for decomposing an existing monthly forecast.
#[derive(Debug, Args, Clone)]
pub struct WeeklyArgs {
    /// Monthly forecast CSV (`ds`, `Monthly_Call_Volume`, optional `LOB`).
    #[arg(long, value_name = "CSV")]
    pub monthly: PathBuf,

    /// Directory of historical CSV files used to build the weekly pattern.
    #[arg(short = 'i', long, value_name = "DIR")]
    pub input: Option<PathBuf>,

    /// Output CSV (defaults to `<output_dir>/weekly_forecast.csv`).
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output directory (defaults to the configured input directory).
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Months of daily history to generate.
    #[arg(long, default_value_t = 36)]
    pub months: u32,

    /// First day of generated history (YYYY-MM-DD).
    #[arg(long, default_value = "2022-01-01")]
    pub start: String,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// LOB names (repeatable; defaults to Medicare and Commercial).
    #[arg(long = "lob", value_name = "NAME")]
    pub lobs: Vec<String>,
}

/// Options for the dashboard.
#[derive(Debug, Args, Clone)]
pub struct DashboardArgs {
    /// Directory containing forecast outputs.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forecast_flags() {
        let cli = Cli::try_parse_from([
            "callvol",
            "--log-level",
            "debug",
            "forecast",
            "--periods",
            "6",
            "--lob",
            "Medicare",
            "--lob",
            "Commercial",
            "--no-plot",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.periods, Some(6));
        assert_eq!(args.lobs, vec!["Medicare", "Commercial"]);
        assert!(args.no_plot);
        let overrides = args.overrides(cli.log_level.clone());
        assert_eq!(overrides.periods, Some(6));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn weekly_requires_monthly_csv() {
        assert!(Cli::try_parse_from(["callvol", "weekly"]).is_err());
        let cli = Cli::try_parse_from(["callvol", "weekly", "--monthly", "m.csv"]).unwrap();
        assert!(matches!(cli.command, Command::Weekly(_)));
    }
}
