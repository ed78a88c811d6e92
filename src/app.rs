//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads configuration
//! - sets up logging
//! - dispatches to the forecast, weekly, sample and dashboard commands

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Cli, Command, DashboardArgs, ForecastArgs, SUBCOMMANDS, SampleArgs, WeeklyArgs};
use crate::config::{Overrides, Settings};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `callvol` binary.
pub fn run() -> Result<(), AppError> {
    let cli = parse_cli(std::env::args().collect(), None);

    let (mut settings, config_path) = Settings::load(cli.config.as_deref())?;
    settings.apply_log_level(&Overrides {
        log_level: cli.log_level.clone(),
        ..Overrides::default()
    });

    // The dashboard owns the terminal, so its logs go to the file only.
    let console = !matches!(cli.command, Command::Dashboard(_));
    crate::logging::init(&settings.logging, console)?;
    match &config_path {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => info!("no config file found; using defaults"),
    }

    match cli.command {
        Command::Forecast(args) => handle_forecast(&settings, args, cli.log_level),
        Command::Weekly(args) => handle_weekly(&settings, args),
        Command::Sample(args) => handle_sample(&settings, args),
        Command::Dashboard(args) => handle_dashboard(&settings, args),
    }
}

/// Load `.env`, then parse argv.
///
/// `.env` must be loaded first: clap reads `CALLVOL_CONFIG` while parsing.
/// A missing `.env` is fine. `env_file` replaces the default lookup.
fn parse_cli(argv: Vec<String>, env_file: Option<&Path>) -> Cli {
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };

    // `callvol` with no subcommand opens the dashboard. Clap requires a
    // subcommand name, so argv is rewritten before parsing.
    Cli::parse_from(rewrite_args(argv))
}

fn handle_forecast(settings: &Settings, args: ForecastArgs, log_level: Option<String>) -> Result<(), AppError> {
    let mut config = settings.resolve(&args.overrides(log_level))?;
    config.plot = args.plot && !args.no_plot;
    config.plot_width = args.width;
    config.plot_height = args.height;

    let run = pipeline::run_forecast(&config)?;

    println!("{}", crate::report::format_run_header(&run.ingest, &config));
    for lob in &run.lobs {
        println!(
            "{}",
            crate::report::format_lob_summary(&lob.summary, &lob.membership.selection, &lob.monthly)
        );
        println!("{}", crate::report::format_month_weights(&lob.weights));

        if config.plot {
            let history = crate::forecast::monthly_call_totals(&run.ingest.records_for(&lob.lob));
            let plot = crate::plot::render_volume_plot(&history, &lob.monthly, config.plot_width, config.plot_height);
            println!("{plot}");
        }
    }

    let paths = pipeline::write_outputs(&config.output_dir, &run)?;
    println!("Monthly forecast: {}", paths.monthly.display());
    println!("Weekly forecast:  {}", paths.weekly.display());
    println!("Run summary:      {}", paths.summary.display());
    Ok(())
}

fn handle_weekly(settings: &Settings, args: WeeklyArgs) -> Result<(), AppError> {
    let monthly = crate::io::load_monthly_forecast(&args.monthly)?;
    let input_dir = args.input.unwrap_or_else(|| settings.data.input_dir.clone());
    let ingest = crate::io::load_and_merge_csv(&input_dir)?;

    let weekly = pipeline::decompose_monthly(&monthly, &ingest);
    let out = args
        .out
        .unwrap_or_else(|| settings.data.output_dir.join(crate::io::WEEKLY_FILE));
    crate::io::write_weekly_csv(&out, &weekly)?;

    info!(months = monthly.len(), weeks = weekly.len(), path = %out.display(), "weekly decomposition written");
    println!("Weekly forecast: {} ({} rows)", out.display(), weekly.len());
    Ok(())
}

fn handle_sample(settings: &Settings, args: SampleArgs) -> Result<(), AppError> {
    let start = crate::io::parse_date(&args.start)
        .map_err(|e| AppError::new(2, format!("Invalid --start: {e}")))?;
    let spec = crate::data::SampleSpec::new(start, args.months, args.seed, args.lobs);
    let records = crate::data::generate_history(&spec)?;

    let dir: PathBuf = args.out.unwrap_or_else(|| settings.data.input_dir.clone());
    let paths = crate::data::write_sample_csvs(&dir, &records)?;
    if paths.is_empty() {
        warn!(dir = %dir.display(), "no sample files written");
    }
    for path in &paths {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_dashboard(settings: &Settings, args: DashboardArgs) -> Result<(), AppError> {
    let dir = args.output.unwrap_or_else(|| settings.data.output_dir.clone());
    crate::tui::run(&dir)
}

/// Rewrite argv so `callvol` defaults to `callvol dashboard`.
///
/// Rules:
/// - `callvol`                         -> `callvol dashboard`
/// - `callvol --config x.toml`         -> `callvol dashboard --config x.toml`
/// - `callvol --help/--version/-h`     -> unchanged (show top-level help/version)
/// - any argv naming a subcommand      -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // Global flags may precede the subcommand (`callvol --log-level debug forecast`).
    if argv[1..].iter().any(|a| SUBCOMMANDS.contains(&a.as_str())) {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dotenv_supplies_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "CALLVOL_CONFIG=from_dotenv.toml\n").unwrap();

        let cli = parse_cli(args(&["callvol", "forecast"]), Some(&env_file));
        assert_eq!(cli.config, Some(PathBuf::from("from_dotenv.toml")));
        assert!(matches!(cli.command, Command::Forecast(_)));
    }

    #[test]
    fn bare_invocation_opens_dashboard() {
        assert_eq!(rewrite_args(args(&["callvol"])), args(&["callvol", "dashboard"]));
    }

    #[test]
    fn leading_flags_go_to_dashboard() {
        assert_eq!(
            rewrite_args(args(&["callvol", "--config", "c.toml"])),
            args(&["callvol", "dashboard", "--config", "c.toml"])
        );
    }

    #[test]
    fn explicit_subcommands_are_untouched() {
        let a = args(&["callvol", "--log-level", "debug", "forecast", "-p", "6"]);
        assert_eq!(rewrite_args(a.clone()), a);
        let b = args(&["callvol", "sample"]);
        assert_eq!(rewrite_args(b.clone()), b);
        let c = args(&["callvol", "--help"]);
        assert_eq!(rewrite_args(c.clone()), c);
    }
}
