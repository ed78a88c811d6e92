//! TOML configuration file support.
//!
//! Every section and key has a default, so an empty (or absent) file yields a
//! runnable configuration. CLI flags are layered on top by [`Settings::resolve`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::ForecastConfig;
use crate::error::AppError;

/// Config file looked up when neither `--config` nor `CALLVOL_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub forecast: ForecastSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Input/output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Forecast horizon and conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSettings {
    #[serde(default = "default_periods")]
    pub periods: usize,
    #[serde(default = "default_contact_rate")]
    pub contact_rate: f64,
    #[serde(default)]
    pub contact_rates: BTreeMap<String, f64>,
    #[serde(default = "default_true")]
    pub fallback_on_insufficient: bool,
    #[serde(default)]
    pub lobs: Vec<String>,
}

/// Log level and destinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    /// Log file path; an empty string disables file logging.
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub rotate: bool,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data/data_inputs")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/data_outputs")
}

fn default_periods() -> usize {
    12
}

fn default_contact_rate() -> f64 {
    0.45
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("logs/callvol.log"))
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            periods: default_periods(),
            contact_rate: default_contact_rate(),
            contact_rates: BTreeMap::new(),
            fallback_on_insufficient: true,
            lobs: Vec::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_log_file(),
            rotate: false,
        }
    }
}

impl LoggingSettings {
    /// The configured log file, unless disabled with an empty path.
    pub fn file_path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// CLI values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub periods: Option<usize>,
    pub contact_rate: Option<f64>,
    pub lobs: Vec<String>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to read config file '{}': {e}", path.display()),
            )
        })?;
        Self::from_toml(&content)
            .map_err(|e| AppError::new(2, format!("{} ({})", e.message(), path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        toml::from_str(content)
            .map_err(|e| AppError::new(2, format!("Failed to parse config file: {e}")))
    }

    /// Load from an explicit path, or from `config.toml` when it exists.
    ///
    /// An explicitly requested file must exist. Returns the path actually read.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), AppError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::new(
                        2,
                        format!("Config file '{}' does not exist.", path.display()),
                    ));
                }
                Ok((Self::from_file(path)?, Some(path.to_path_buf())))
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Ok((Self::from_file(&path)?, Some(path)))
                } else {
                    Ok((Self::default(), None))
                }
            }
        }
    }

    /// Apply the log-level override in place (logging is set up before the run config).
    pub fn apply_log_level(&mut self, overrides: &Overrides) {
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Merge CLI overrides and validate into a pipeline configuration.
    pub fn resolve(&self, overrides: &Overrides) -> Result<ForecastConfig, AppError> {
        let lobs = if overrides.lobs.is_empty() {
            self.forecast.lobs.clone()
        } else {
            overrides.lobs.clone()
        };

        let config = ForecastConfig {
            input_dir: overrides
                .input_dir
                .clone()
                .unwrap_or_else(|| self.data.input_dir.clone()),
            output_dir: overrides
                .output_dir
                .clone()
                .unwrap_or_else(|| self.data.output_dir.clone()),
            periods: overrides.periods.unwrap_or(self.forecast.periods),
            contact_rate: overrides.contact_rate.unwrap_or(self.forecast.contact_rate),
            contact_rates: self.forecast.contact_rates.clone(),
            fallback_on_insufficient: self.forecast.fallback_on_insufficient,
            lobs,
            plot: false,
            plot_width: 80,
            plot_height: 20,
        };
        validate(&config)?;
        info!(
            input = %config.input_dir.display(),
            output = %config.output_dir.display(),
            periods = config.periods,
            contact_rate = config.contact_rate,
            "configuration resolved"
        );
        Ok(config)
    }
}

fn validate(config: &ForecastConfig) -> Result<(), AppError> {
    if config.periods == 0 {
        return Err(AppError::new(2, "periods must be at least 1."));
    }
    check_rate("contact_rate", config.contact_rate)?;
    for (lob, rate) in &config.contact_rates {
        check_rate(&format!("contact_rates.{lob}"), *rate)?;
    }
    Ok(())
}

fn check_rate(name: &str, rate: f64) -> Result<(), AppError> {
    if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(AppError::new(
            2,
            format!("{name} must be in (0, 1], got {rate}."),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.data.input_dir, PathBuf::from("data/data_inputs"));
        assert_eq!(settings.forecast.periods, 12);
        assert_eq!(settings.forecast.contact_rate, 0.45);
        assert!(settings.forecast.fallback_on_insufficient);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(
            settings.logging.file_path(),
            Some(Path::new("logs/callvol.log"))
        );
    }

    #[test]
    fn parses_all_sections() {
        let settings = Settings::from_toml(
            r#"
            [data]
            input_dir = "in"
            output_dir = "out"

            [forecast]
            periods = 6
            contact_rate = 0.3
            fallback_on_insufficient = false
            lobs = ["Medicare"]

            [forecast.contact_rates]
            Medicare = 0.52

            [logging]
            level = "debug"
            file = ""
            rotate = true
            "#,
        )
        .unwrap();

        let config = settings.resolve(&Overrides::default()).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("in"));
        assert_eq!(config.periods, 6);
        assert!(!config.fallback_on_insufficient);
        assert_eq!(config.contact_rate_for("Medicare"), 0.52);
        assert_eq!(config.lobs, vec!["Medicare".to_string()]);
        assert!(settings.logging.rotate);
        assert_eq!(settings.logging.file_path(), None);
    }

    #[test]
    fn cli_overrides_win() {
        let mut settings = Settings::default();
        let overrides = Overrides {
            input_dir: Some(PathBuf::from("cli_in")),
            periods: Some(3),
            contact_rate: Some(0.5),
            lobs: vec!["Commercial".to_string()],
            log_level: Some("warn".to_string()),
            ..Overrides::default()
        };
        settings.apply_log_level(&overrides);
        let config = settings.resolve(&overrides).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("cli_in"));
        assert_eq!(config.output_dir, PathBuf::from("data/data_outputs"));
        assert_eq!(config.periods, 3);
        assert_eq!(config.contact_rate, 0.5);
        assert_eq!(config.lobs, vec!["Commercial".to_string()]);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let settings = Settings::default();
        for rate in [0.0, -0.1, 1.5, f64::NAN] {
            let overrides = Overrides {
                contact_rate: Some(rate),
                ..Overrides::default()
            };
            assert_eq!(settings.resolve(&overrides).unwrap_err().exit_code(), 2);
        }
        let overrides = Overrides {
            periods: Some(0),
            ..Overrides::default()
        };
        assert_eq!(settings.resolve(&overrides).unwrap_err().exit_code(), 2);

        let mut bad_lob = Settings::default();
        bad_lob.forecast.contact_rates.insert("X".to_string(), 2.0);
        assert_eq!(
            bad_lob.resolve(&Overrides::default()).unwrap_err().exit_code(),
            2
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callvol.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "[forecast]\nperiods = 18").unwrap();
        drop(f);

        let (settings, used) = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.forecast.periods, 18);
        assert_eq!(used.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = Settings::from_toml("[forecast\nperiods = ").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
