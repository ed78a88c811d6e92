//! Logging setup.
//!
//! Installs a global `tracing` subscriber with an optional console layer and an
//! optional plain-text file layer. `RUST_LOG` takes precedence over the
//! configured level. With rotation enabled the file is rotated at start-up and
//! again whenever a write would take it past `ROTATE_MAX_BYTES`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingSettings;
use crate::error::AppError;

/// Rotate the log file once it reaches this size.
pub const ROTATE_MAX_BYTES: u64 = 2_000_000;

/// Number of rotated files kept (`.1` .. `.5`).
pub const ROTATE_BACKUPS: usize = 5;

/// Install the global subscriber.
///
/// `console` is false for the dashboard, which owns the terminal.
pub fn init(settings: &LoggingSettings, console: bool) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(parse_level(&settings.level).into()));

    let console_layer = console.then(|| fmt::layer().with_target(false));

    let file_layer = match settings.file_path() {
        Some(path) => {
            let file = open_log_file(path, settings.rotate)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::new(4, format!("Failed to initialise logging: {e}")))
}

/// Parse a level name case-insensitively; unknown names fall back to `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    level
        .trim()
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO)
}

fn open_log_file(path: &Path, rotate: bool) -> Result<RotatingFile, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create log directory '{}': {e}", parent.display()),
            )
        })?;
    }
    let limit = rotate.then_some((ROTATE_MAX_BYTES, ROTATE_BACKUPS));
    RotatingFile::open(path, limit)
        .map_err(|e| AppError::new(2, format!("Failed to open log file '{}': {e}", path.display())))
}

/// Append-only log file that rotates itself once it reaches a size limit.
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    size: u64,
    /// `(max_bytes, backups)`; `None` disables rotation.
    limit: Option<(u64, usize)>,
}

impl RotatingFile {
    pub fn open(path: &Path, limit: Option<(u64, usize)>) -> io::Result<Self> {
        if let Some((max_bytes, backups)) = limit {
            rotate_if_needed(path, max_bytes, backups).map_err(|e| io::Error::other(e.message().to_string()))?;
        }
        let file = append_to(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
            limit,
        })
    }

    fn rotate_before(&mut self, incoming: usize) -> io::Result<()> {
        let Some((max_bytes, backups)) = self.limit else {
            return Ok(());
        };
        if self.size == 0 || self.size + incoming as u64 <= max_bytes {
            return Ok(());
        }
        self.file.flush()?;
        // The threshold passed never exceeds the current size, so the file is renamed.
        if rotate_if_needed(&self.path, self.size.min(max_bytes), backups)
            .map_err(|e| io::Error::other(e.message().to_string()))?
        {
            self.file = append_to(&self.path)?;
            self.size = 0;
        }
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_before(buf.len())?;
        let n = self.file.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn append_to(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Shift `file`, `file.1`, ... up by one when `file` has reached `max_bytes`.
///
/// The oldest backup beyond `backups` is removed.
pub fn rotate_if_needed(path: &Path, max_bytes: u64, backups: usize) -> Result<bool, AppError> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(false),
    };
    if size < max_bytes || backups == 0 {
        return Ok(false);
    }

    let rotate_err = |e: std::io::Error| {
        AppError::new(4, format!("Failed to rotate log file '{}': {e}", path.display()))
    };

    let oldest = backup_path(path, backups);
    if oldest.exists() {
        fs::remove_file(&oldest).map_err(rotate_err)?;
    }
    for i in (1..backups).rev() {
        let from = backup_path(path, i);
        if from.exists() {
            fs::rename(&from, backup_path(path, i + 1)).map_err(rotate_err)?;
        }
    }
    fs::rename(path, backup_path(path, 1)).map_err(rotate_err)?;
    Ok(true)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
