use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};

use crate::paths::AppPaths;

/// Default size at which the update log is cut in half on startup.
pub const DEFAULT_MAX_LOG_SIZE: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Start with debug output enabled.
    pub debug_enabled: bool,
    pub max_log_size: u64,
    /// Extra module prefixes to record besides the `upcheck` crates.
    pub extra_targets: Vec<String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            debug_enabled: false,
            max_log_size: DEFAULT_MAX_LOG_SIZE,
            extra_targets: Vec::new(),
        }
    }
}

/// Appends to the log file, recreating it if it disappears underneath us.
struct ReopeningLogWriter {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl ReopeningLogWriter {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = append_to(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    fn with_file<T>(&self, action: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() || !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            *guard = Some(append_to(&self.path)?);
        }

        match guard.as_mut() {
            Some(file) => action(file),
            None => Err(io::Error::other("log file not available")),
        }
    }
}

impl Write for ReopeningLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_mut().map_or(Ok(()), Write::flush)
    }
}

fn append_to(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Once the log outgrows `max_log_size`, keep only its newest lines, at most
/// half of that size. Returns whether the file was rewritten.
fn shrink_log(log_path: &Path, max_log_size: u64) -> io::Result<bool> {
    let len = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    if len <= max_log_size {
        return Ok(false);
    }

    let contents = std::fs::read(log_path)?;
    let budget = usize::try_from(max_log_size / 2).unwrap_or(usize::MAX);
    let cut = contents.len().saturating_sub(budget);
    let start = if cut == 0 || contents[cut - 1] == b'\n' {
        cut
    } else {
        contents[cut..]
            .iter()
            .position(|&byte| byte == b'\n')
            .map_or(contents.len(), |newline| cut + newline + 1)
    };
    std::fs::write(log_path, &contents[start..])?;
    Ok(true)
}

/// Install the global logger for update checks.
///
/// Records go to `paths.log_file()`, and in debug builds to the terminal as
/// well. Installing twice is harmless: the second logger is ignored. Returns
/// the log file path, or `None` when no file logger could be opened.
pub fn init_logging(paths: &AppPaths, options: &LoggingOptions) -> Option<PathBuf> {
    let _ = paths.ensure_dirs();
    let log_path = paths.log_file();
    let shrunk = shrink_log(&log_path, options.max_log_size);

    let mut builder = ConfigBuilder::new();
    builder.set_time_format_rfc3339().add_filter_allow_str("upcheck");
    for target in &options.extra_targets {
        builder.add_filter_allow(target.clone());
    }
    let config = builder.build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        LevelFilter::Debug,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));

    let file_logger = ReopeningLogWriter::open(log_path.clone())
        .map(|writer| WriteLogger::new(LevelFilter::Debug, config, writer))
        .ok();
    let opened = file_logger.is_some();
    if let Some(file_logger) = file_logger {
        loggers.push(file_logger);
    }

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
    set_debug_logging(options.debug_enabled);

    match shrunk {
        Ok(true) => log::debug!("Trimmed oversized log file {}", log_path.display()),
        Ok(false) => {}
        Err(error) => log::warn!("Failed to shrink log file {}: {error}", log_path.display()),
    }
    if options.debug_enabled {
        log::info!("Update logging initialized, log file: {}", log_path.display());
    }
    opened.then_some(log_path)
}

/// Toggle debug output at runtime.
pub fn set_debug_logging(enabled: bool) {
    log::set_max_level(if enabled {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::{ReopeningLogWriter, set_debug_logging, shrink_log};

    #[test]
    fn writer_recreates_deleted_log() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("upcheck.log");
        let mut writer =
            ReopeningLogWriter::open(log_path.clone()).expect("writer should open log file");

        writer
            .write_all(b"before\n")
            .expect("initial write should succeed");
        std::fs::remove_file(&log_path).expect("log file should be removable");
        writer
            .write_all(b"after\n")
            .expect("writer should recreate the file");

        let contents = std::fs::read_to_string(&log_path).expect("log should be readable");
        assert_eq!(contents, "after\n");
    }

    #[test]
    fn shrink_keeps_newest_lines() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("upcheck.log");
        std::fs::write(&log_path, "check-1\ncheck-2\ncheck-3\ncheck-4\ncheck-5\n")
            .expect("test log should be written");

        assert!(shrink_log(&log_path, 20).expect("log should shrink"));

        let shrunk = std::fs::read_to_string(&log_path).expect("log should be readable");
        assert_eq!(shrunk, "check-5\n");
    }

    #[test]
    fn shrink_reports_unreadable_log() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        std::fs::write(temp_dir.path().join("upcheck.log"), "check-1\n")
            .expect("test log should be written");

        assert!(shrink_log(temp_dir.path(), 0).is_err());
    }

    #[test]
    fn missing_log_needs_no_shrinking() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");

        let shrunk = shrink_log(&temp_dir.path().join("upcheck.log"), 0);

        assert!(!shrunk.expect("missing log is not an error"));
    }

    #[test]
    fn small_log_is_left_alone() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("upcheck.log");
        std::fs::write(&log_path, "check-1\n").expect("test log should be written");

        assert!(!shrink_log(&log_path, 1024).expect("log should be readable"));

        assert_eq!(
            std::fs::read_to_string(&log_path).expect("log should be readable"),
            "check-1\n"
        );
    }

    #[test]
    fn debug_toggle_sets_global_level() {
        set_debug_logging(true);
        assert_eq!(log::max_level(), log::LevelFilter::Debug);

        set_debug_logging(false);
        assert_eq!(log::max_level(), log::LevelFilter::Warn);
    }
}
