// ============================================================
// Layer 6 — Named File Loggers
// ============================================================
// A registry of per-name file loggers.
//
// Each FileLogger owns its own tracing Dispatch writing to one
// .log file. Code that wants its events in that file runs inside
// `logger.in_scope(|| ...)`; ordinary `tracing::info!` calls made
// there go to the file instead of the console subscriber.
//
// The registry hands out one logger per name. Asking for the same
// name twice returns the SAME Arc, so a file never gets a second
// writer and no line is ever written twice.
//
// The registry is created once in main() and passed down to the
// use cases that need it; nothing here is global.
//
// Line format (chrono local time):
//   2026-10-19 14:03:11  INFO bert_encoder::application::encode_use_case: 88: Encoded 3 inputs
//
// Reference: tracing docs (Dispatch, dispatcher::with_default)
//            tracing-subscriber docs (fmt, ChronoLocal)

use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Timestamp format shared by log lines and stored configs
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A logger writing to a single file.
pub struct FileLogger {
    path:     PathBuf,
    dispatch: Dispatch,
}

impl FileLogger {
    fn open(path: &Path, level: Level) -> Result<Self> {
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Cannot open log file '{}'", path.display()))?;

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
            .with_target(true)
            .with_line_number(true)
            .with_max_level(level)
            .finish();

        Ok(Self {
            path:     path.to_path_buf(),
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// Run `f` with this logger as the active subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One FileLogger per name, shared through Arc.
#[derive(Default)]
pub struct LoggerRegistry {
    loggers: Mutex<HashMap<String, Arc<FileLogger>>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the logger called `name`, creating it on first use.
    ///
    /// `file_path` must end in `.log`; its parent directory is created
    /// when missing. Later calls with the same name return the existing
    /// logger and ignore `file_path` and `level`.
    pub fn get_logger(
        &self,
        name:      &str,
        file_path: impl AsRef<Path>,
        level:     Level,
    ) -> Result<Arc<FileLogger>> {
        let path = file_path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("log") {
            bail!("{} is not a valid log file path", path.display());
        }

        let mut loggers = self
            .loggers
            .lock()
            .map_err(|_| anyhow!("Logger registry lock poisoned"))?;

        if let Some(logger) = loggers.get(name) {
            return Ok(Arc::clone(logger));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create log directory '{}'", parent.display()))?;
        }

        let logger = Arc::new(FileLogger::open(path, level)?);
        loggers.insert(name.to_string(), Arc::clone(&logger));
        tracing::debug!("Registered logger '{}' at '{}'", name, path.display());
        Ok(logger)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_log_paths() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LoggerRegistry::new();
        assert!(registry.get_logger("a", dir.path().join("run.txt"), Level::INFO).is_err());
        assert!(registry.get_logger("a", dir.path().join("run"), Level::INFO).is_err());
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("run.log");
        let registry = LoggerRegistry::new();

        let logger = registry.get_logger("nested", &path, Level::INFO).unwrap();
        logger.in_scope(|| tracing::info!("hello"));

        assert!(path.exists());
        assert_eq!(logger.path(), path.as_path());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("hello"));
        assert!(text.contains("INFO"));
        // target and line of the call site, not of the logger itself
        assert!(text.contains("bert_encoder::infra::logger::tests"));
        assert!(!text.contains("bert_encoder::infra::logger: "));
    }

    #[test]
    fn test_same_name_reuses_logger_without_duplicate_lines() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("dedup.log");
        let registry = LoggerRegistry::new();

        let first  = registry.get_logger("dedup", &path, Level::INFO).unwrap();
        let second = registry.get_logger("dedup", &path, Level::INFO).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        first.in_scope(|| tracing::info!("one"));
        second.in_scope(|| tracing::info!("two"));

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text.matches("one").count(), 1);
    }

    #[test]
    fn test_level_filters_events() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("warn.log");
        let registry = LoggerRegistry::new();

        let logger = registry.get_logger("warn-only", &path, Level::WARN).unwrap();
        logger.in_scope(|| {
            tracing::info!("quiet");
            tracing::warn!("loud");
        });

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("quiet"));
        assert!(text.contains("loud"));
    }
}
