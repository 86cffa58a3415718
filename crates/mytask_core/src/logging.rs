//! Process-wide log setup.
//!
//! # Responsibility
//! - Route `log` records to rolling files or to stderr, once per process.
//! - Keep panic reports free of phone numbers and multi-line user text.
//!
//! # Invariants
//! - A second `init_logging` with equal settings is accepted; different
//!   settings are refused with `LoggingError::AlreadyActive`.
//! - Setup never panics.

use crate::config::LoggingConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "mytask";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<(LogSettings, LoggerHandle)> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();
static LONG_DIGIT_RUN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\+?\d{7,}").ok());

/// Where records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Rotating files in this directory.
    Directory(PathBuf),
    Stderr,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    Start(flexi_logger::FlexiLoggerError),
    AlreadyActive {
        active: LogSettings,
        requested: LogSettings,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}` (expected trace, debug, info, warn or error)"
            ),
            Self::Directory { path, source } => {
                write!(f, "cannot use log directory {}: {source}", path.display())
            }
            Self::Start(err) => write!(f, "logger did not start: {err}"),
            Self::AlreadyActive { active, requested } => write!(
                f,
                "logging is already active as {active}; refusing {requested}"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Directory { source, .. } => Some(source),
            Self::Start(err) => Some(err),
            _ => None,
        }
    }
}

/// Level plus destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub target: LogTarget,
}

impl Display for LogSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.level.as_str().to_ascii_lowercase(), self.target)
    }
}

impl LogSettings {
    pub fn new(level: &str, target: LogTarget) -> Result<Self, LoggingError> {
        Ok(Self {
            level: parse_level(level)?,
            target,
        })
    }

    /// Settings from the `[logging]` table; `level_override` wins over the
    /// configured level. Relative directories resolve against the working
    /// directory.
    pub fn from_config(
        config: &LoggingConfig,
        level_override: Option<&str>,
    ) -> Result<Self, LoggingError> {
        let level = level_override
            .or(config.level.as_deref())
            .unwrap_or(default_log_level());
        let target = match &config.dir {
            Some(dir) if dir.is_absolute() => LogTarget::Directory(dir.clone()),
            Some(dir) => {
                let cwd = std::env::current_dir().map_err(|source| LoggingError::Directory {
                    path: dir.clone(),
                    source,
                })?;
                LogTarget::Directory(cwd.join(dir))
            }
            None => LogTarget::Stderr,
        };
        Self::new(level, target)
    }
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Starts the logger, or confirms it already runs with `settings`.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let (active, _) = ACTIVE.get_or_try_init(|| {
        let handle = start(settings)?;
        Ok::<_, LoggingError>((settings.clone(), handle))
    })?;
    if active != settings {
        return Err(LoggingError::AlreadyActive {
            active: active.clone(),
            requested: settings.clone(),
        });
    }
    Ok(())
}

/// Settings of the running logger, if any.
pub fn active_logging() -> Option<LogSettings> {
    ACTIVE.get().map(|(settings, _)| settings.clone())
}

fn start(settings: &LogSettings) -> Result<LoggerHandle, LoggingError> {
    let logger = Logger::with(LogSpecification::builder().default(settings.level).build());
    let logger = match &settings.target {
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir)
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        LogTarget::Stderr => logger.log_to_stderr().format(flexi_logger::default_format),
    };
    let handle = logger.start().map_err(LoggingError::Start)?;

    install_panic_hook();
    info!(
        "event=logging_init module=logging status=ok settings=\"{}\" version={}",
        settings,
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        _ => Err(LoggingError::UnknownLevel(level.to_string())),
    }
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string payload".to_string());
        error!(
            "event=panic module=logging status=error location={} payload=\"{}\"",
            location,
            scrub(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(info);
    }));
}

/// One-line, length-capped text with long digit runs (phone numbers) masked.
pub(crate) fn scrub(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    let masked = match LONG_DIGIT_RUN.as_ref() {
        Some(re) => re.replace_all(&flat, "[number]").into_owned(),
        None => flat,
    };
    if masked.chars().count() <= max_chars {
        return masked;
    }
    let mut cut: String = masked.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::{active_logging, init_logging, parse_level, scrub, LogSettings, LogTarget, LoggingError};
    use crate::config::LoggingConfig;
    use log::LevelFilter;
    use std::path::PathBuf;

    #[test]
    fn levels_are_case_insensitive() {
        assert_eq!(parse_level(" WARNING ").unwrap(), LevelFilter::Warn);
        assert!(matches!(parse_level("loud"), Err(LoggingError::UnknownLevel(_))));
    }

    #[test]
    fn scrub_masks_numbers_and_truncates() {
        let text = scrub("sms to +15551234567 failed\nretry", 200);
        assert_eq!(text, "sms to [number] failed retry");
        assert!(scrub(&"x".repeat(50), 10).ends_with("..."));
    }

    #[test]
    fn config_without_dir_logs_to_stderr_and_override_wins() {
        let config = LoggingConfig {
            level: Some("warn".to_string()),
            dir: None,
        };
        let settings = LogSettings::from_config(&config, Some("trace")).unwrap();
        assert_eq!(settings.level, LevelFilter::Trace);
        assert_eq!(settings.target, LogTarget::Stderr);
    }

    #[test]
    fn relative_dir_is_resolved_against_the_working_directory() {
        let config = LoggingConfig {
            level: None,
            dir: Some(PathBuf::from("logs")),
        };
        match LogSettings::from_config(&config, None).unwrap().target {
            LogTarget::Directory(dir) => {
                assert!(dir.is_absolute());
                assert!(dir.ends_with("logs"));
            }
            LogTarget::Stderr => panic!("expected a directory target"),
        }
    }

    #[test]
    fn second_init_must_match_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings::new("info", LogTarget::Directory(dir.path().join("logs"))).unwrap();

        init_logging(&settings).unwrap();
        init_logging(&settings).unwrap();

        let louder = LogSettings {
            level: LevelFilter::Debug,
            ..settings.clone()
        };
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::AlreadyActive { .. })
        ));
        assert_eq!(active_logging(), Some(settings));
    }
}
