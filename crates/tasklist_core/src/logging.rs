//! Process-wide logging bootstrap.
//!
//! The core only talks to the `log` facade; binaries call [`init_logging`]
//! once to route records to stderr through `flexi_logger`.
//!
//! # Invariants
//! - Initialization is idempotent for the same level.
//! - Re-initialization with a different level is rejected.
//! - Initialization never panics.

use crate::error::AppError;
use flexi_logger::{Logger, LoggerHandle};
use log::debug;
use once_cell::sync::OnceCell;

pub const DEFAULT_LOG_LEVEL: &str = "warn";
const LOG_ENV_VAR: &str = "TASKLIST_LOG";

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    _logger: LoggerHandle,
}

/// Picks the level: `TASKLIST_LOG`, then the configured value, then
/// [`DEFAULT_LOG_LEVEL`].
pub fn resolve_log_level(configured: Option<&str>) -> String {
    if let Ok(level) = std::env::var(LOG_ENV_VAR)
        && !level.trim().is_empty()
    {
        return level;
    }

    configured
        .filter(|level| !level.trim().is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string()
}

pub fn init_logging(level: &str) -> Result<(), AppError> {
    let normalized = normalize_level(level)?;

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, AppError> {
        let logger = Logger::try_with_str(normalized)
            .map_err(|err| AppError::validation(format!("invalid log level `{normalized}`: {err}")))?
            .log_to_stderr()
            .format(flexi_logger::default_format)
            .start()
            .map_err(|err| AppError::io(format!("failed to start logger: {err}")))?;

        debug!(
            "logging started level={} version={}",
            normalized,
            env!("CARGO_PKG_VERSION")
        );

        Ok(LoggingState {
            level: normalized,
            _logger: logger,
        })
    })?;

    if state.level != normalized {
        return Err(AppError::validation(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, normalized
        )));
    }

    Ok(())
}

pub fn logging_level() -> Option<&'static str> {
    LOGGING_STATE.get().map(|state| state.level)
}

fn normalize_level(level: &str) -> Result<&'static str, AppError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(AppError::validation(format!(
            "unsupported log level `{other}`; expected off|trace|debug|info|warn|error"
        ))),
    }
}
