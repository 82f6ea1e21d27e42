use crate::error::AppError;
use crate::naming::canonical_key;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "tasklist";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKLIST_CONFIG_PATH";

const RESET: &str = "\x1b[0m";

/// How a row of the task table is coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Plain,
    Overdue,
    Completed,
}

/// ANSI colours per [`RowStyle`]. The default theme is uncoloured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    overdue: &'static str,
    completed: &'static str,
}

impl Palette {
    pub const PLAIN: Palette = Palette {
        overdue: "",
        completed: "",
    };

    pub fn paint(&self, style: RowStyle, text: &str) -> String {
        let colour = match style {
            RowStyle::Plain => "",
            RowStyle::Overdue => self.overdue,
            RowStyle::Completed => self.completed,
        };
        if colour.is_empty() {
            text.to_string()
        } else {
            format!("{colour}{text}{RESET}")
        }
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    match theme.map(canonical_theme_name).as_deref() {
        Some("noir") => Palette {
            overdue: "\x1b[38;5;208m",
            completed: "\x1b[38;5;244m",
        },
        Some("solarized") => Palette {
            overdue: "\x1b[38;5;160m",
            completed: "\x1b[38;5;245m",
        },
        _ => Palette::PLAIN,
    }
}

/// Canonical theme key with aliases such as `Dark Mode` resolved. Blank
/// names resolve to `default`.
pub fn canonical_theme_name(raw: &str) -> String {
    match canonical_key(raw).as_deref() {
        None | Some("vanilla" | "light") => "default".to_string(),
        Some("dark" | "dark_mode" | "darkmode") => "noir".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Settings read from `config.json`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub store_path: Option<String>,
    #[serde(default = "notifications_default")]
    pub notifications: bool,
    #[serde(default)]
    pub log_level: Option<String>,
}

fn notifications_default() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: None,
            store_path: None,
            notifications: notifications_default(),
            log_level: None,
        }
    }
}

/// Outcome of reading the config file. On failure `config` holds the
/// defaults and `error` says why.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

impl ConfigLoad {
    fn defaults(error: Option<AppError>) -> Self {
        Self {
            config: Config::default(),
            error,
        }
    }
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub store_path: Option<String>,
    pub notifications: Option<bool>,
    pub log_level: Option<String>,
}

/// Per-user directory holding the config and the default task file.
pub fn app_dir() -> Result<PathBuf, AppError> {
    let (var, base) = if cfg!(windows) {
        ("APPDATA", None)
    } else {
        ("HOME", Some(".config"))
    };
    let root = std::env::var(var).map_err(|_| AppError::io(format!("{var} is not set")))?;

    let mut dir = PathBuf::from(root);
    if let Some(base) = base {
        dir.push(base);
    }
    dir.push(APP_DIR_NAME);
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf, AppError> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(app_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// Reads the config; a missing file is silently the defaults, an unreadable
/// one is the defaults plus the error.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad::defaults(Some(err)),
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad::defaults(None);
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => {
            warn!("ignoring config {}: {err}", path.display());
            ConfigLoad::defaults(Some(err))
        }
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let mut config = serde_json::from_str::<Config>(&raw)
        .map_err(|err| AppError::parse(format!("invalid JSON in {}: {}", path.display(), err)))?;
    config.theme = config.theme.as_deref().map(canonical_theme_name);
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    Config {
        theme: overrides
            .theme
            .as_deref()
            .map(canonical_theme_name)
            .or_else(|| base.theme.clone()),
        store_path: overrides
            .store_path
            .clone()
            .or_else(|| base.store_path.clone()),
        notifications: overrides.notifications.unwrap_or(base.notifications),
        log_level: overrides
            .log_level
            .clone()
            .or_else(|| base.log_level.clone()),
    }
}
