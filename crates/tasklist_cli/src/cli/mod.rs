use clap::{Args, Parser, Subcommand};
use tasklist_core::config::ConfigOverrides;
use tasklist_core::error::AppError;
use tasklist_core::model::{NOTIFY_LEAD_MINUTES, Priority, TaskDraft};
use tasklist_core::naming::canonical_key;
use time::macros::format_description;
use time::{Date, Time};

#[derive(Parser, Debug)]
#[command(name = "tasklist", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: tasklist add "Pay rent" -p high --due 2025-07-01 --at 18:00 --notify 60
    Add {
        title: String,
        #[command(flatten)]
        form: TaskForm,
    },
    /// Edit a task; omitted fields keep their current value
    ///
    /// Example: tasklist edit 2 --title "Pay rent and bills" --due 2025-07-02
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        form: TaskForm,
        /// Remove the deadline
        #[arg(long, conflicts_with_all = ["due", "at"])]
        no_due: bool,
        /// Turn the deadline reminder off
        #[arg(long, conflicts_with = "notify")]
        no_notify: bool,
    },
    /// Delete a task
    ///
    /// Example: tasklist delete 2 --yes
    Delete {
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Mark a task completed, or pending again
    ///
    /// Example: tasklist toggle 2
    Toggle { id: u64 },
    /// Show details of a task
    ///
    /// Example: tasklist show 2
    Show { id: u64 },
    /// List tasks, highest priority and nearest deadline first
    ///
    /// Example: tasklist list --filter overdue
    List {
        /// all, high, medium, low, overdue or completed
        #[arg(short = 'f', long, default_value = "all")]
        filter: String,
    },
    /// Check deadlines every minute and show reminders
    ///
    /// Example: tasklist watch
    Watch {
        /// Run a single check and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct TaskForm {
    /// Task description
    #[arg(short = 'd', long)]
    pub description: Option<String>,
    /// High, Medium or Low
    #[arg(short = 'p', long)]
    pub priority: Option<String>,
    /// Deadline date
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub due: Option<String>,
    /// Deadline time (defaults to 23:59; today when no date is set)
    #[arg(long, value_name = "HH:MM")]
    pub at: Option<String>,
    /// Remind this many minutes before the deadline (5, 15, 30, 60, 120, 240, 1440, 2880, 10080)
    #[arg(long, value_name = "MINUTES")]
    pub notify: Option<u32>,
}

/// Copies the given form fields onto `draft`. Field-level parse errors are
/// reported here; cross-field rules are checked by [`TaskDraft::validate`].
pub fn apply_form(draft: &mut TaskDraft, form: &TaskForm, today: Date) -> Result<(), AppError> {
    if let Some(description) = form.description.as_ref() {
        draft.description = description.clone();
    }

    if let Some(priority) = form.priority.as_deref() {
        draft.priority = Priority::parse(priority).ok_or_else(|| {
            AppError::validation(format!(
                "unknown priority '{}'; expected High, Medium or Low",
                priority.trim()
            ))
        })?;
    }

    if let Some(due) = form.due.as_deref() {
        draft.deadline_date = Some(parse_date(due)?);
    }

    if let Some(at) = form.at.as_deref() {
        draft.deadline_time = Some(parse_time(at)?);
        if draft.deadline_date.is_none() {
            draft.deadline_date = Some(today);
        }
    }

    if let Some(minutes) = form.notify {
        if !NOTIFY_LEAD_MINUTES.contains(&minutes) {
            return Err(AppError::validation(format!(
                "--notify must be one of {NOTIFY_LEAD_MINUTES:?}"
            )));
        }
        draft.notify_enabled = true;
        draft.notify_before_minutes = minutes;
    }

    Ok(())
}

fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation(format!("date must be YYYY-MM-DD, got '{}'", raw.trim())))
}

fn parse_time(raw: &str) -> Result<Time, AppError> {
    let trimmed = raw.trim();
    Time::parse(trimmed, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| {
            Time::parse(
                &format!("{trimmed}:00"),
                format_description!("[hour]:[minute]:[second]"),
            )
        })
        .map_err(|_| AppError::validation(format!("time must be HH:MM, got '{trimmed}'")))
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    StorePath,
    Notifications,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonical_key(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "store_path" | "store" => ConfigOverrideTarget::StorePath,
        "notifications" | "notify" => ConfigOverrideTarget::Notifications,
        "log_level" | "log" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` into one set of overrides.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry)
            .map_err(|message| AppError::validation(format!("{CONFIG_OVERRIDE_FLAG}: {message}")))?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::StorePath => overrides.store_path = Some(parsed.value),
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(parsed.value),
            ConfigOverrideTarget::Notifications => {
                let enabled = parse_bool(&parsed.value).ok_or_else(|| {
                    AppError::validation(format!(
                        "{CONFIG_OVERRIDE_FLAG}: notifications expects true or false, got '{}'",
                        parsed.value
                    ))
                })?;
                overrides.notifications = Some(enabled);
            }
        }
    }

    Ok(overrides)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}
