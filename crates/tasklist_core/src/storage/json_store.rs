use crate::config;
use crate::error::AppError;
use crate::model::{DEFAULT_NOTIFY_LEAD_MINUTES, Priority, Task};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

const STORE_FILE_NAME: &str = "tasks.json";
const STORE_ENV_VAR: &str = "TASKLIST_STORE_PATH";

/// One task as written to disk. Every field is optional on the way in so that
/// files written by older versions still load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTask {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    deadline_time: Option<String>,
    #[serde(default)]
    notify_enabled: Option<bool>,
    #[serde(default)]
    notify_before_minutes: Option<i64>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    notified: Option<bool>,
}

impl StoredTask {
    fn from_task(task: &Task) -> Result<Self, AppError> {
        Ok(Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            priority: Some(task.priority.label().to_string()),
            deadline: task.deadline_date.map(format_date).transpose()?,
            deadline_time: task.deadline_time.map(format_time).transpose()?,
            notify_enabled: Some(task.notify_enabled),
            notify_before_minutes: Some(i64::from(task.notify_before_minutes)),
            completed: Some(task.completed),
            created_at: Some(task.created_at().to_string()),
            notified: Some(task.notified),
        })
    }

    fn into_task(self, index: usize) -> Result<Task, AppError> {
        let priority = match self.priority.as_deref() {
            None => Priority::default(),
            Some(label) => Priority::parse(label).unwrap_or_else(|| {
                warn!("task #{index}: unknown priority {label:?}, using Medium");
                Priority::default()
            }),
        };

        let deadline_date = match self.deadline.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_deadline_date(raw).ok_or_else(|| {
                AppError::parse(format!("task #{index}: invalid deadline {raw:?}"))
            })?),
        };

        let deadline_time = match self.deadline_time.as_deref() {
            None | Some("") => None,
            Some(raw) => {
                let parsed = parse_deadline_time(raw);
                if parsed.is_none() {
                    warn!("task #{index}: dropping unreadable deadline_time {raw:?}");
                }
                parsed
            }
        };

        let notify_before_minutes = self
            .notify_before_minutes
            .and_then(|minutes| u32::try_from(minutes).ok())
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_NOTIFY_LEAD_MINUTES);

        let mut task = Task::new(self.title.unwrap_or_default());
        task.description = self.description.unwrap_or_default();
        task.priority = priority;
        task.deadline_date = deadline_date;
        task.deadline_time = deadline_time;
        task.notify_enabled = self.notify_enabled.unwrap_or(false);
        task.notify_before_minutes = notify_before_minutes;
        task.completed = self.completed.unwrap_or(false);
        task.notified = self.notified.unwrap_or(false);

        Ok(match self.created_at {
            Some(created_at) => task.with_created_at(created_at),
            None => task,
        })
    }
}

/// Reads and writes the task list as a JSON array at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<Task>, AppError> {
        if !self.path.exists() {
            debug!("no task file at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|err| AppError::io(format!("{}: {}", self.path.display(), err)))?;
        let records: Vec<StoredTask> = serde_json::from_str(&content).map_err(|err| {
            AppError::parse(format!("invalid JSON in {}: {}", self.path.display(), err))
        })?;

        let tasks = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_task(index))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("loaded {} task(s) from {}", tasks.len(), self.path.display());
        Ok(tasks)
    }

    /// Rewrites the whole file. The content is staged in a sibling temp file
    /// and renamed over the target so readers never see a partial write.
    pub fn save<'a, I>(&self, tasks: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;

        let records = tasks
            .into_iter()
            .map(StoredTask::from_task)
            .collect::<Result<Vec<_>, _>>()?;
        let content = serde_json::to_string_pretty(&records)
            .map_err(|err| AppError::io(format!("failed to encode tasks: {err}")))?;

        let mut staged =
            NamedTempFile::new_in(parent).map_err(|err| AppError::io(err.to_string()))?;
        staged
            .write_all(content.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|err| AppError::io(err.to_string()))?;
        staged
            .persist(&self.path)
            .map_err(|err| AppError::io(format!("{}: {}", self.path.display(), err.error)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, permissions)
                .map_err(|err| AppError::io(err.to_string()))?;
        }

        debug!("saved {} task(s) to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Resolves the task file: env override, then the configured path, then the
/// per-user default.
pub fn store_path(configured: Option<&str>) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = configured
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path.trim()));
    }

    Ok(config::app_dir()?.join(STORE_FILE_NAME))
}

fn format_date(date: Date) -> Result<String, AppError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| AppError::io(err.to_string()))
}

fn format_time(time: Time) -> Result<String, AppError> {
    time.format(format_description!("[hour]:[minute]:[second]"))
        .map_err(|err| AppError::io(err.to_string()))
}

type TimeStrategy = fn(&str) -> Option<Time>;
type TimestampStrategy = fn(&str) -> Option<PrimitiveDateTime>;

/// Tried in order; the first success wins. Older files stored the deadline
/// time as a full timestamp.
const DEADLINE_TIME_STRATEGIES: [TimeStrategy; 4] = [
    time_with_seconds,
    time_with_fraction,
    time_without_seconds,
    time_from_timestamp,
];

const TIMESTAMP_STRATEGIES: [TimestampStrategy; 4] = [
    rfc3339_timestamp,
    naive_timestamp,
    naive_timestamp_with_fraction,
    naive_timestamp_space_separated,
];

fn time_with_seconds(raw: &str) -> Option<Time> {
    Time::parse(raw, format_description!("[hour]:[minute]:[second]")).ok()
}

fn time_with_fraction(raw: &str) -> Option<Time> {
    Time::parse(
        raw,
        format_description!("[hour]:[minute]:[second].[subsecond]"),
    )
    .ok()
}

fn time_without_seconds(raw: &str) -> Option<Time> {
    time_with_seconds(&format!("{raw}:00"))
}

fn time_from_timestamp(raw: &str) -> Option<Time> {
    parse_timestamp(raw).map(PrimitiveDateTime::time)
}

fn rfc3339_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .map(|value| PrimitiveDateTime::new(value.date(), value.time()))
}

fn naive_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
}

fn naive_timestamp_with_fraction(raw: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .ok()
}

fn naive_timestamp_space_separated(raw: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .ok()
}

fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let trimmed = raw.trim();
    TIMESTAMP_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(trimmed))
}

/// Fractional seconds are dropped; the file only stores whole seconds.
fn parse_deadline_time(raw: &str) -> Option<Time> {
    let trimmed = raw.trim();
    DEADLINE_TIME_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(trimmed))
        .and_then(|time| Time::from_hms(time.hour(), time.minute(), time.second()).ok())
}

fn parse_deadline_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(PrimitiveDateTime::date))
}

#[cfg(test)]
mod tests {
    use super::{JsonStore, parse_deadline_time};
    use crate::model::{Priority, Task};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::{date, time};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tasklist-{nanos}-{file_name}"))
    }

    fn sample_tasks() -> Vec<Task> {
        let plain = Task::new("plain");

        let mut date_only = Task::new("date only");
        date_only.priority = Priority::High;
        date_only.deadline_date = Some(date!(2030 - 01 - 15));

        let mut reminder = Task::new("reminder");
        reminder.description = "call the bank".into();
        reminder.priority = Priority::Low;
        reminder.deadline_date = Some(date!(2030 - 02 - 01));
        reminder.deadline_time = Some(time!(09:30));
        reminder.notify_enabled = true;
        reminder.notify_before_minutes = 1440;
        reminder.notified = true;

        let mut done = Task::new("done");
        done.completed = true;

        vec![plain, date_only, reminder, done]
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = JsonStore::new(temp_path("tasks.json"));
        let tasks = sample_tasks();

        store.save(&tasks).unwrap();
        let loaded = store.load().unwrap();
        fs::remove_file(store.path()).ok();

        assert_eq!(loaded, tasks);
        assert_eq!(loaded[1].deadline_time, None);
        assert_eq!(
            loaded[1].deadline_datetime(),
            Some(date!(2030 - 01 - 15).with_time(time!(23:59)))
        );
    }

    #[test]
    fn save_writes_documented_layout() {
        let store = JsonStore::new(temp_path("layout.json"));
        store.save(&sample_tasks()[2..3]).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        fs::remove_file(store.path()).ok();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let record = &value.as_array().unwrap()[0];

        assert_eq!(record["title"], "reminder");
        assert_eq!(record["priority"], "Low");
        assert_eq!(record["deadline"], "2030-02-01");
        assert_eq!(record["deadline_time"], "09:30:00");
        assert_eq!(record["notify_enabled"], true);
        assert_eq!(record["notify_before_minutes"], 1440);
        assert_eq!(record["notified"], true);
        assert!(record["created_at"].is_string());
    }

    #[test]
    fn save_leaves_no_staging_files_behind() {
        let dir = temp_path("staging-dir");
        let store = JsonStore::new(dir.join("tasks.json"));

        store.save(&sample_tasks()).unwrap();
        store.save(&sample_tasks()[..1]).unwrap();
        let entries: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn save_reports_io_error_when_parent_is_a_file() {
        let blocker = temp_path("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = JsonStore::new(blocker.join("tasks.json"));

        let err = store.save(&sample_tasks()).unwrap_err();
        fs::remove_file(&blocker).ok();

        assert_eq!(err.code(), "io_error");
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let store = JsonStore::new(temp_path("missing.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn load_accepts_legacy_timestamp_deadline_time() {
        let path = temp_path("legacy.json");
        let content = serde_json::json!([
            {
                "title": "legacy",
                "deadline": "2025-03-10",
                "deadline_time": "2025-03-10T14:30:00.123456"
            }
        ]);
        fs::write(&path, content.to_string()).unwrap();

        let loaded = JsonStore::new(&path).load().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded[0].deadline_time.map(|t| (t.hour(), t.minute())), Some((14, 30)));
        assert_eq!(loaded[0].deadline_date, Some(date!(2025 - 03 - 10)));
    }

    #[test]
    fn fractional_deadline_time_reloads_unchanged_after_save() {
        let path = temp_path("fraction.json");
        let content = serde_json::json!([
            { "title": "fraction", "deadline": "2025-03-10", "deadline_time": "14:30:05.250" },
            { "title": "legacy", "deadline": "2025-03-10", "deadline_time": "2025-03-10T09:00:00.123456" }
        ]);
        fs::write(&path, content.to_string()).unwrap();

        let store = JsonStore::new(&path);
        let first = store.load().unwrap();
        store.save(&first).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let second = store.load().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(first, second);
        assert_eq!(first[0].deadline_time, Some(time!(14:30:05)));
        assert_eq!(written[0]["deadline_time"], "14:30:05");
        assert_eq!(written[1]["deadline_time"], "09:00:00");
    }

    #[test]
    fn load_applies_defaults_for_missing_fields() {
        let path = temp_path("defaults.json");
        fs::write(&path, r#"[{"title": "bare"}]"#).unwrap();

        let loaded = JsonStore::new(&path).load().unwrap();
        fs::remove_file(&path).ok();

        let task = &loaded[0];
        assert_eq!(task.title, "bare");
        assert_eq!(task.description, "");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.notify_before_minutes, 30);
        assert!(!task.notify_enabled);
        assert!(!task.completed);
        assert!(!task.notified);
        assert_eq!(task.deadline_date, None);
        assert!(!task.created_at().is_empty());
    }

    #[test]
    fn load_tolerates_unknown_priority_and_bad_time() {
        let path = temp_path("lenient.json");
        let content = serde_json::json!([
            {
                "title": "odd",
                "priority": "Critical",
                "deadline": "2025-03-10",
                "deadline_time": "quarter past nine",
                "notify_before_minutes": -5
            }
        ]);
        fs::write(&path, content.to_string()).unwrap();

        let loaded = JsonStore::new(&path).load().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded[0].priority, Priority::Medium);
        assert_eq!(loaded[0].deadline_time, None);
        assert_eq!(loaded[0].notify_before_minutes, 30);
    }

    #[test]
    fn load_rejects_invalid_json() {
        let path = temp_path("broken.json");
        fs::write(&path, "[{ broken").unwrap();

        let err = JsonStore::new(&path).load().unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "parse_error");
    }

    #[test]
    fn load_rejects_non_array_document() {
        let path = temp_path("object.json");
        fs::write(&path, r#"{"schema_version": 5, "tasks": []}"#).unwrap();

        let err = JsonStore::new(&path).load().unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "parse_error");
    }

    #[test]
    fn load_rejects_unreadable_deadline_date() {
        let path = temp_path("bad-date.json");
        fs::write(&path, r#"[{"title": "x", "deadline": "next tuesday"}]"#).unwrap();

        let err = JsonStore::new(&path).load().unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "parse_error");
    }

    #[test]
    fn deadline_time_strategies_in_order() {
        assert_eq!(parse_deadline_time("08:15:00"), Some(time!(08:15)));
        assert_eq!(parse_deadline_time("08:15"), Some(time!(08:15)));
        assert_eq!(
            parse_deadline_time("08:15:00.500000"),
            Some(time!(08:15:00))
        );
        assert_eq!(
            parse_deadline_time("2024-12-31T22:05:00+01:00"),
            Some(time!(22:05))
        );
        assert_eq!(parse_deadline_time("2024-12-31 22:05:00"), Some(time!(22:05)));
        assert_eq!(parse_deadline_time("soon"), None);
    }
}
