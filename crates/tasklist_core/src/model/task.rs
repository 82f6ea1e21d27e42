use crate::clock;
use crate::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::time;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

/// Deadline time used when a task only carries a date.
pub const END_OF_DAY: Time = time!(23:59);

/// Reminder leads offered to the user, in minutes before the deadline.
pub const NOTIFY_LEAD_MINUTES: [u32; 9] = [5, 15, 30, 60, 120, 240, 1440, 2880, 10080];
pub const DEFAULT_NOTIFY_LEAD_MINUTES: u32 = 30;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort weight; larger sorts first.
    pub fn weight(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|priority| priority.label().eq_ignore_ascii_case(trimmed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub deadline_date: Option<Date>,
    /// Only meaningful together with `deadline_date`.
    pub deadline_time: Option<Time>,
    pub notify_enabled: bool,
    pub notify_before_minutes: u32,
    pub completed: bool,
    /// Latched by the reminder sweep; edits never clear it.
    pub notified: bool,
    created_at: String,
}

impl Task {
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            deadline_date: None,
            deadline_time: None,
            notify_enabled: false,
            notify_before_minutes: DEFAULT_NOTIFY_LEAD_MINUTES,
            completed: false,
            notified: false,
            created_at: creation_timestamp(),
        }
    }

    /// Builds a task from an already validated draft.
    pub fn from_draft(draft: &TaskDraft) -> Self {
        let mut task = Self::new(String::new());
        task.apply_draft(draft);
        task
    }

    /// Replaces the user-editable fields. `completed`, `notified` and
    /// `created_at` are left alone.
    pub fn apply_draft(&mut self, draft: &TaskDraft) {
        self.title = draft.title.trim().to_string();
        self.description = draft.description.trim().to_string();
        self.priority = draft.priority;
        self.deadline_date = draft.deadline_date;
        self.deadline_time = draft.deadline_time;
        self.notify_enabled = draft.notify_enabled;
        self.notify_before_minutes = draft.notify_before_minutes;
    }

    pub(crate) fn with_created_at(mut self, created_at: String) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn deadline_datetime(&self) -> Option<PrimitiveDateTime> {
        combine_deadline(self.deadline_date, self.deadline_time)
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(clock::local_now())
    }

    pub fn is_overdue_at(&self, now: PrimitiveDateTime) -> bool {
        if self.completed {
            return false;
        }
        self.deadline_datetime()
            .is_some_and(|deadline| now > deadline)
    }

    pub fn should_notify(&self) -> bool {
        self.should_notify_at(clock::local_now())
    }

    /// One-shot trigger: stays true until the caller latches `notified`.
    pub fn should_notify_at(&self, now: PrimitiveDateTime) -> bool {
        if !self.notify_enabled || self.completed || self.notified {
            return false;
        }

        let Some(deadline) = self.deadline_datetime() else {
            return false;
        };

        let lead = Duration::minutes(i64::from(self.notify_before_minutes));
        deadline
            .checked_sub(lead)
            .is_none_or(|threshold| now >= threshold)
    }
}

/// Form input for creating or editing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub deadline_date: Option<Date>,
    pub deadline_time: Option<Time>,
    pub notify_enabled: bool,
    pub notify_before_minutes: u32,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Priority::default(),
            deadline_date: None,
            deadline_time: None,
            notify_enabled: false,
            notify_before_minutes: DEFAULT_NOTIFY_LEAD_MINUTES,
        }
    }
}

impl TaskDraft {
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Pre-fills an edit form from an existing task. A lead time outside
    /// [`NOTIFY_LEAD_MINUTES`], as older files may hold, is replaced by the
    /// closest offered one.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            deadline_date: task.deadline_date,
            deadline_time: task.deadline_time,
            notify_enabled: task.notify_enabled,
            notify_before_minutes: closest_notify_lead(task.notify_before_minutes),
        }
    }

    pub fn deadline_datetime(&self) -> Option<PrimitiveDateTime> {
        combine_deadline(self.deadline_date, self.deadline_time)
    }

    /// Checks the draft at the instant of submission.
    pub fn validate(&self, now: PrimitiveDateTime) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title is required"));
        }

        if let Some(deadline) = self.deadline_datetime()
            && deadline <= now
        {
            return Err(AppError::validation("deadline must be in the future"));
        }

        if !NOTIFY_LEAD_MINUTES.contains(&self.notify_before_minutes) {
            return Err(AppError::validation(format!(
                "notify_before_minutes must be one of {NOTIFY_LEAD_MINUTES:?}"
            )));
        }

        Ok(())
    }
}

/// Ties go to the shorter lead.
fn closest_notify_lead(minutes: u32) -> u32 {
    NOTIFY_LEAD_MINUTES
        .into_iter()
        .min_by_key(|lead| lead.abs_diff(minutes))
        .unwrap_or(DEFAULT_NOTIFY_LEAD_MINUTES)
}

fn combine_deadline(date: Option<Date>, time: Option<Time>) -> Option<PrimitiveDateTime> {
    let date = date?;
    Some(PrimitiveDateTime::new(date, time.unwrap_or(END_OF_DAY)))
}

fn creation_timestamp() -> String {
    let now = OffsetDateTime::now_utc().to_offset(clock::local_offset());
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

pub fn notify_lead_label(minutes: u32) -> String {
    match minutes {
        10080 => "1 week".to_string(),
        m if m % 1440 == 0 => plural(m / 1440, "day"),
        m if m % 60 == 0 => plural(m / 60, "hour"),
        m => plural(m, "minute"),
    }
}

fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
