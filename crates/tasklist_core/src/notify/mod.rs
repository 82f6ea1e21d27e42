use crate::error::AppError;
use crate::reminder::Reminder;
use log::debug;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const REMINDER_SUMMARY: &str = "Task Deadline Reminder";
const DISABLE_ENV_VAR: &str = "TASKLIST_DISABLE_NOTIFICATIONS";

/// Receives the reminder sweep's signals.
pub trait Notifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError>;

    fn overdue_count(&self, count: usize) {
        let _ = count;
    }
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn remind(&self, _reminder: &Reminder) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn reminder_body(reminder: &Reminder) -> String {
    format!(
        "Task: {}\nDeadline: {}\nPriority: {}",
        reminder.title,
        reminder.deadline_label(),
        reminder.priority.label()
    )
}

/// Desktop notifier for this platform, or the no-op notifier when
/// notifications are disabled or unsupported.
pub fn notifier_from_env(enabled: bool) -> Result<Box<dyn Notifier>, AppError> {
    if !enabled || std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::Validation(message) => {
                debug!("desktop notifications off: {message}");
                Ok(Box::new(NoopNotifier))
            }
            other => Err(other),
        },
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::validation(
        "notifications are not supported on this platform",
    ))
}
