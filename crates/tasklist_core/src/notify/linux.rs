use crate::error::AppError;
use crate::model::Priority;
use crate::notify::{Notifier, REMINDER_SUMMARY, reminder_body};
use crate::reminder::Reminder;
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError> {
        let urgency = match reminder.priority {
            Priority::High => Urgency::Critical,
            Priority::Medium | Priority::Low => Urgency::Normal,
        };

        Notification::new()
            .summary(REMINDER_SUMMARY)
            .body(&reminder_body(reminder))
            .urgency(urgency)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
