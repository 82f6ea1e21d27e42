use crate::error::AppError;
use crate::notify::{Notifier, REMINDER_SUMMARY};
use crate::reminder::Reminder;
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError> {
        let details = format!(
            "Deadline: {}  Priority: {}",
            reminder.deadline_label(),
            reminder.priority.label()
        );

        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(REMINDER_SUMMARY)
            .text1(&reminder.title)
            .text2(&details)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
