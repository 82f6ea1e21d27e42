use crate::error::AppError;
use crate::model::Priority;
use crate::notify::Notifier;
use crate::task_store::{TaskId, TaskStore};
use log::{info, warn};
use std::time::Duration;
use time::PrimitiveDateTime;
use time::macros::format_description;

/// Wall-clock spacing between two sweeps.
pub const REMINDER_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: TaskId,
    pub title: String,
    pub deadline: PrimitiveDateTime,
    pub priority: Priority,
}

impl Reminder {
    pub fn deadline_label(&self) -> String {
        self.deadline
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
            .unwrap_or_else(|_| self.deadline.to_string())
    }
}

#[derive(Debug)]
pub struct ReminderFailure {
    pub task_id: TaskId,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub overdue_count: usize,
    pub reminders: Vec<Reminder>,
    pub failures: Vec<ReminderFailure>,
    /// Set when a reloading loop could not re-read the file; the sweep was
    /// skipped.
    pub load_error: Option<AppError>,
}

/// One pass over the store: report the overdue count, then signal and latch
/// every task whose reminder threshold has been reached.
///
/// The latch is set even when the notifier or the following save fails;
/// neither is retried.
pub fn sweep(store: &mut TaskStore, notifier: &dyn Notifier, now: PrimitiveDateTime) -> SweepReport {
    let overdue_count = store.overdue_count(now);
    notifier.overdue_count(overdue_count);

    let due: Vec<Reminder> = store
        .entries()
        .iter()
        .filter(|entry| entry.task.should_notify_at(now))
        .filter_map(|entry| {
            Some(Reminder {
                task_id: entry.id,
                title: entry.task.title.clone(),
                deadline: entry.task.deadline_datetime()?,
                priority: entry.task.priority,
            })
        })
        .collect();

    let mut report = SweepReport {
        overdue_count,
        reminders: Vec::with_capacity(due.len()),
        failures: Vec::new(),
        load_error: None,
    };

    for reminder in due {
        info!(
            "reminder for task {} {:?} due {}",
            reminder.task_id,
            reminder.title,
            reminder.deadline_label()
        );

        if let Err(error) = notifier.remind(&reminder) {
            warn!("could not deliver reminder for task {}: {error}", reminder.task_id);
            report.failures.push(ReminderFailure {
                task_id: reminder.task_id,
                error,
            });
        }

        match store.mark_notified(reminder.task_id) {
            Ok(committed) => {
                if let Some(error) = committed.save_error {
                    report.failures.push(ReminderFailure {
                        task_id: reminder.task_id,
                        error,
                    });
                }
            }
            Err(error) => report.failures.push(ReminderFailure {
                task_id: reminder.task_id,
                error,
            }),
        }

        report.reminders.push(reminder);
    }

    report
}

/// Runs [`sweep`] on a fixed interval on the calling thread. The next sweep
/// is only scheduled after the previous one, saves included, has finished.
#[derive(Debug, Clone)]
pub struct ReminderLoop {
    interval: Duration,
    reload: bool,
}

impl Default for ReminderLoop {
    fn default() -> Self {
        Self::new(REMINDER_INTERVAL)
    }
}

impl ReminderLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            reload: false,
        }
    }

    /// Re-read the store's file before every sweep, so tasks written by other
    /// processes in between are swept and not overwritten.
    pub fn reloading(mut self) -> Self {
        self.reload = true;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sweeps until `keep_going` returns false; returns the number of sweeps.
    pub fn run<C, F>(
        &self,
        store: &mut TaskStore,
        notifier: &dyn Notifier,
        mut clock: C,
        mut keep_going: F,
    ) -> usize
    where
        C: FnMut() -> PrimitiveDateTime,
        F: FnMut(&SweepReport) -> bool,
    {
        let mut sweeps = 0;
        loop {
            let report = match self.reload.then(|| store.reload()) {
                Some(Err(err)) => {
                    warn!("skipping sweep, could not reload tasks: {err}");
                    SweepReport {
                        load_error: Some(err),
                        ..SweepReport::default()
                    }
                }
                _ => sweep(store, notifier, clock()),
            };
            sweeps += 1;
            if !keep_going(&report) {
                return sweeps;
            }
            std::thread::sleep(self.interval);
        }
    }
}
