use tabled::settings::Style;
use tabled::{Table, Tabled};
use tasklist_core::config::{Palette, RowStyle};
use tasklist_core::model::{Priority, Task, notify_lead_label};
use tasklist_core::reminder::Reminder;
use tasklist_core::task_store::{TaskEntry, TaskId};
use time::PrimitiveDateTime;
use time::macros::format_description;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Priority")]
    priority: &'static str,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Reminder")]
    reminder: String,
}

pub fn format_deadline(deadline: PrimitiveDateTime) -> String {
    deadline
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| deadline.to_string())
}

pub fn status_label(task: &Task, now: PrimitiveDateTime) -> &'static str {
    if task.completed {
        "done"
    } else if task.is_overdue_at(now) {
        "OVERDUE"
    } else {
        "pending"
    }
}

pub fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!!",
        Priority::Medium => "!!",
        Priority::Low => "!",
    }
}

fn reminder_label(task: &Task) -> String {
    if !task.notify_enabled || task.deadline_date.is_none() {
        "-".to_string()
    } else if task.notified {
        "sent".to_string()
    } else if task.completed {
        "-".to_string()
    } else {
        format!("{} before", notify_lead_label(task.notify_before_minutes))
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// Renders the list as a table. Overdue rows are accented and completed rows
/// muted.
pub fn task_table(entries: &[&TaskEntry], now: PrimitiveDateTime, palette: &Palette) -> String {
    let rows: Vec<TaskRow> = entries
        .iter()
        .map(|entry| TaskRow {
            id: entry.id.get(),
            status: status_label(&entry.task, now),
            priority: entry.task.priority.label(),
            title: single_line(&entry.task.title),
            deadline: entry
                .task
                .deadline_datetime()
                .map(format_deadline)
                .unwrap_or_else(|| "-".to_string()),
            reminder: reminder_label(&entry.task),
        })
        .collect();

    let rendered = Table::new(&rows).with(Style::psql()).to_string();

    // psql style: header line, separator line, then one line per row.
    rendered
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let style = match index.checked_sub(2).and_then(|row| entries.get(row)) {
                Some(entry) if entry.task.completed => RowStyle::Completed,
                Some(entry) if entry.task.is_overdue_at(now) => RowStyle::Overdue,
                _ => RowStyle::Plain,
            };
            palette.paint(style, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn task_details(id: TaskId, task: &Task, now: PrimitiveDateTime) -> String {
    let description = if task.description.is_empty() {
        "No description".to_string()
    } else {
        task.description.clone()
    };
    let deadline = match task.deadline_datetime() {
        Some(deadline) if task.is_overdue_at(now) => format!("{} (OVERDUE)", format_deadline(deadline)),
        Some(deadline) => format_deadline(deadline),
        None => "No deadline".to_string(),
    };
    let status = if task.completed { "Completed" } else { "Pending" };

    [
        format!("ID:          {id}"),
        format!("Title:       {}", task.title),
        format!("Description: {description}"),
        format!(
            "Priority:    {} {}",
            priority_marker(task.priority),
            task.priority.label()
        ),
        format!("Deadline:    {deadline}"),
        format!("Reminder:    {}", reminder_label(task)),
        format!("Status:      {status}"),
        format!("Created:     {}", task.created_at()),
    ]
    .join("\n")
}

pub fn task_json(id: TaskId, task: &Task, now: PrimitiveDateTime) -> serde_json::Value {
    serde_json::json!({
        "id": id.get(),
        "title": task.title,
        "description": task.description,
        "priority": task.priority.label(),
        "deadline": task.deadline_datetime().map(format_deadline),
        "notify_enabled": task.notify_enabled,
        "notify_before_minutes": task.notify_before_minutes,
        "completed": task.completed,
        "notified": task.notified,
        "overdue": task.is_overdue_at(now),
        "created_at": task.created_at(),
    })
}

pub fn reminder_json(reminder: &Reminder) -> serde_json::Value {
    serde_json::json!({
        "event": "reminder",
        "id": reminder.task_id.get(),
        "title": reminder.title,
        "deadline": format_deadline(reminder.deadline),
        "priority": reminder.priority.label(),
    })
}

pub fn overdue_badge(count: usize) -> String {
    if count == 0 {
        "To-Do List Manager".to_string()
    } else {
        format!("To-Do List Manager - {count} Overdue Task(s)")
    }
}

#[cfg(test)]
mod tests {
    use super::{overdue_badge, status_label, task_details, task_json, task_table};
    use tasklist_core::config::palette_for_theme;
    use tasklist_core::model::{Priority, Task};
    use tasklist_core::storage::JsonStore;
    use tasklist_core::task_store::{TaskId, TaskStore};
    use tasklist_core::model::FilterKind;
    use time::macros::{date, datetime, time};

    fn sample_store() -> TaskStore {
        let mut late = Task::new("late rent");
        late.priority = Priority::High;
        late.deadline_date = Some(date!(2025 - 05 - 01));
        late.deadline_time = Some(time!(09:00));

        let mut done = Task::new("laundry");
        done.completed = true;

        TaskStore::from_tasks(JsonStore::new("unused.json"), vec![late, done])
    }

    #[test]
    fn table_lists_rows_in_display_order() {
        let store = sample_store();
        let now = datetime!(2025-06-01 12:00);
        let entries = store.filtered_sorted(FilterKind::All, now);

        let table = task_table(&entries, now, &palette_for_theme(None));
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Title"));
        assert!(lines[2].contains("late rent"));
        assert!(lines[2].contains("OVERDUE"));
        assert!(lines[2].contains("2025-05-01 09:00"));
        assert!(lines[3].contains("laundry"));
        assert!(lines[3].contains("done"));
    }

    #[test]
    fn table_accents_overdue_rows_with_theme() {
        let store = sample_store();
        let now = datetime!(2025-06-01 12:00);
        let entries = store.filtered_sorted(FilterKind::All, now);

        let table = task_table(&entries, now, &palette_for_theme(Some("noir")));
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[2].starts_with("\x1b[38;5;208m"));
        assert!(lines[3].starts_with("\x1b[38;5;244m"));
        assert!(!lines[0].starts_with('\x1b'));
    }

    #[test]
    fn details_mark_overdue_deadline() {
        let store = sample_store();
        let task = store.get(TaskId::new(1)).unwrap();
        let details = task_details(TaskId::new(1), task, datetime!(2025-06-01 12:00));

        assert!(details.contains("Deadline:    2025-05-01 09:00 (OVERDUE)"));
        assert!(details.contains("Description: No description"));
        assert!(details.contains("!!! High"));
    }

    #[test]
    fn json_includes_derived_state() {
        let store = sample_store();
        let task = store.get(TaskId::new(1)).unwrap();
        let value = task_json(TaskId::new(1), task, datetime!(2025-06-01 12:00));

        assert_eq!(value["id"], 1);
        assert_eq!(value["overdue"], true);
        assert_eq!(value["deadline"], "2025-05-01 09:00");
        assert_eq!(status_label(task, datetime!(2025-04-01 00:00)), "pending");
    }

    #[test]
    fn badge_mentions_overdue_count() {
        assert_eq!(overdue_badge(0), "To-Do List Manager");
        assert_eq!(overdue_badge(2), "To-Do List Manager - 2 Overdue Task(s)");
    }
}
