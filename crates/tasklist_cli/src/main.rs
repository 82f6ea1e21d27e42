use clap::Parser;
use log::{debug, info};
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use tasklist_cli::cli::{Cli, Command, apply_form, collect_overrides};
use tasklist_cli::render;
use tasklist_core::clock;
use tasklist_core::config::{self, Config, palette_for_theme};
use tasklist_core::error::AppError;
use tasklist_core::logging::{DEFAULT_LOG_LEVEL, init_logging, resolve_log_level};
use tasklist_core::model::{FilterKind, TaskDraft};
use tasklist_core::notify::{Notifier, REMINDER_SUMMARY, notifier_from_env};
use tasklist_core::reminder::{Reminder, ReminderLoop};
use tasklist_core::storage::{JsonStore, store_path};
use tasklist_core::task_store::{Committed, TaskId, TaskStore};

/// Prints every signal of the sweep before handing it to the desktop notifier.
struct ConsoleNotifier {
    inner: Box<dyn Notifier>,
    json: bool,
    last_overdue: Cell<Option<usize>>,
}

impl Notifier for ConsoleNotifier {
    fn remind(&self, reminder: &Reminder) -> Result<(), AppError> {
        if self.json {
            println!("{}", render::reminder_json(reminder));
        } else {
            println!(
                "{REMINDER_SUMMARY}: {} (due {}, {})",
                reminder.title,
                render::format_deadline(reminder.deadline),
                reminder.priority.label()
            );
        }
        self.inner.remind(reminder)
    }

    fn overdue_count(&self, count: usize) {
        if self.last_overdue.replace(Some(count)) != Some(count) {
            if self.json {
                println!(
                    "{}",
                    serde_json::json!({ "event": "overdue", "count": count })
                );
            } else {
                println!("{}", render::overdue_badge(count));
            }
        }
        self.inner.overdue_count(count);
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation(message)
}

fn warn_if_unsaved<T>(committed: &Committed<T>) {
    if let Some(err) = committed.save_error.as_ref() {
        eprintln!("WARNING: change may not persist: {err}");
    }
}

fn print_entry(store: &TaskStore, id: TaskId, json: bool, verb: &str) -> Result<(), AppError> {
    let now = clock::local_now();
    let task = store
        .get(id)
        .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;
    if json {
        println!("{}", render::task_json(id, task, now));
    } else {
        println!("{verb} task {id}: {}", task.title);
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, AppError> {
    print!("{prompt} [y/N] ");
    io::stdout()
        .flush()
        .map_err(|err| AppError::io(err.to_string()))?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|err| AppError::io(err.to_string()))?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn start_logging(config: &Config) -> Result<(), AppError> {
    let level = resolve_log_level(config.log_level.as_deref());
    if let Err(err) = init_logging(&level) {
        eprintln!("WARNING: {err}; logging at {DEFAULT_LOG_LEVEL}");
        init_logging(DEFAULT_LOG_LEVEL)?;
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<TaskStore, AppError> {
    let path = store_path(config.store_path.as_deref())?;
    debug!("task file {}", path.display());
    let opened = TaskStore::open(JsonStore::new(path));
    if let Some(err) = opened.error.as_ref() {
        eprintln!(
            "WARNING: could not load {}: {err}; starting with an empty list",
            opened.store.adapter().path().display()
        );
    }
    Ok(opened.store)
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let overrides = collect_overrides(&cli.config_override)?;
    let loaded = config::load_config_with_fallback();
    let config = config::merge_overrides(&loaded.config, &overrides);
    start_logging(&config)?;
    if let Some(err) = loaded.error.as_ref() {
        eprintln!("WARNING: config not loaded, using defaults: {err}");
    }

    let mut store = open_store(&config)?;
    let json = cli.json;

    match cli.command {
        Command::Add { title, form } => {
            let now = clock::local_now();
            let mut draft = TaskDraft::new(title);
            apply_form(&mut draft, &form, now.date())?;

            let committed = store.add(&draft, now)?;
            warn_if_unsaved(&committed);
            print_entry(&store, committed.value, json, "Added")?;
        }
        Command::Edit {
            id,
            title,
            form,
            no_due,
            no_notify,
        } => {
            let id = TaskId::new(id);
            let now = clock::local_now();
            let current = store
                .get(id)
                .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;

            let mut draft = TaskDraft::from_task(current);
            if let Some(title) = title {
                draft.title = title;
            }
            if no_due {
                draft.deadline_date = None;
                draft.deadline_time = None;
            }
            if no_notify {
                draft.notify_enabled = false;
            }
            apply_form(&mut draft, &form, now.date())?;

            let committed = store.update(id, &draft, now)?;
            warn_if_unsaved(&committed);
            print_entry(&store, id, json, "Updated")?;
        }
        Command::Delete { id, yes } => {
            let id = TaskId::new(id);
            let title = store
                .get(id)
                .map(|task| task.title.clone())
                .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;

            if !yes && !confirm(&format!("Delete task {id} \"{title}\"?"))? {
                println!("Cancelled.");
                return Ok(());
            }

            let committed = store.remove(id)?;
            warn_if_unsaved(&committed);
            if json {
                println!(
                    "{}",
                    render::task_json(id, &committed.value, clock::local_now())
                );
            } else {
                println!("Deleted task {id}: {}", committed.value.title);
            }
        }
        Command::Toggle { id } => {
            let id = TaskId::new(id);
            let committed = store.toggle_completed(id)?;
            warn_if_unsaved(&committed);
            let verb = if committed.value.completed {
                "Completed"
            } else {
                "Reopened"
            };
            print_entry(&store, id, json, verb)?;
        }
        Command::Show { id } => {
            let id = TaskId::new(id);
            let now = clock::local_now();
            let task = store
                .get(id)
                .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;
            if json {
                println!("{}", render::task_json(id, task, now));
            } else {
                println!("{}", render::task_details(id, task, now));
            }
        }
        Command::List { filter } => {
            let kind = FilterKind::parse(&filter).ok_or_else(|| {
                let known: Vec<&str> = FilterKind::ALL.iter().map(|kind| kind.label()).collect();
                AppError::validation(format!(
                    "unknown filter '{}'; expected one of {}",
                    filter.trim(),
                    known.join(", ")
                ))
            })?;
            let now = clock::local_now();
            let entries = store.filtered_sorted(kind, now);

            if json {
                let payload: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|entry| render::task_json(entry.id, &entry.task, now))
                    .collect();
                println!("{}", serde_json::Value::Array(payload));
            } else {
                println!("{}", render::overdue_badge(store.overdue_count(now)));
                if entries.is_empty() {
                    println!("No tasks.");
                } else {
                    let palette = palette_for_theme(config.theme.as_deref());
                    println!("{}", render::task_table(&entries, now, &palette));
                }
            }
        }
        Command::Watch { once } => {
            let notifier = ConsoleNotifier {
                inner: notifier_from_env(config.notifications)?,
                json,
                last_overdue: Cell::new(None),
            };

            let reminders = ReminderLoop::default().reloading();
            info!(
                "watching {} every {}s",
                store.adapter().path().display(),
                reminders.interval().as_secs()
            );
            reminders.run(&mut store, &notifier, clock::local_now, |report| {
                if let Some(err) = report.load_error.as_ref() {
                    eprintln!("WARNING: could not reload tasks, sweep skipped: {err}");
                }
                for failure in &report.failures {
                    eprintln!("WARNING: task {}: {}", failure.task_id, failure.error);
                }
                !once
            });
        }
    }

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
