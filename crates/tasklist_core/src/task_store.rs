use crate::error::AppError;
use crate::model::{FilterKind, Task, TaskDraft, display_order};
use crate::storage::JsonStore;
use log::{info, warn};
use std::fmt;
use time::PrimitiveDateTime;

/// Handle for a task inside one [`TaskStore`]. Assigned in file order on
/// load and incrementally on add; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub id: TaskId,
    pub task: Task,
}

/// Result of a mutation that was applied in memory. `save_error` is set when
/// writing the file afterwards failed; the mutation is kept regardless.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub save_error: Option<AppError>,
}

impl<T> Committed<T> {
    pub fn is_persisted(&self) -> bool {
        self.save_error.is_none()
    }
}

#[derive(Debug)]
pub struct StoreOpen {
    pub store: TaskStore,
    pub error: Option<AppError>,
}

/// Owns the task collection and commits every mutation to its JSON file.
#[derive(Debug)]
pub struct TaskStore {
    adapter: JsonStore,
    entries: Vec<TaskEntry>,
    next_id: u64,
}

impl TaskStore {
    /// Loads the backing file. A load failure leaves the store empty and is
    /// handed back for the caller to report.
    pub fn open(adapter: JsonStore) -> StoreOpen {
        match adapter.load() {
            Ok(tasks) => StoreOpen {
                store: Self::from_tasks(adapter, tasks),
                error: None,
            },
            Err(err) => {
                warn!(
                    "could not load {}: {}; starting with an empty list",
                    adapter.path().display(),
                    err
                );
                StoreOpen {
                    store: Self::from_tasks(adapter, Vec::new()),
                    error: Some(err),
                }
            }
        }
    }

    pub fn from_tasks(adapter: JsonStore, tasks: Vec<Task>) -> Self {
        let mut store = Self {
            adapter,
            entries: Vec::with_capacity(tasks.len()),
            next_id: 1,
        };
        for task in tasks {
            store.push(task);
        }
        store
    }

    /// Re-reads the backing file and renumbers the entries in file order. On
    /// failure the current entries are left untouched.
    pub fn reload(&mut self) -> Result<(), AppError> {
        let tasks = self.adapter.load()?;
        self.entries.clear();
        self.next_id = 1;
        for task in tasks {
            self.push(task);
        }
        Ok(())
    }

    pub fn adapter(&self) -> &JsonStore {
        &self.adapter
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[TaskEntry] {
        &self.entries
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.task)
    }

    pub fn add(
        &mut self,
        draft: &TaskDraft,
        now: PrimitiveDateTime,
    ) -> Result<Committed<TaskId>, AppError> {
        draft.validate(now)?;

        let id = self.push(Task::from_draft(draft));
        info!("added task {} {:?}", id, draft.title.trim());
        Ok(self.commit(id))
    }

    /// Applies an edit form. The notification latch is not re-armed, even
    /// when the deadline moves.
    pub fn update(
        &mut self,
        id: TaskId,
        draft: &TaskDraft,
        now: PrimitiveDateTime,
    ) -> Result<Committed<Task>, AppError> {
        draft.validate(now)?;

        let task = self.task_mut(id)?;
        task.apply_draft(draft);
        let updated = task.clone();
        info!("updated task {} {:?}", id, updated.title);
        Ok(self.commit(updated))
    }

    pub fn set_completed(
        &mut self,
        id: TaskId,
        completed: bool,
    ) -> Result<Committed<Task>, AppError> {
        let task = self.task_mut(id)?;
        task.completed = completed;
        let updated = task.clone();
        info!("task {} completed={}", id, completed);
        Ok(self.commit(updated))
    }

    pub fn toggle_completed(&mut self, id: TaskId) -> Result<Committed<Task>, AppError> {
        let completed = self
            .get(id)
            .map(|task| !task.completed)
            .ok_or_else(|| task_not_found(id))?;
        self.set_completed(id, completed)
    }

    pub fn remove(&mut self, id: TaskId) -> Result<Committed<Task>, AppError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| task_not_found(id))?;

        let removed = self.entries.remove(index).task;
        info!("removed task {} {:?}", id, removed.title);
        Ok(self.commit(removed))
    }

    /// Latches the reminder flag. Used by the reminder sweep only.
    pub fn mark_notified(&mut self, id: TaskId) -> Result<Committed<Task>, AppError> {
        let task = self.task_mut(id)?;
        task.notified = true;
        let updated = task.clone();
        Ok(self.commit(updated))
    }

    pub fn overdue_count(&self, now: PrimitiveDateTime) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.task.is_overdue_at(now))
            .count()
    }

    /// Tasks matching `kind`, in display order.
    pub fn filtered_sorted(&self, kind: FilterKind, now: PrimitiveDateTime) -> Vec<&TaskEntry> {
        let mut view: Vec<&TaskEntry> = self
            .entries
            .iter()
            .filter(|entry| kind.matches(&entry.task, now))
            .collect();
        view.sort_by(|a, b| display_order(&a.task, &b.task));
        view
    }

    fn push(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.entries.push(TaskEntry { id, task });
        id
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, AppError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| &mut entry.task)
            .ok_or_else(|| task_not_found(id))
    }

    fn commit<T>(&self, value: T) -> Committed<T> {
        let save_error = self
            .adapter
            .save(self.entries.iter().map(|entry| &entry.task))
            .err();
        if let Some(err) = save_error.as_ref() {
            warn!("change kept in memory but not saved: {err}");
        }
        Committed { value, save_error }
    }
}

fn task_not_found(id: TaskId) -> AppError {
    AppError::not_found(format!("task {id} not found"))
}
