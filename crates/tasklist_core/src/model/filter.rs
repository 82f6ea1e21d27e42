use crate::model::{Priority, Task};
use crate::naming::canonical_key;
use std::cmp::Ordering;
use time::PrimitiveDateTime;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    #[default]
    All,
    HighPriority,
    MediumPriority,
    LowPriority,
    Overdue,
    Completed,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::All,
        FilterKind::HighPriority,
        FilterKind::MediumPriority,
        FilterKind::LowPriority,
        FilterKind::Overdue,
        FilterKind::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::HighPriority => "High Priority",
            Self::MediumPriority => "Medium Priority",
            Self::LowPriority => "Low Priority",
            Self::Overdue => "Overdue",
            Self::Completed => "Completed",
        }
    }

    /// Accepts display labels as well as short forms such as `high` or
    /// `high-priority`.
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = canonical_key(raw)?;
        match canonical.as_str() {
            "all" => Some(Self::All),
            "high" | "high_priority" => Some(Self::HighPriority),
            "medium" | "medium_priority" => Some(Self::MediumPriority),
            "low" | "low_priority" => Some(Self::LowPriority),
            "overdue" => Some(Self::Overdue),
            "completed" | "done" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn matches(self, task: &Task, now: PrimitiveDateTime) -> bool {
        match self {
            Self::All => true,
            Self::HighPriority => task.priority == Priority::High,
            Self::MediumPriority => task.priority == Priority::Medium,
            Self::LowPriority => task.priority == Priority::Low,
            Self::Overdue => task.is_overdue_at(now),
            Self::Completed => task.completed,
        }
    }
}

/// Display order: priority weight descending, then deadline ascending with
/// undated tasks last, then case-insensitive title.
pub fn display_order(a: &Task, b: &Task) -> Ordering {
    b.priority
        .weight()
        .cmp(&a.priority.weight())
        .then_with(|| compare_deadlines(a.deadline_datetime(), b.deadline_datetime()))
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
}

fn compare_deadlines(a: Option<PrimitiveDateTime>, b: Option<PrimitiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
