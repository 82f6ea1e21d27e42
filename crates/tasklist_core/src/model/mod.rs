mod filter;
mod task;

pub use filter::{FilterKind, display_order};
pub use task::{
    DEFAULT_NOTIFY_LEAD_MINUTES, END_OF_DAY, NOTIFY_LEAD_MINUTES, Priority, Task, TaskDraft,
    notify_lead_label,
};
