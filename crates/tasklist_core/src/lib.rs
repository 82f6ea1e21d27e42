pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod notify;
pub mod reminder;
pub mod storage;
pub mod task_store;
