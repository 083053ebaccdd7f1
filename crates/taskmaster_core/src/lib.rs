pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod reminder;
pub mod storage;
pub mod task_store;

pub use model::{Filter, Task, TaskId};
pub use reminder::{ReminderNotice, ReminderScheduler};
pub use task_store::TaskStore;
