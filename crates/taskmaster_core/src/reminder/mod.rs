//! Timed reminder notifications for tasks.

mod notice;
pub mod permission;
mod scheduler;
pub mod timer;

pub use notice::ReminderNotice;
pub use permission::{DesktopPermission, PermissionGate, PermissionStatus, StaticPermission};
pub use scheduler::{DEFAULT_REMINDER_DELAY, ReminderScheduler};
pub use timer::{ManualTimers, TimerCallback, TimerDriver, TimerHandle, TokioTimers};
