use crate::error::AppError;
use std::sync::Arc;
use tracing::warn;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const REMINDER_TITLE: &str = "TaskMaster Reminder";

pub fn reminder_body(text: &str) -> String {
    format!("Reminder: {text}")
}

/// Where fired reminders end up.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, title: &str, body: &str) -> Result<(), AppError>;

    /// Fire-and-forget: delivery failures are logged, never returned.
    fn show(&self, title: &str, body: &str) {
        if let Err(err) = self.deliver(title, body) {
            warn!(error = %err, title, "notification delivery failed");
        }
    }
}

pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
    fn deliver(&self, _title: &str, _body: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Platform notifier, or [`NoopNotifier`] where the platform has none or
/// notifications are switched off.
pub fn notifier_from_env(enabled: bool) -> Arc<dyn NotificationSink> {
    if !enabled || std::env::var("TASKMASTER_DISABLE_NOTIFICATIONS").is_ok() {
        return Arc::new(NoopNotifier);
    }

    match platform_notifier() {
        Ok(notifier) => notifier,
        Err(err) => {
            warn!(error = %err, "falling back to silent notifier");
            Arc::new(NoopNotifier)
        }
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Arc<dyn NotificationSink>, AppError> {
    Ok(Arc::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Arc<dyn NotificationSink>, AppError> {
    Ok(Arc::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Arc<dyn NotificationSink>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
