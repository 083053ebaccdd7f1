use crate::error::AppError;
use crate::notify::NotificationSink;
use notify_rust::Notification;

pub struct LinuxNotifier;

impl NotificationSink for LinuxNotifier {
    fn deliver(&self, title: &str, body: &str) -> Result<(), AppError> {
        Notification::new()
            .appname("taskmaster")
            .summary(title)
            .body(body)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
