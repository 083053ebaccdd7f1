use std::fmt;
use std::time::Duration;

/// Advisory message produced by a reminder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderNotice {
    Set { text: String, delay: Duration },
    PermissionRequired,
    Unsupported,
}

impl ReminderNotice {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set { .. })
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Set { .. } => "Reminder Set",
            Self::PermissionRequired => "Notification Permission Required",
            Self::Unsupported => "Notifications Unsupported",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Set { .. } => "reminder_set",
            Self::PermissionRequired => "permission_required",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ReminderNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { text, delay } => {
                write!(f, "Reminder set for \"{}\", fires in {}s", text, delay.as_secs())
            }
            Self::PermissionRequired => f.write_str(
                "Notification permission required: enable notifications to use reminders",
            ),
            Self::Unsupported => f.write_str("Notifications are not supported in this environment"),
        }
    }
}
