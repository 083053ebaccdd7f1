use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

const DISABLE_ENV_VAR: &str = "TASKMASTER_DISABLE_NOTIFICATIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Decides whether reminders may be delivered.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    fn current_status(&self) -> PermissionStatus;

    /// Asks for permission; resolves to `true` when granted.
    async fn request(&self) -> bool;

    /// `false` when the environment has no notification capability at all.
    fn is_supported(&self) -> bool {
        true
    }
}

fn settle(status: &Mutex<PermissionStatus>, granted: bool) -> bool {
    let mut guard = status.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = if granted {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    };
    granted
}

/// Desktop notifications need no user prompt; the gate only reflects whether
/// the platform can show them and whether the user switched them off.
pub struct DesktopPermission {
    enabled: bool,
    status: Mutex<PermissionStatus>,
}

impl DesktopPermission {
    pub fn new(enabled: bool) -> Self {
        let status = if enabled {
            PermissionStatus::Undetermined
        } else {
            PermissionStatus::Denied
        };
        Self {
            enabled,
            status: Mutex::new(status),
        }
    }

    /// `enabled` comes from configuration; the environment can still veto it.
    pub fn from_env(enabled: bool) -> Self {
        let disabled_by_env = std::env::var(DISABLE_ENV_VAR).is_ok();
        Self::new(enabled && !disabled_by_env)
    }
}

#[async_trait]
impl PermissionGate for DesktopPermission {
    fn current_status(&self) -> PermissionStatus {
        *self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn request(&self) -> bool {
        debug!(enabled = self.enabled, "notification permission requested");
        settle(&self.status, self.enabled)
    }

    fn is_supported(&self) -> bool {
        cfg!(any(target_os = "linux", windows))
    }
}

/// Gate with scripted answers.
pub struct StaticPermission {
    status: Mutex<PermissionStatus>,
    answer: bool,
    supported: bool,
    requests: AtomicUsize,
}

impl StaticPermission {
    fn build(status: PermissionStatus, answer: bool, supported: bool) -> Self {
        Self {
            status: Mutex::new(status),
            answer,
            supported,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::build(PermissionStatus::Granted, true, true)
    }

    pub fn denied() -> Self {
        Self::build(PermissionStatus::Denied, false, true)
    }

    /// Starts undetermined and settles to `answer` on the first request.
    pub fn prompt(answer: bool) -> Self {
        Self::build(PermissionStatus::Undetermined, answer, true)
    }

    pub fn unsupported() -> Self {
        Self::build(PermissionStatus::Undetermined, false, false)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for StaticPermission {
    fn current_status(&self) -> PermissionStatus {
        *self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        settle(&self.status, self.answer)
    }

    fn is_supported(&self) -> bool {
        self.supported
    }
}
