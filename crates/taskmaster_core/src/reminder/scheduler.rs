use crate::model::TaskId;
use crate::notify::{NotificationSink, REMINDER_TITLE, reminder_body};
use crate::reminder::notice::ReminderNotice;
use crate::reminder::permission::{PermissionGate, PermissionStatus};
use crate::reminder::timer::{TimerDriver, TimerHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

pub const DEFAULT_REMINDER_DELAY: Duration = Duration::from_secs(10);

struct PendingReminder {
    handle: TimerHandle,
    generation: u64,
}

struct Inner {
    timers: Arc<dyn TimerDriver>,
    sink: Arc<dyn NotificationSink>,
    gate: Arc<dyn PermissionGate>,
    supported: bool,
    delay: Duration,
    pending: Mutex<HashMap<TaskId, PendingReminder>>,
    next_generation: AtomicU64,
    // Reminders removed from `pending` whose notification is still being shown.
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<TaskId, PendingReminder>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_idle(&self) -> bool {
        let pending = self.lock_pending();
        pending.is_empty() && self.in_flight.load(Ordering::SeqCst) == 0
    }

    fn signal_if_idle(&self) {
        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }

    fn fire(&self, id: TaskId, generation: u64, text: &str) {
        let current = {
            let mut pending = self.lock_pending();
            match pending.get(&id) {
                Some(entry) if entry.generation == generation => {
                    pending.remove(&id);
                    self.in_flight.fetch_add(1, Ordering::SeqCst);
                    true
                }
                _ => false,
            }
        };

        if !current {
            debug!(task_id = id, generation, "ignoring superseded reminder");
            return;
        }

        info!(task_id = id, "reminder fired");
        self.sink.show(REMINDER_TITLE, &reminder_body(text));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.signal_if_idle();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, reminder) in pending.drain() {
            self.timers.cancel(reminder.handle);
        }
    }
}

/// Maps task ids to pending one-shot reminders. Clones share state; the
/// remaining timers are cancelled when the last clone is dropped.
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    /// Support is probed once here; an unsupported gate is never asked again.
    pub fn new(
        timers: Arc<dyn TimerDriver>,
        sink: Arc<dyn NotificationSink>,
        gate: Arc<dyn PermissionGate>,
        delay: Duration,
    ) -> Self {
        let supported = gate.is_supported();
        if !supported {
            info!("notifications unsupported; reminders disabled");
        }

        Self {
            inner: Arc::new(Inner {
                timers,
                sink,
                gate,
                supported,
                delay,
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Schedules a one-shot reminder carrying `text` as it is right now.
    /// A pending reminder for the same id is replaced.
    pub async fn schedule(&self, id: TaskId, text: &str) -> ReminderNotice {
        if !self.inner.supported {
            return ReminderNotice::Unsupported;
        }

        if self.inner.gate.current_status() != PermissionStatus::Granted
            && !self.inner.gate.request().await
        {
            info!(task_id = id, "reminder refused: notification permission missing");
            return ReminderNotice::PermissionRequired;
        }

        let text = text.to_string();
        self.install(id, text.clone());
        info!(task_id = id, delay_secs = self.inner.delay.as_secs(), "reminder set");

        ReminderNotice::Set {
            text,
            delay: self.inner.delay,
        }
    }

    fn install(&self, id: TaskId, text: String) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let mut pending = self.inner.lock_pending();
        if let Some(previous) = pending.remove(&id) {
            self.inner.timers.cancel(previous.handle);
            debug!(task_id = id, "replacing pending reminder");
        }

        let handle = self.inner.timers.start(
            self.inner.delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(id, generation, &text);
                }
            }),
        );
        pending.insert(id, PendingReminder { handle, generation });
    }

    /// Returns `true` when a pending reminder was cancelled.
    pub fn cancel(&self, id: TaskId) -> bool {
        let removed = self.inner.lock_pending().remove(&id);
        match removed {
            Some(reminder) => {
                self.inner.timers.cancel(reminder.handle);
                debug!(task_id = id, "reminder cancelled");
                self.inner.signal_if_idle();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.inner.lock_pending().drain().collect();
        for (_, reminder) in &drained {
            self.inner.timers.cancel(reminder.handle);
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelled all reminders");
        }
        self.inner.signal_if_idle();
    }

    /// Resolves once no reminder is pending or being delivered.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = std::pin::pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if self.inner.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.inner.lock_pending().contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock_pending().len()
    }

    pub fn pending_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<_> = self.inner.lock_pending().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
