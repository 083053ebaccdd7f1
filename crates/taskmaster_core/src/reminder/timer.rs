//! One-shot delayed callbacks with cancellable handles.

use crate::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque identifier of a pending delayed callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

pub trait TimerDriver: Send + Sync {
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Returns `false` when the timer already fired or was never started here.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs each timer as a sleeping task on a tokio runtime.
pub struct TokioTimers {
    runtime: Handle,
    next_handle: AtomicU64,
    tasks: Arc<Mutex<HashMap<TimerHandle, JoinHandle<()>>>>,
}

impl TokioTimers {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_handle: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn try_current() -> Result<Self, AppError> {
        let runtime = Handle::try_current()
            .map_err(|err| AppError::invalid_data(format!("no tokio runtime: {err}")))?;
        Ok(Self::new(runtime))
    }

    pub fn active(&self) -> usize {
        lock(&self.tasks).len()
    }
}

impl TimerDriver for TokioTimers {
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let tasks = Arc::clone(&self.tasks);

        // Hold the map while spawning so the task cannot finish before it is tracked.
        let mut guard = lock(&self.tasks);
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            lock(&tasks).remove(&handle);
            // Callbacks may block on desktop notification delivery.
            if let Err(err) = tokio::task::spawn_blocking(callback).await {
                warn!(timer = handle.0, error = %err, "timer callback failed");
            }
        });
        guard.insert(handle, join);

        debug!(timer = handle.0, delay_ms = delay.as_millis() as u64, "timer started");
        handle
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        match lock(&self.tasks).remove(&handle) {
            Some(join) => {
                join.abort();
                debug!(timer = handle.0, "timer cancelled");
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, join) in lock(&self.tasks).drain() {
            join.abort();
        }
    }
}

struct ManualTimer {
    handle: TimerHandle,
    deadline: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_handle: u64,
    pending: Vec<ManualTimer>,
}

/// Deterministic driver: time only moves through [`ManualTimers::advance`].
#[derive(Default)]
pub struct ManualTimers {
    state: Mutex<ManualState>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since creation.
    pub fn now(&self) -> Duration {
        lock(&self.state).now
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Moves the clock forward, firing due callbacks in deadline order.
    /// Callbacks run without the driver lock held, so they may start or
    /// cancel timers themselves. Returns the number of callbacks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = lock(&self.state).now + by;
        let mut fired = 0;

        loop {
            let due = {
                let mut state = lock(&self.state);
                let next = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.deadline <= target)
                    .min_by_key(|(_, timer)| (timer.deadline, timer.handle))
                    .map(|(index, _)| index);

                match next {
                    Some(index) => {
                        let timer = state.pending.remove(index);
                        state.now = timer.deadline;
                        timer
                    }
                    None => {
                        state.now = target;
                        break;
                    }
                }
            };

            (due.callback)();
            fired += 1;
        }

        fired
    }
}

impl TimerDriver for ManualTimers {
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut state = lock(&self.state);
        state.next_handle += 1;
        let handle = TimerHandle(state.next_handle);
        let deadline = state.now + delay;
        state.pending.push(ManualTimer {
            handle,
            deadline,
            callback,
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut state = lock(&self.state);
        let before = state.pending.len();
        state.pending.retain(|timer| timer.handle != handle);
        state.pending.len() != before
    }
}
