//! Durable key-value slots and the task snapshot codec.

use crate::error::AppError;
use crate::model::{Task, TaskId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub mod json_store;

pub use json_store::FileStore;

/// Slot holding the serialized task collection.
pub const TASKS_KEY: &str = "todos";

pub trait KeyValueStore: Send {
    /// Returns `Ok(None)` when nothing was ever written under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError>;
}

/// In-process store. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.put(key, value);
        store
    }

    pub fn put(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.value(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.put(key, value);
        Ok(())
    }
}

pub fn encode_tasks(tasks: &[Task]) -> Result<String, AppError> {
    Ok(serde_json::to_string(tasks)?)
}

pub fn decode_tasks(content: &str) -> Result<Vec<Task>, AppError> {
    let tasks: Vec<Task> = serde_json::from_str(content)?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if task.text.trim().is_empty() {
            return Err(AppError::invalid_data(format!("task {} has blank text", task.id)));
        }
        if task.id == TaskId::MAX {
            return Err(AppError::invalid_data(format!(
                "task id {} leaves no room for new ids",
                task.id
            )));
        }
        if !seen.insert(task.id) {
            return Err(AppError::invalid_data(format!("duplicate task id {}", task.id)));
        }
    }

    Ok(tasks)
}
