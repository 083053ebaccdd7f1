use crate::clock::{Clock, SystemClock};
use crate::error::AppError;
use crate::model::{Filter, Task, TaskId};
use crate::reminder::ReminderScheduler;
use crate::storage::{self, KeyValueStore, TASKS_KEY};
use tracing::{debug, warn};

/// Owns the task collection and the active filter. Every state change is
/// written back to the `todos` slot as a full snapshot.
pub struct TaskStore {
    tasks: Vec<Task>,
    filter: Filter,
    last_id: TaskId,
    storage: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    reminders: Option<ReminderScheduler>,
}

impl TaskStore {
    /// Rehydrates from `storage`; a missing or unreadable snapshot yields an
    /// empty collection.
    pub fn open(storage: impl KeyValueStore + 'static) -> Self {
        let tasks = match load_snapshot(&storage) {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(error = %err, "discarding unreadable task snapshot");
                Vec::new()
            }
        };
        let last_id = tasks.iter().map(|task| task.id).max().unwrap_or(0);
        debug!(count = tasks.len(), "task store opened");

        Self {
            tasks,
            filter: Filter::All,
            last_id,
            storage: Box::new(storage),
            clock: Box::new(SystemClock),
            reminders: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Deleting a task cancels its pending reminder on `reminders`.
    pub fn with_reminders(mut self, reminders: ReminderScheduler) -> Self {
        self.reminders = Some(reminders);
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .collect()
    }

    pub fn remaining_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.completed).count()
    }

    /// Blank text is ignored and yields `Ok(None)`.
    pub fn add(&mut self, text: &str) -> Result<Option<Task>, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let task = Task::new(self.next_id()?, trimmed);
        self.tasks.push(task.clone());
        debug!(task_id = task.id, "task added");
        self.persist()?;

        Ok(Some(task))
    }

    pub fn toggle(&mut self, id: TaskId) -> Result<Option<Task>, AppError> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };

        task.completed = !task.completed;
        let updated = task.clone();
        debug!(task_id = id, completed = updated.completed, "task toggled");
        self.persist()?;

        Ok(Some(updated))
    }

    /// Blank text leaves the existing text in place.
    pub fn edit(&mut self, id: TaskId, new_text: &str) -> Result<Option<Task>, AppError> {
        let trimmed = new_text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };

        task.text = trimmed.to_string();
        let updated = task.clone();
        debug!(task_id = id, "task edited");
        self.persist()?;

        Ok(Some(updated))
    }

    pub fn delete(&mut self, id: TaskId) -> Result<Option<Task>, AppError> {
        // Cancel first so no reminder can outlive its task, even a stray one.
        if let Some(reminders) = &self.reminders {
            reminders.cancel(id);
        }

        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            return Ok(None);
        };

        let removed = self.tasks.remove(index);
        debug!(task_id = id, "task deleted");
        self.persist()?;

        Ok(Some(removed))
    }

    /// Removes every completed task, returning them in collection order.
    pub fn clear_completed(&mut self) -> Result<Vec<Task>, AppError> {
        let (removed, kept): (Vec<Task>, Vec<Task>) =
            self.tasks.drain(..).partition(|task| task.completed);
        self.tasks = kept;

        if removed.is_empty() {
            return Ok(removed);
        }

        if let Some(reminders) = &self.reminders {
            for task in &removed {
                reminders.cancel(task.id);
            }
        }
        debug!(count = removed.len(), "completed tasks cleared");
        self.persist()?;

        Ok(removed)
    }

    fn next_id(&mut self) -> Result<TaskId, AppError> {
        let successor = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| AppError::invalid_data("task ids exhausted"))?;
        let id = self.clock.now_millis().max(successor);
        self.last_id = id;
        Ok(id)
    }

    fn persist(&mut self) -> Result<(), AppError> {
        let snapshot = storage::encode_tasks(&self.tasks)?;
        self.storage.set(TASKS_KEY, &snapshot).map_err(|err| {
            warn!(error = %err, "failed to persist tasks");
            err
        })
    }
}

fn load_snapshot(storage: &dyn KeyValueStore) -> Result<Vec<Task>, AppError> {
    match storage.get(TASKS_KEY)? {
        Some(content) => storage::decode_tasks(&content),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStore;
    use crate::clock::Clock;
    use crate::error::AppError;
    use crate::model::{Filter, Task};
    use crate::storage::{KeyValueStore, MemoryStore, TASKS_KEY, decode_tasks};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock that stays on the same millisecond until told otherwise.
    #[derive(Clone)]
    struct FrozenClock(Arc<AtomicU64>);

    impl FrozenClock {
        fn at(millis: u64) -> Self {
            Self(Arc::new(AtomicU64::new(millis)))
        }

        fn set(&self, millis: u64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for FrozenClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::io("disk unplugged"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::io("disk unplugged"))
        }
    }

    fn stored(memory: &MemoryStore) -> Vec<Task> {
        decode_tasks(&memory.value(TASKS_KEY).unwrap()).unwrap()
    }

    fn texts(store: &TaskStore) -> Vec<&str> {
        store
            .visible_tasks()
            .into_iter()
            .map(|task| task.text.as_str())
            .collect()
    }

    #[test]
    fn add_trims_and_persists() {
        let memory = MemoryStore::new();
        let mut store = TaskStore::open(memory.clone()).with_clock(FrozenClock::at(1_000));

        let task = store.add("  Buy milk ").unwrap().unwrap();

        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.id, 1_000);
        assert_eq!(stored(&memory), vec![task]);
    }

    #[test]
    fn add_ignores_blank_text() {
        let memory = MemoryStore::new();
        let mut store = TaskStore::open(memory.clone());

        assert_eq!(store.add("").unwrap(), None);
        assert_eq!(store.add("   ").unwrap(), None);

        assert!(store.is_empty());
        assert_eq!(memory.value(TASKS_KEY), None);
    }

    #[test]
    fn ids_stay_unique_when_clock_stalls_or_rewinds() {
        let clock = FrozenClock::at(5_000);
        let mut store = TaskStore::open(MemoryStore::new()).with_clock(clock.clone());

        let a = store.add("a").unwrap().unwrap();
        let b = store.add("b").unwrap().unwrap();
        clock.set(10);
        let c = store.add("c").unwrap().unwrap();

        assert_eq!((a.id, b.id, c.id), (5_000, 5_001, 5_002));
    }

    #[test]
    fn deleted_ids_are_not_reissued() {
        let clock = FrozenClock::at(100);
        let mut store = TaskStore::open(MemoryStore::new()).with_clock(clock);

        let first = store.add("first").unwrap().unwrap();
        store.delete(first.id).unwrap();
        let second = store.add("second").unwrap().unwrap();

        assert!(second.id > first.id);
    }

    #[test]
    fn ids_continue_after_rehydrated_tasks() {
        let memory = MemoryStore::with_value(
            TASKS_KEY,
            r#"[{"id": 9000, "text": "old", "completed": false}]"#,
        );
        let mut store = TaskStore::open(memory).with_clock(FrozenClock::at(1));

        let task = store.add("new").unwrap().unwrap();
        assert_eq!(task.id, 9001);
    }

    #[test]
    fn toggle_twice_restores_original() {
        let mut store = TaskStore::open(MemoryStore::new());
        let task = store.add("demo").unwrap().unwrap();

        assert!(store.toggle(task.id).unwrap().unwrap().completed);
        assert!(!store.toggle(task.id).unwrap().unwrap().completed);
        assert_eq!(store.tasks(), &[task]);
    }

    #[test]
    fn unknown_ids_leave_state_untouched() {
        let memory = MemoryStore::new();
        let mut store = TaskStore::open(memory.clone());
        store.add("demo").unwrap();
        let before = store.tasks().to_vec();
        let snapshot = memory.value(TASKS_KEY);

        assert_eq!(store.toggle(42).unwrap(), None);
        assert_eq!(store.edit(42, "other").unwrap(), None);
        assert_eq!(store.delete(42).unwrap(), None);

        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(memory.value(TASKS_KEY), snapshot);
    }

    #[test]
    fn edit_trims_and_rejects_blank() {
        let memory = MemoryStore::new();
        let mut store = TaskStore::open(memory.clone());
        let task = store.add("old").unwrap().unwrap();

        assert_eq!(store.edit(task.id, "").unwrap(), None);
        assert_eq!(store.get(task.id).unwrap().text, "old");

        let edited = store.edit(task.id, "  new ").unwrap().unwrap();
        assert_eq!(edited.text, "new");
        assert_eq!(stored(&memory)[0].text, "new");
    }

    #[test]
    fn delete_removes_exactly_one_task() {
        let mut store = TaskStore::open(MemoryStore::new());
        let a = store.add("a").unwrap().unwrap();
        let b = store.add("b").unwrap().unwrap();
        let c = store.add("c").unwrap().unwrap();

        let removed = store.delete(b.id).unwrap().unwrap();

        assert_eq!(removed, b);
        assert_eq!(store.tasks(), &[a, c]);
    }

    #[test]
    fn filters_scenario() {
        let mut store = TaskStore::open(MemoryStore::new());
        let milk = store.add("Buy milk").unwrap().unwrap();
        store.add("Walk dog").unwrap();
        store.toggle(milk.id).unwrap();

        store.set_filter(Filter::Active);
        assert_eq!(texts(&store), vec!["Walk dog"]);
        assert!(!store.visible_tasks()[0].completed);

        store.set_filter(Filter::Completed);
        assert_eq!(texts(&store), vec!["Buy milk"]);
        assert!(store.visible_tasks()[0].completed);

        store.set_filter(Filter::All);
        assert_eq!(texts(&store), vec!["Buy milk", "Walk dog"]);
    }

    #[test]
    fn remaining_count_matches_active_view() {
        let mut store = TaskStore::open(MemoryStore::new());
        for text in ["a", "b", "c", "d"] {
            store.add(text).unwrap();
        }
        let ids: Vec<_> = store.tasks().iter().map(|task| task.id).collect();
        store.toggle(ids[1]).unwrap();
        store.toggle(ids[3]).unwrap();

        store.set_filter(Filter::Active);
        let active = store.visible_tasks().len();
        store.set_filter(Filter::All);

        assert_eq!(store.remaining_count(), 2);
        assert_eq!(store.remaining_count(), active);
    }

    #[test]
    fn filter_is_not_persisted() {
        let memory = MemoryStore::new();
        let mut store = TaskStore::open(memory.clone());
        store.add("demo").unwrap();
        store.set_filter(Filter::Completed);

        let reopened = TaskStore::open(memory);
        assert_eq!(reopened.filter(), Filter::All);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn rehydrates_in_stored_order() {
        let memory = MemoryStore::new();
        let mut store = TaskStore::open(memory.clone());
        store.add("first").unwrap();
        let second = store.add("second").unwrap().unwrap();
        store.toggle(second.id).unwrap();

        let reopened = TaskStore::open(memory);
        assert_eq!(reopened.tasks(), store.tasks());
    }

    #[test]
    fn corrupt_snapshot_opens_empty() {
        let memory = MemoryStore::with_value(TASKS_KEY, "{ definitely not json");
        let store = TaskStore::open(memory);
        assert!(store.is_empty());
    }

    #[test]
    fn unreadable_storage_opens_empty_and_reports_writes() {
        let mut store = TaskStore::open(BrokenStore);
        assert!(store.is_empty());

        let err = store.add("demo").unwrap_err();
        assert_eq!(err.code(), "io_error");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_completed_drops_only_completed() {
        let memory = MemoryStore::new();
        let mut store = TaskStore::open(memory.clone());
        let a = store.add("a").unwrap().unwrap();
        let b = store.add("b").unwrap().unwrap();
        store.toggle(a.id).unwrap();

        let removed = store.clear_completed().unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, a.id);
        assert_eq!(store.tasks(), &[b.clone()]);
        assert_eq!(stored(&memory), vec![b]);
        assert!(store.clear_completed().unwrap().is_empty());
    }

    #[test]
    fn snapshot_with_largest_id_opens_empty_and_accepts_adds() {
        let content = format!(r#"[{{"id": {}, "text": "far future", "completed": false}}]"#, u64::MAX);
        let memory = MemoryStore::with_value(TASKS_KEY, &content);
        let mut store = TaskStore::open(memory.clone()).with_clock(FrozenClock::at(5));
        assert!(store.is_empty());

        let task = store.add("new").unwrap().unwrap();

        assert_eq!(task.id, 5);
        assert_eq!(stored(&memory), vec![task]);
    }

    #[test]
    fn add_reports_exhausted_ids_instead_of_overflowing() {
        let mut store = TaskStore::open(MemoryStore::new()).with_clock(FrozenClock::at(u64::MAX));
        let first = store.add("last").unwrap().unwrap();
        assert_eq!(first.id, u64::MAX);

        let err = store.add("one more").unwrap_err();

        assert_eq!(err.code(), "invalid_data");
        assert_eq!(store.len(), 1);
    }
}
