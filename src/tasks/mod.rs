//! Task list stored under the `tasks` key.
//!
//! The list is kept newest first. Completing a task counts towards today's
//! `tasksCompleted` in the productivity log, in the same transaction as the
//! list change.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::{LogDelta, ProductivityLog, Today};
use crate::storage::{load_json, read_entry, write_entry, Entries, KeyValueStore, StorageError};

/// Storage key of the task list.
pub const TASKS_KEY: &str = "tasks";

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Creation time in milliseconds since the Unix epoch, unique per list.
    pub id: i64,
    pub text: String,
    pub done: bool,
}

/// Task list errors.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("タスクの内容が空です")]
    EmptyText,

    #[error("タスクが見つかりません: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of [`TaskList::edit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated(Task),
    /// The new text was empty, so the task was deleted.
    Removed,
}

/// Task list backed by the key/value store.
///
/// A corrupt stored list is logged and read as empty.
pub struct TaskList {
    store: Arc<dyn KeyValueStore>,
    log: Option<ProductivityLog>,
}

impl TaskList {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, log: None }
    }

    /// Counts completed tasks in the productivity log of the same store.
    #[must_use]
    pub fn with_daily_log(mut self, today: Arc<dyn Today>) -> Self {
        self.log = Some(ProductivityLog::new(Arc::clone(&self.store), today));
        self
    }

    /// Returns all tasks, newest first.
    pub fn list(&self) -> Result<Vec<Task>, TaskError> {
        Ok(load_json(self.store.as_ref(), TASKS_KEY)?.unwrap_or_default())
    }

    /// Applies `change` to the stored list and commits it with any other
    /// entries it touched. Nothing is written when `change` fails.
    fn modify<R>(
        &self,
        mut change: impl FnMut(&mut Vec<Task>, &mut Entries) -> Result<R, TaskError>,
    ) -> Result<R, TaskError> {
        let mut outcome = None;
        let committed = self.store.transaction(&mut |entries| {
            let mut tasks: Vec<Task> = read_entry(entries, TASKS_KEY).unwrap_or_default();
            match change(&mut tasks, entries) {
                Ok(value) => {
                    write_entry(entries, TASKS_KEY, &tasks)?;
                    outcome = Some(Ok(value));
                    Ok(())
                }
                Err(TaskError::Storage(e)) => Err(e),
                Err(e) => {
                    // Abort the commit, keep the task error for the caller
                    outcome = Some(Err(e));
                    Err(StorageError::Unavailable("aborted".to_string()))
                }
            }
        });

        match (committed, outcome) {
            (_, Some(Err(e))) => Err(e),
            (Err(e), _) => Err(e.into()),
            (Ok(()), Some(Ok(value))) => Ok(value),
            (Ok(()), None) => {
                Err(StorageError::Unavailable("更新が適用されませんでした".to_string()).into())
            }
        }
    }

    /// Adds a task with the trimmed `text` at the top of the list.
    pub fn add(&self, text: &str) -> Result<Task, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }

        self.modify(|tasks, _| {
            let next_id = tasks.iter().map(|t| t.id.saturating_add(1)).max().unwrap_or(i64::MIN);
            let task = Task {
                id: Utc::now().timestamp_millis().max(next_id),
                text: text.to_string(),
                done: false,
            };
            tasks.insert(0, task.clone());
            Ok(task)
        })
    }

    /// Flips the done flag of task `id`.
    pub fn toggle(&self, id: i64) -> Result<Task, TaskError> {
        self.modify(|tasks, entries| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(TaskError::NotFound(id))?;
            task.done = !task.done;
            let toggled = task.clone();

            if toggled.done {
                if let Some(log) = &self.log {
                    log.record_in(
                        entries,
                        LogDelta {
                            tasks_completed: 1,
                            ..LogDelta::default()
                        },
                    )?;
                }
            }
            Ok(toggled)
        })
    }

    /// Deletes task `id`.
    pub fn remove(&self, id: i64) -> Result<Task, TaskError> {
        self.modify(|tasks, _| {
            let index = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(TaskError::NotFound(id))?;
            Ok(tasks.remove(index))
        })
    }

    /// Replaces the text of task `id`. Empty text removes the task.
    pub fn edit(&self, id: i64, text: &str) -> Result<EditOutcome, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            self.remove(id)?;
            return Ok(EditOutcome::Removed);
        }

        self.modify(|tasks, _| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(TaskError::NotFound(id))?;
            task.text = text.to_string();
            Ok(EditOutcome::Updated(task.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::FixedToday;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    fn create_list() -> (TaskList, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (TaskList::new(store.clone()), store)
    }

    // ========================================================================
    // Add Tests
    // ========================================================================

    mod add_tests {
        use super::*;

        #[test]
        fn test_add_trims_and_prepends() {
            let (list, _store) = create_list();

            list.add("first").unwrap();
            let second = list.add("  second  ").unwrap();

            let tasks = list.list().unwrap();
            assert_eq!(tasks.len(), 2);
            assert_eq!(tasks[0].text, "second");
            assert_eq!(tasks[0].id, second.id);
            assert_eq!(tasks[1].text, "first");
            assert!(!tasks[0].done);
        }

        #[test]
        fn test_add_rejects_blank_text() {
            let (list, _store) = create_list();

            assert!(matches!(list.add("   "), Err(TaskError::EmptyText)));
            assert!(list.list().unwrap().is_empty());
        }

        #[test]
        fn test_ids_are_unique_and_increasing() {
            let (list, _store) = create_list();

            let a = list.add("a").unwrap();
            let b = list.add("b").unwrap();
            let c = list.add("c").unwrap();

            assert!(b.id > a.id);
            assert!(c.id > b.id);
        }

        #[test]
        fn test_ids_stay_above_future_ids() {
            let (list, store) = create_list();
            let far_future = i64::MAX / 2;
            store
                .set(TASKS_KEY, &format!(r#"[{{"id":{},"text":"x","done":false}}]"#, far_future))
                .unwrap();

            let task = list.add("y").unwrap();
            assert_eq!(task.id, far_future + 1);
        }
    }

    // ========================================================================
    // Update Tests
    // ========================================================================

    mod update_tests {
        use super::*;

        #[test]
        fn test_toggle_flips_done() {
            let (list, _store) = create_list();
            let task = list.add("write report").unwrap();

            assert!(list.toggle(task.id).unwrap().done);
            assert!(!list.toggle(task.id).unwrap().done);
        }

        #[test]
        fn test_toggle_unknown_id() {
            let (list, _store) = create_list();
            assert!(matches!(list.toggle(42), Err(TaskError::NotFound(42))));
        }

        #[test]
        fn test_remove() {
            let (list, _store) = create_list();
            let keep = list.add("keep").unwrap();
            let gone = list.add("gone").unwrap();

            let removed = list.remove(gone.id).unwrap();

            assert_eq!(removed.text, "gone");
            assert_eq!(list.list().unwrap(), vec![keep]);
            assert!(matches!(list.remove(gone.id), Err(TaskError::NotFound(_))));
        }

        #[test]
        fn test_edit_updates_text() {
            let (list, _store) = create_list();
            let task = list.add("draft").unwrap();

            let outcome = list.edit(task.id, " final ").unwrap();

            match outcome {
                EditOutcome::Updated(updated) => assert_eq!(updated.text, "final"),
                EditOutcome::Removed => panic!("Expected Updated"),
            }
        }

        #[test]
        fn test_edit_to_empty_removes() {
            let (list, _store) = create_list();
            let task = list.add("draft").unwrap();

            assert_eq!(list.edit(task.id, "  ").unwrap(), EditOutcome::Removed);
            assert!(list.list().unwrap().is_empty());
        }
    }

    // ========================================================================
    // Storage Tests
    // ========================================================================

    mod storage_tests {
        use super::*;

        #[test]
        fn test_stored_layout() {
            let (list, store) = create_list();
            let task = list.add("read").unwrap();

            let raw = store.get(TASKS_KEY).unwrap().unwrap();
            assert_eq!(
                raw,
                format!(r#"[{{"id":{},"text":"read","done":false}}]"#, task.id)
            );
        }

        #[test]
        fn test_corrupt_tasks_read_as_empty() {
            let (list, store) = create_list();
            store.set(TASKS_KEY, "{oops").unwrap();

            assert!(list.list().unwrap().is_empty());
            list.add("recovered").unwrap();
            assert_eq!(list.list().unwrap().len(), 1);
        }

        #[test]
        fn test_completing_task_updates_daily_log() {
            let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
            let day = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
            let today = Arc::new(FixedToday::new(day));
            let list = TaskList::new(Arc::clone(&store)).with_daily_log(today.clone());
            let task = list.add("ship").unwrap();

            list.toggle(task.id).unwrap();
            // Un-completing does not subtract
            list.toggle(task.id).unwrap();

            let log = ProductivityLog::new(store, today);
            assert_eq!(log.day(day).unwrap().unwrap().tasks_completed, 1);
        }

        #[test]
        fn test_unknown_id_writes_nothing() {
            let (list, store) = create_list();
            list.add("only").unwrap();
            let before = store.get(TASKS_KEY).unwrap();

            assert!(matches!(list.toggle(7), Err(TaskError::NotFound(7))));
            assert!(matches!(list.edit(7, "x"), Err(TaskError::NotFound(7))));
            assert_eq!(store.get(TASKS_KEY).unwrap(), before);
        }

        #[test]
        fn test_lists_on_one_file_keep_every_task() {
            use crate::storage::{DegradingStore, JsonFileStore};

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("storage.json");

            std::thread::scope(|scope| {
                for writer in ["daemon", "cli"] {
                    let list = TaskList::new(Arc::new(DegradingStore::new(JsonFileStore::new(&path))));
                    scope.spawn(move || {
                        for i in 0..50 {
                            list.add(&format!("{writer} {i}")).unwrap();
                        }
                    });
                }
            });

            let list = TaskList::new(Arc::new(JsonFileStore::new(&path)));
            let tasks = list.list().unwrap();
            assert_eq!(tasks.len(), 100);
            let mut ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), 100);
        }
    }
}
