//! Daily productivity log.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{date_key, Today};
use crate::storage::{load_json, read_entry, write_entry, Entries, KeyValueStore, StorageError};

/// Storage key of the productivity log.
pub const PRODUCTIVITY_LOG_KEY: &str = "productivityLog";

/// Totals for one calendar day. All counters only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub date: String,
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub sessions_completed: u32,
    pub tasks_completed: u32,
}

impl DailyLog {
    fn empty(date: String) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    fn apply(&mut self, delta: &LogDelta) {
        self.focus_minutes = self.focus_minutes.saturating_add(delta.focus_minutes);
        self.break_minutes = self.break_minutes.saturating_add(delta.break_minutes);
        self.sessions_completed = self.sessions_completed.saturating_add(delta.sessions_completed);
        self.tasks_completed = self.tasks_completed.saturating_add(delta.tasks_completed);
    }
}

/// Amounts to add to today's entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogDelta {
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub sessions_completed: u32,
    pub tasks_completed: u32,
}

/// Per-day totals stored under [`PRODUCTIVITY_LOG_KEY`].
///
/// A corrupt stored log is logged and treated as empty, so the next record
/// starts it over.
pub struct ProductivityLog {
    store: Arc<dyn KeyValueStore>,
    today: Arc<dyn Today>,
}

impl ProductivityLog {
    pub fn new(store: Arc<dyn KeyValueStore>, today: Arc<dyn Today>) -> Self {
        Self { store, today }
    }

    fn load(&self) -> Result<BTreeMap<String, DailyLog>, StorageError> {
        Ok(load_json(self.store.as_ref(), PRODUCTIVITY_LOG_KEY)?.unwrap_or_default())
    }

    /// Adds `delta` to today's entry, creating it on first write.
    pub fn record(&self, delta: LogDelta) -> Result<DailyLog, StorageError> {
        let mut updated = None;
        self.store.transaction(&mut |entries| {
            updated = Some(self.record_in(entries, delta)?);
            Ok(())
        })?;
        updated.ok_or_else(|| StorageError::Unavailable("更新が適用されませんでした".to_string()))
    }

    /// Adds `delta` to today's entry inside a running transaction.
    pub fn record_in(&self, entries: &mut Entries, delta: LogDelta) -> Result<DailyLog, StorageError> {
        let key = date_key(self.today.today());
        let mut logs: BTreeMap<String, DailyLog> =
            read_entry(entries, PRODUCTIVITY_LOG_KEY).unwrap_or_default();

        let entry = logs
            .entry(key.clone())
            .or_insert_with(|| DailyLog::empty(key));
        entry.apply(&delta);
        let updated = entry.clone();

        write_entry(entries, PRODUCTIVITY_LOG_KEY, &logs)?;
        Ok(updated)
    }

    /// Returns the entry for `date`, if anything was recorded that day.
    pub fn day(&self, date: NaiveDate) -> Result<Option<DailyLog>, StorageError> {
        Ok(self.load()?.remove(&date_key(date)))
    }

    /// Returns the last `days` days ending today, oldest first.
    ///
    /// Days without records are returned as zeroed entries.
    pub fn recent(&self, days: u32) -> Result<Vec<DailyLog>, StorageError> {
        let logs = self.load()?;
        let today = self.today.today();

        let entries = (0..days)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
            .map(|date| {
                let key = date_key(date);
                logs.get(&key)
                    .cloned()
                    .unwrap_or_else(|| DailyLog::empty(key))
            })
            .collect();
        Ok(entries)
    }
}
