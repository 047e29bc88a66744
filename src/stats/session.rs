//! Today's focus-session counter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{date_key, Today};
use crate::storage::{load_json, read_entry, write_entry, Entries, KeyValueStore, StorageError};

/// Storage key of the session tracker.
pub const SESSION_TRACKER_KEY: &str = "sessionTracker";

/// Stored form of the tracker: the count belongs to `date` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: String,
    pub count: u32,
}

/// Counts completed focus sessions for the current calendar day.
pub struct SessionTracker {
    store: Arc<dyn KeyValueStore>,
    today: Arc<dyn Today>,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, today: Arc<dyn Today>) -> Self {
        Self { store, today }
    }

    /// Keeps `record` if it belongs to today, otherwise starts today at zero.
    fn for_today(&self, record: Option<SessionRecord>) -> SessionRecord {
        let today = date_key(self.today.today());
        match record {
            Some(record) if record.date == today => record,
            // Rolled over to a new day, or nothing readable was stored
            _ => SessionRecord {
                date: today,
                count: 0,
            },
        }
    }

    /// Returns today's count. A record from another day counts as zero.
    pub fn count_today(&self) -> Result<u32, StorageError> {
        let record = load_json(self.store.as_ref(), SESSION_TRACKER_KEY)?;
        Ok(self.for_today(record).count)
    }

    /// Adds one session inside a running transaction and returns the new count.
    pub fn increment_in(&self, entries: &mut Entries) -> Result<u32, StorageError> {
        let mut record = self.for_today(read_entry(entries, SESSION_TRACKER_KEY));
        record.count = record.count.saturating_add(1);
        write_entry(entries, SESSION_TRACKER_KEY, &record)?;
        Ok(record.count)
    }
}
