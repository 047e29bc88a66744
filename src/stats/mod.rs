//! Session counting and the daily productivity log.
//!
//! Two records are kept in the key/value store:
//!
//! - `productivityLog`: per-day totals (`DailyLog`), keyed by `YYYY-MM-DD`
//! - `sessionTracker`: today's completed focus sessions
//!
//! The timer engine only sees the [`SessionCounter`] trait.

mod daily_log;
mod session;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};

pub use daily_log::{DailyLog, LogDelta, ProductivityLog, PRODUCTIVITY_LOG_KEY};
pub use session::{SessionRecord, SessionTracker, SESSION_TRACKER_KEY};

use crate::storage::{KeyValueStore, StorageError};

// ============================================================================
// Calendar
// ============================================================================

/// Source of the current calendar date.
pub trait Today: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date of the machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalToday;

impl Today for LocalToday {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A settable date, for tests and replays.
#[derive(Debug)]
pub struct FixedToday(Mutex<NaiveDate>);

impl FixedToday {
    pub fn new(date: NaiveDate) -> Self {
        Self(Mutex::new(date))
    }

    /// Moves the calendar to `date`.
    pub fn set(&self, date: NaiveDate) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = date;
    }
}

impl Today for FixedToday {
    fn today(&self) -> NaiveDate {
        *self.0.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Formats a date as the `YYYY-MM-DD` storage key.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ============================================================================
// SessionCounter
// ============================================================================

/// Records completed countdowns to persistent storage.
pub trait SessionCounter: Send + Sync {
    /// Adds one completed focus session to today's totals.
    fn increment_focus_session(&self) -> Result<(), StorageError>;

    /// Adds the minutes of a completed break to today's totals.
    fn record_break(&self, minutes: u32) -> Result<(), StorageError>;
}

/// Session counter backed by the key/value store.
///
/// A focus completion bumps `sessionTracker` and adds one session plus the
/// configured focus minutes to today's `productivityLog` entry, both in one
/// transaction.
pub struct StoredSessionCounter {
    store: Arc<dyn KeyValueStore>,
    tracker: SessionTracker,
    log: ProductivityLog,
    focus_minutes: u32,
}

impl StoredSessionCounter {
    pub fn new(store: Arc<dyn KeyValueStore>, today: Arc<dyn Today>, focus_minutes: u32) -> Self {
        Self {
            tracker: SessionTracker::new(Arc::clone(&store), Arc::clone(&today)),
            log: ProductivityLog::new(Arc::clone(&store), today),
            store,
            focus_minutes,
        }
    }
}

impl SessionCounter for StoredSessionCounter {
    fn increment_focus_session(&self) -> Result<(), StorageError> {
        let delta = LogDelta {
            focus_minutes: self.focus_minutes,
            sessions_completed: 1,
            ..LogDelta::default()
        };

        let mut count = 0;
        self.store.transaction(&mut |entries| {
            count = self.tracker.increment_in(entries)?;
            self.log.record_in(entries, delta)?;
            Ok(())
        })?;
        tracing::info!(sessions_today = count, "集中セッションを記録しました");
        Ok(())
    }

    fn record_break(&self, minutes: u32) -> Result<(), StorageError> {
        self.log.record(LogDelta {
            break_minutes: minutes,
            ..LogDelta::default()
        })?;
        Ok(())
    }
}

/// Mock session counter for testing.
#[derive(Debug, Default)]
pub struct MockSessionCounter {
    focus_sessions: AtomicU32,
    break_minutes: AtomicU32,
    should_fail: AtomicBool,
}

impl MockSessionCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn focus_sessions(&self) -> u32 {
        self.focus_sessions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn break_minutes(&self) -> u32 {
        self.break_minutes.load(Ordering::SeqCst)
    }
}

impl SessionCounter for MockSessionCounter {
    fn increment_focus_session(&self) -> Result<(), StorageError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("Mock failure".to_string()));
        }
        self.focus_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn record_break(&self, minutes: u32) -> Result<(), StorageError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("Mock failure".to_string()));
        }
        self.break_minutes.fetch_add(minutes, Ordering::SeqCst);
        Ok(())
    }
}
