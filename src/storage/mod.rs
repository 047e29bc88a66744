//! Key/value persistence port.
//!
//! Everything the timer persists (daily log, session tracker, task list) goes
//! through [`KeyValueStore`], a string-keyed store of string values:
//!
//! - `JsonFileStore`: a single JSON document on disk, shared by processes
//! - `MemoryStore`: process-local map, used in tests and as fallback
//! - `DegradingStore`: file-backed until storage fails, then memory-only
//!
//! Read-modify-write updates go through [`KeyValueStore::transaction`], so
//! the daemon and CLI commands never lose each other's increments.

mod error;
mod fallback;
mod file;
mod memory;

pub use error::StorageError;
pub use fallback::DegradingStore;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// All entries of a store, as seen inside a transaction.
pub type Entries = BTreeMap<String, String>;

/// A string-keyed store of string values.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Runs `apply` on the current entries and commits its changes as one write.
    ///
    /// No other writer can interleave between the read and the commit. When
    /// `apply` returns an error nothing is committed and the error is returned
    /// unchanged. `apply` may run more than once if the store has to retry.
    fn transaction(
        &self,
        apply: &mut dyn FnMut(&mut Entries) -> Result<(), StorageError>,
    ) -> Result<(), StorageError>;
}

fn parse_json<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, "保存データが破損しているため空として扱います: {}", e);
            None
        }
    }
}

/// Reads and deserializes the JSON value stored under `key`.
///
/// A value that does not parse is logged and read as missing.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    Ok(store.get(key)?.and_then(|raw| parse_json(key, &raw)))
}

/// Transaction counterpart of [`load_json`].
pub fn read_entry<T: DeserializeOwned>(entries: &Entries, key: &str) -> Option<T> {
    entries.get(key).and_then(|raw| parse_json(key, raw))
}

/// Serializes `value` as JSON into the transaction's entries.
pub fn write_entry<T: Serialize>(
    entries: &mut Entries,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    entries.insert(key.to_string(), serde_json::to_string(value)?);
    Ok(())
}
