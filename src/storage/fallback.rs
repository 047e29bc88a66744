//! Store that falls back to memory when persistence breaks.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use super::{Entries, KeyValueStore, MemoryStore, StorageError};

/// Wraps a persistent store and degrades to memory-only on the first failure.
///
/// Once degraded, every later read and write is served from memory for the
/// rest of the process, so callers keep working with session-local data.
pub struct DegradingStore {
    primary: Box<dyn KeyValueStore>,
    memory: MemoryStore,
    degraded: AtomicBool,
}

impl DegradingStore {
    pub fn new(primary: impl KeyValueStore + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            memory: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Returns true once the store switched to memory-only mode.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn degrade(&self, error: &StorageError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!("永続ストレージが使えないため、このセッションはメモリ上で動作します: {}", error);
        }
    }
}

impl KeyValueStore for DegradingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.is_degraded() {
            return self.memory.get(key);
        }

        match self.primary.get(key) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.degrade(&e);
                self.memory.get(key)
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.is_degraded() {
            return self.memory.set(key, value);
        }

        match self.primary.set(key, value) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.degrade(&e);
                self.memory.set(key, value)
            }
        }
    }

    fn transaction(
        &self,
        apply: &mut dyn FnMut(&mut Entries) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        if self.is_degraded() {
            return self.memory.transaction(apply);
        }

        // Errors raised by `apply` are the caller's, not the backing store's
        let mut rejected = false;
        let result = self.primary.transaction(&mut |entries| {
            let outcome = apply(entries);
            rejected = outcome.is_err();
            outcome
        });

        match result {
            Ok(()) => Ok(()),
            Err(e) if rejected => Err(e),
            Err(e) => {
                self.degrade(&e);
                self.memory.transaction(apply)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A store whose every call fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn transaction(
            &self,
            _apply: &mut dyn FnMut(&mut Entries) -> Result<(), StorageError>,
        ) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_healthy_primary_is_used() {
        let store = DegradingStore::new(MemoryStore::new());

        store.set("k", "v").unwrap();

        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        assert!(!store.is_degraded());
    }

    #[test]
    fn test_broken_primary_degrades_to_memory() {
        let store = DegradingStore::new(BrokenStore);

        assert_eq!(store.get("tasks").unwrap(), None);
        assert!(store.is_degraded());

        store.set("tasks", "[1]").unwrap();
        assert_eq!(store.get("tasks").unwrap(), Some("[1]".to_string()));
    }

    #[test]
    fn test_write_failure_keeps_value_in_memory() {
        let store = DegradingStore::new(BrokenStore);

        store.set("sessionTracker", "{}").unwrap();

        assert!(store.is_degraded());
        assert_eq!(store.get("sessionTracker").unwrap(), Some("{}".to_string()));
    }

    #[test]
    fn test_failed_transaction_runs_in_memory() {
        let store = DegradingStore::new(BrokenStore);

        store
            .transaction(&mut |entries| {
                entries.insert("sessionTracker".to_string(), "{}".to_string());
                Ok(())
            })
            .unwrap();

        assert!(store.is_degraded());
        assert_eq!(store.get("sessionTracker").unwrap(), Some("{}".to_string()));
    }

    #[test]
    fn test_rejected_transaction_does_not_degrade() {
        let store = DegradingStore::new(MemoryStore::new());

        let result = store.transaction(&mut |_entries| {
            Err(StorageError::Unavailable("rejected by caller".to_string()))
        });

        assert!(result.is_err());
        assert!(!store.is_degraded());
    }
}
