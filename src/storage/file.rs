//! JSON file backed key/value store.
//!
//! The whole store is one JSON object (`{"key": "value", ...}`) so that the
//! daemon and the CLI can share it. Writers serialize on an exclusive lock of
//! the sibling `<name>.lock` file, re-read the document, apply their change
//! and replace the document through a fresh temporary file.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{Entries, KeyValueStore, StorageError};

/// Key/value store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Blocks until this process holds the writer lock. Released on drop.
    fn lock(&self) -> Result<File, StorageError> {
        fs::create_dir_all(self.directory())?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path.with_extension("lock"))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read_document(&self) -> Result<Entries, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn write_document(&self, document: &Entries) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(document)?;

        let mut tmp = NamedTempFile::new_in(self.directory())?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::from(e.error))?;

        debug!(path = %self.path.display(), "storage written");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        // Writers replace the file atomically, so reads need no lock
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.transaction(&mut |entries| {
            entries.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn transaction(
        &self,
        apply: &mut dyn FnMut(&mut Entries) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        let _lock = self.lock()?;

        let mut document = self.read_document()?;
        let before = document.clone();
        apply(&mut document)?;

        if document != before {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("storage.json"));

        assert_eq!(store.get("tasks").unwrap(), None);
    }

    #[test]
    fn test_set_creates_parent_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let store = JsonFileStore::new(&path);

        store.set("tasks", "[]").unwrap();
        store.set("sessionTracker", r#"{"date":"2024-01-01","count":1}"#).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("tasks").unwrap(), Some("[]".to_string()));
        assert_eq!(
            reopened.get("sessionTracker").unwrap(),
            Some(r#"{"date":"2024-01-01","count":1}"#.to_string())
        );
    }

    #[test]
    fn test_other_keys_survive_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let daemon_view = JsonFileStore::new(&path);
        let cli_view = JsonFileStore::new(&path);

        daemon_view.set("productivityLog", "{}").unwrap();
        cli_view.set("tasks", "[]").unwrap();

        assert_eq!(daemon_view.get("productivityLog").unwrap(), Some("{}".to_string()));
        assert_eq!(daemon_view.get("tasks").unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn test_corrupted_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get("tasks"),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_unwritable_location_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let store = JsonFileStore::new(blocker.join("storage.json"));
        let err = store.set("tasks", "[]").unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_rejected_transaction_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let store = JsonFileStore::new(&path);
        store.set("tasks", "[]").unwrap();

        let result = store.transaction(&mut |entries| {
            entries.insert("tasks".to_string(), "[1]".to_string());
            Err(StorageError::Unavailable("rejected".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.get("tasks").unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn test_concurrent_writers_on_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let errors: Vec<StorageError> = thread::scope(|scope| {
            let workers: Vec<_> = ["daemon", "cli"]
                .into_iter()
                .map(|writer| {
                    let store = JsonFileStore::new(&path);
                    scope.spawn(move || {
                        let mut errors = Vec::new();
                        for i in 0..300 {
                            let key = format!("{writer}-{i}");
                            if let Err(e) = store.set(&key, "1") {
                                errors.push(e);
                            }
                            if let Err(e) = store.get(&key) {
                                errors.push(e);
                            }
                        }
                        errors
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect()
        });

        assert!(errors.is_empty(), "errors: {:?}", errors);
        let document = JsonFileStore::new(&path).read_document().unwrap();
        assert_eq!(document.len(), 600);
    }

    #[test]
    fn test_concurrent_read_modify_write_keeps_every_increment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        thread::scope(|scope| {
            for _ in 0..2 {
                let store = JsonFileStore::new(&path);
                scope.spawn(move || {
                    for _ in 0..200 {
                        store
                            .transaction(&mut |entries| {
                                let count: u32 = entries
                                    .get("count")
                                    .and_then(|raw| raw.parse().ok())
                                    .unwrap_or(0);
                                entries.insert("count".to_string(), (count + 1).to_string());
                                Ok(())
                            })
                            .unwrap();
                    }
                });
            }
        });

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("count").unwrap(), Some("400".to_string()));
    }
}
