//! Title/status sinks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;


/// Receives the formatted title line after every state change and tick.
pub trait StatusSink: Send + Sync {
    fn publish(&self, title: &str) -> io::Result<()>;
}

/// Writes the current title to a file, replacing it atomically.
///
/// Shell prompts and status bars can `cat` the file.
#[derive(Debug, Clone)]
pub struct StatusFileSink {
    path: PathBuf,
}

impl StatusFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the status file, ignoring a missing one.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl StatusSink for StatusFileSink {
    fn publish(&self, title: &str) -> io::Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, format!("{title}\n"))?;
        fs::rename(&tmp, &self.path)
    }
}

/// Mock status sink for testing.
#[derive(Debug, Default)]
pub struct MockStatusSink {
    titles: Mutex<Vec<String>>,
}

impl MockStatusSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every title published so far.
    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn last(&self) -> Option<String> {
        self.titles().pop()
    }
}

impl StatusSink for MockStatusSink {
    fn publish(&self, title: &str) -> io::Result<()> {
        self.titles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(title.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StatusFileSink::new(dir.path().join("status"));

        sink.publish("25:00 - Focus Mode 🍅").unwrap();
        sink.publish("💻 24:59 - Focus").unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "💻 24:59 - Focus\n");
    }

    #[test]
    fn test_file_sink_clear() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StatusFileSink::new(dir.path().join("status"));

        sink.clear().unwrap();
        sink.publish("x").unwrap();
        sink.clear().unwrap();

        assert!(!sink.path().exists());
    }

    #[test]
    fn test_file_sink_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StatusFileSink::new(dir.path().join("missing").join("status"));
        assert!(sink.publish("x").is_err());
    }

    #[test]
    fn test_mock_sink_records() {
        let sink = MockStatusSink::new();
        sink.publish("a").unwrap();
        sink.publish("b").unwrap();
        assert_eq!(sink.titles(), vec!["a", "b"]);
        assert_eq!(sink.last().as_deref(), Some("b"));
    }
}
