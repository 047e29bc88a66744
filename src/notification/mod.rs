//! Completion notifications.
//!
//! The timer engine talks to a single [`CompletionSink`]. Concrete sinks:
//!
//! - `NativeNotifier`: macOS Notification Center (macOS only)
//! - [`LogNotifier`]: writes the completion to the log
//! - `SoundAlert`: plays the completion chime (see `crate::sound`)
//! - [`CompletionAlerts`]: fans out to several sinks
//!
//! # Requirements (macOS)
//!
//! The notification center only works for processes with an app bundle.
//! A bare binary falls back to [`LogNotifier`].

#[cfg(target_os = "macos")]
mod center;
#[cfg(target_os = "macos")]
mod content;
pub mod error;
#[cfg(target_os = "macos")]
mod native;
#[cfg(target_os = "macos")]
mod request;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

pub use self::error::NotificationError;
#[cfg(target_os = "macos")]
pub use self::native::NativeNotifier;

use crate::types::TimerMode;

// ============================================================================
// CompletionSink
// ============================================================================

/// Alerts the user that a countdown finished.
///
/// Best-effort: the engine logs errors and never retries.
pub trait CompletionSink: Send + Sync {
    fn notify_completion(
        &self,
        mode: TimerMode,
        title: &str,
        body: &str,
    ) -> Result<(), NotificationError>;
}

/// Reports completions through `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl CompletionSink for LogNotifier {
    fn notify_completion(
        &self,
        mode: TimerMode,
        title: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        info!(mode = mode.as_str(), "{} {}", title, body);
        Ok(())
    }
}

/// Delivers a completion to every inner sink.
///
/// Each sink is attempted even when an earlier one fails; the first error is
/// returned after all of them ran.
#[derive(Default)]
pub struct CompletionAlerts {
    sinks: Vec<Arc<dyn CompletionSink>>,
}

impl CompletionAlerts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn CompletionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl CompletionSink for CompletionAlerts {
    fn notify_completion(
        &self,
        mode: TimerMode,
        title: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify_completion(mode, title, body) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Creates the desktop notification sink.
///
/// On macOS this asks for authorization first; if that is denied or fails the
/// daemon keeps running with [`LogNotifier`].
pub async fn create_notifier(enabled: bool) -> Arc<dyn CompletionSink> {
    if !enabled {
        return Arc::new(LogNotifier);
    }

    #[cfg(target_os = "macos")]
    {
        match NativeNotifier::connect().await {
            Ok(notifier) => return Arc::new(notifier),
            Err(e) => {
                warn!("⚠️  通知センターを使用できません: {}", e);
                info!("{}", e.suggestion());
            }
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        let e = NotificationError::NotAvailable;
        warn!("⚠️  {}。完了はログに出力します", e);
    }

    Arc::new(LogNotifier)
}

// ============================================================================
// Mock
// ============================================================================

/// One recorded call to [`MockCompletionSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCall {
    pub mode: TimerMode,
    pub title: String,
    pub body: String,
}

/// Mock completion sink for testing.
#[derive(Debug, Default)]
pub struct MockCompletionSink {
    calls: Mutex<Vec<CompletionCall>>,
    should_fail: AtomicBool,
}

impl MockCompletionSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call record nothing and fail.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl CompletionSink for MockCompletionSink {
    fn notify_completion(
        &self,
        mode: TimerMode,
        title: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("Mock failure".to_string()));
        }
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(CompletionCall {
                mode,
                title: title.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
