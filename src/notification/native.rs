//! Notification Center backed completion sink.

use tracing::info;

use super::center::NotificationCenter;
use super::content::NotificationContentBuilder;
use super::error::NotificationError;
use super::request::create_notification_request;
use super::CompletionSink;
use crate::types::TimerMode;

/// Posts completions to the macOS Notification Center.
#[derive(Debug)]
pub struct NativeNotifier {
    _private: (),
}

impl NativeNotifier {
    /// Requests authorization and returns a notifier if it was granted.
    pub async fn connect() -> Result<Self, NotificationError> {
        let granted = NotificationCenter::request_authorization().await?;
        if !granted {
            return Err(NotificationError::PermissionDenied);
        }
        info!("通知センターに接続しました");
        Ok(Self { _private: () })
    }
}

impl CompletionSink for NativeNotifier {
    fn notify_completion(
        &self,
        _mode: TimerMode,
        title: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        let content = NotificationContentBuilder::new()
            .title(title)
            .body(body)
            .default_sound()
            .build();
        let request = create_notification_request(&content);
        NotificationCenter::post(&request)
    }
}
