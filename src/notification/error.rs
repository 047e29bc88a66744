//! Notification system error types.
//!
//! From the timer's point of view every variant means "sink unavailable":
//! the error is logged and the countdown carries on.

use thiserror::Error;

use crate::sound::SoundError;

/// Errors that can occur while alerting the user about a completion.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Failed to request notification authorization from the system.
    #[error("通知許可の取得に失敗しました: {0}")]
    AuthorizationFailed(String),

    /// Failed to send a notification.
    #[error("通知の送信に失敗しました: {0}")]
    SendFailed(String),

    /// Notification permission was denied by the user.
    #[error("通知許可が拒否されています")]
    PermissionDenied,

    /// The process has no app bundle, which the notification center requires.
    #[error("アプリバンドル外では通知センターを利用できません")]
    NoBundle,

    /// The notification center is not available on this platform.
    #[error("通知センターが利用できません")]
    NotAvailable,

    /// The completion chime could not be played.
    #[error("完了音を再生できませんでした: {0}")]
    Sound(#[from] SoundError),
}

impl NotificationError {
    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::AuthorizationFailed(_) | Self::PermissionDenied => {
                "システム環境設定 > 通知 でアプリの通知を許可してください"
            }
            Self::SendFailed(_) => "通知センターを確認してください",
            Self::NoBundle => "デーモンは --no-notify で起動し、ログで完了を確認してください",
            Self::NotAvailable => "macOSで実行してください",
            Self::Sound(_) => "サウンド出力デバイスを確認してください",
        }
    }
}
