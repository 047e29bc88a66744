//! Storage error types.

use thiserror::Error;

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying storage cannot be used (permissions, disk full, ...).
    #[error("ストレージが利用できません: {0}")]
    Unavailable(String),

    /// A stored value could not be parsed.
    #[error("保存データ '{key}' が破損しています: {reason}")]
    Corrupted {
        /// Key of the broken value
        key: String,
        /// Parser message
        reason: String,
    },

    /// A value could not be serialized.
    #[error("データのシリアライズに失敗しました: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true if the storage itself is inaccessible.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}
