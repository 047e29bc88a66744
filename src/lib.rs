//! pomotask library
//!
//! This library provides the core functionality for the pomotask CLI.
//! It includes:
//! - Timer engine and the daemon that hosts it
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Key/value persistence, the task list and daily statistics
//! - Completion notifications (native on macOS)
//! - Sound playback for the completion chime and ambient loops

pub mod cli;
pub mod config;
pub mod daemon;
pub mod notification;
pub mod sound;
pub mod stats;
pub mod storage;
pub mod tasks;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    IpcRequest, IpcResponse, ResponseData, TimerConfig, TimerMode, TimerState,
};

pub use config::{AppConfig, AppPaths};

pub use daemon::{
    ClockSource, ClockTick, IntervalClock, ManualClock, StatusSink, TimerEngine, TimerError,
    TimerEvent, TimerSinks,
};

pub use notification::{
    CompletionAlerts, CompletionSink, LogNotifier, MockCompletionSink, NotificationError,
};

pub use sound::{
    AmbientPlayer, AmbientSound, MockSoundPlayer, RodioSoundPlayer, SoundAlert, SoundError,
    SoundPlayer, SoundSource,
};

pub use stats::{DailyLog, ProductivityLog, SessionCounter, SessionTracker, StoredSessionCounter};

pub use storage::{DegradingStore, JsonFileStore, KeyValueStore, MemoryStore, StorageError};

pub use tasks::{Task, TaskError, TaskList};
