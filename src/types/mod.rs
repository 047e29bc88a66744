//! Core data types for the Pomodoro timer.
//!
//! This module defines the data structures used for:
//! - Timer modes and their notification copy
//! - Timer configuration with validation
//! - Timer state and its primitive transitions
//! - IPC request/response serialization

use serde::{Deserialize, Serialize};

// ============================================================================
// TimerMode
// ============================================================================

/// The kind of interval the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Focused work interval
    Focus,
    /// Short break
    Break,
    /// Long break
    LongBreak,
}

impl TimerMode {
    /// Returns the wire representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::Break => "break",
            TimerMode::LongBreak => "long_break",
        }
    }

    /// Returns the human readable label of the mode.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::Break => "Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    /// Returns the emoji shown in the title while the countdown runs.
    pub fn emoji(&self) -> &'static str {
        match self {
            TimerMode::Focus => "💻",
            TimerMode::Break => "☕",
            TimerMode::LongBreak => "🌿",
        }
    }

    /// Notification title used when a countdown in this mode finishes.
    pub fn completion_title(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus Finished!",
            TimerMode::Break => "Break Finished!",
            TimerMode::LongBreak => "Long Break Finished!",
        }
    }

    /// Notification body used when a countdown in this mode finishes.
    pub fn completion_body(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Time for a short break",
            TimerMode::Break => "Time to get back to focus",
            TimerMode::LongBreak => "Time to get productive again!",
        }
    }

    /// Returns true for the focus mode.
    pub fn is_focus(&self) -> bool {
        matches!(self, TimerMode::Focus)
    }
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::Focus
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// TimerConfig
// ============================================================================

/// Default durations for each mode, fixed at engine construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Focus duration in minutes (1-120)
    pub focus_minutes: u32,
    /// Short break duration in minutes (1-60)
    pub break_minutes: u32,
    /// Long break duration in minutes (1-60)
    pub long_break_minutes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            long_break_minutes: 15,
        }
    }
}

impl TimerConfig {
    /// Creates a new configuration with the specified focus duration.
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = minutes;
        self
    }

    /// Creates a new configuration with the specified break duration.
    pub fn with_break_minutes(mut self, minutes: u32) -> Self {
        self.break_minutes = minutes;
        self
    }

    /// Creates a new configuration with the specified long break duration.
    pub fn with_long_break_minutes(mut self, minutes: u32) -> Self {
        self.long_break_minutes = minutes;
        self
    }

    /// Returns the default duration of `mode` in minutes.
    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus_minutes,
            TimerMode::Break => self.break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        }
    }

    /// Returns the default duration of `mode` in seconds, saturating at `u32::MAX`.
    pub fn seconds_for(&self, mode: TimerMode) -> u32 {
        self.minutes_for(mode).saturating_mul(60)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.focus_minutes < 1 || self.focus_minutes > 120 {
            return Err("集中時間は1-120分の範囲で指定してください".to_string());
        }
        if self.break_minutes < 1 || self.break_minutes > 60 {
            return Err("休憩時間は1-60分の範囲で指定してください".to_string());
        }
        if self.long_break_minutes < 1 || self.long_break_minutes > 60 {
            return Err("長い休憩時間は1-60分の範囲で指定してください".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// Countdown state owned by a single timer engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Active mode
    pub mode: TimerMode,
    /// Remaining seconds of the current countdown
    pub remaining_seconds: u32,
    /// Whether the countdown is ticking
    pub is_running: bool,
    /// Set once the completion protocol ran for the current countdown
    #[serde(skip)]
    has_fired: bool,
}

impl TimerState {
    /// Creates a stopped focus countdown at its full duration.
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            mode: TimerMode::Focus,
            remaining_seconds: config.seconds_for(TimerMode::Focus),
            is_running: false,
            has_fired: false,
        }
    }

    /// Starts (or keeps) the countdown running.
    ///
    /// A countdown sitting at zero is first refilled with the mode's default
    /// duration, so a running timer is never stuck at 0.
    pub fn start(&mut self, config: &TimerConfig) {
        if self.remaining_seconds == 0 {
            self.remaining_seconds = config.seconds_for(self.mode);
        }
        self.is_running = true;
        self.has_fired = false;
    }

    /// Stops the countdown without touching the remaining time.
    pub fn pause(&mut self) {
        self.is_running = false;
    }

    /// Stops the countdown and sets the remaining time.
    pub fn reset_to(&mut self, seconds: u32) {
        self.is_running = false;
        self.remaining_seconds = seconds;
        self.has_fired = false;
    }

    /// Stops the countdown and loads the default duration of `mode`.
    pub fn switch_mode(&mut self, mode: TimerMode, config: &TimerConfig) {
        self.mode = mode;
        self.reset_to(config.seconds_for(mode));
    }

    /// Decrements the countdown by one second.
    ///
    /// Returns true when this tick completed the countdown; the state is then
    /// already stopped and marked as fired. Ticks while stopped are ignored.
    pub fn tick(&mut self) -> bool {
        if !self.is_running {
            return false;
        }

        debug_assert!(
            self.remaining_seconds > 0,
            "running countdown must never sit at zero"
        );
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);

        if self.remaining_seconds == 0 && !self.has_fired {
            self.has_fired = true;
            self.is_running = false;
            return true;
        }
        false
    }

    /// Returns true once the completion protocol ran for this countdown.
    pub fn has_fired(&self) -> bool {
        self.has_fired
    }

    /// Whole minutes left.
    pub fn minutes(&self) -> u32 {
        self.remaining_seconds / 60
    }

    /// Seconds left within the current minute.
    pub fn seconds(&self) -> u32 {
        self.remaining_seconds % 60
    }

    /// Remaining time as `MM:SS`.
    pub fn clock_display(&self) -> String {
        format_clock(self.remaining_seconds)
    }

    /// Title line shown outside the timer (terminal title, status file).
    pub fn status_title(&self) -> String {
        if self.is_running {
            format!(
                "{} {} - {}",
                self.mode.emoji(),
                self.clock_display(),
                self.mode.label()
            )
        } else {
            format!("{} - {} Mode 🍅", self.clock_display(), self.mode.label())
        }
    }
}

/// Formats seconds as zero-padded `MM:SS`.
pub fn format_clock(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start (or restart from zero) the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Stop and reload the countdown
    Reset {
        /// Explicit duration in minutes
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minutes: Option<i64>,
    },
    /// Switch to another mode
    SwitchMode {
        /// Target mode
        mode: TimerMode,
    },
    /// Query the current status
    Status,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Active mode
    pub mode: TimerMode,
    /// Remaining seconds
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: u32,
    /// Whether the countdown is ticking
    #[serde(rename = "isRunning")]
    pub is_running: bool,
    /// Remaining time as `MM:SS`
    pub display: String,
    /// Title line
    pub title: String,
}

impl ResponseData {
    /// Creates response data from timer state.
    pub fn from_timer_state(state: &TimerState) -> Self {
        Self {
            mode: state.mode,
            remaining_seconds: state.remaining_seconds,
            is_running: state.is_running,
            display: state.clock_display(),
            title: state.status_title(),
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Returns true for a success response.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================
