//! Timer engine for the countdown.
//!
//! This module is split in two layers:
//! - [`transition`]: a pure function from (state, input) to a list of effects
//! - [`TimerEngine`]: owns the state and carries the effects out against the
//!   clock, the sinks and the event channel
//!
//! The completion protocol (stop, record, notify) runs inside a single
//! transition, guarded by the state's fired flag, so it happens at most once
//! per countdown.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::clock::{ClockSource, ClockTick};
use super::status::StatusSink;
use crate::notification::CompletionSink;
use crate::stats::SessionCounter;
use crate::types::{TimerConfig, TimerMode, TimerState};

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by timer commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// `reset` was given a duration that is not a positive number of minutes.
    #[error("無効な時間です: {0}分 (1分以上を指定してください)")]
    InvalidDuration(i64),
}

// ============================================================================
// TimerEvent
// ============================================================================

/// Timer events for observers (auto reset, logging, tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Countdown started running
    Started {
        mode: TimerMode,
        remaining_seconds: u32,
    },
    /// Countdown paused
    Paused {
        remaining_seconds: u32,
    },
    /// Countdown stopped and reloaded
    Reset {
        mode: TimerMode,
        remaining_seconds: u32,
    },
    /// Mode changed (also stops and reloads)
    ModeSwitched {
        mode: TimerMode,
    },
    /// One second elapsed
    Tick {
        remaining_seconds: u32,
    },
    /// Countdown reached zero
    Completed {
        mode: TimerMode,
    },
}

// ============================================================================
// Transition
// ============================================================================

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerInput {
    Start,
    Pause,
    Reset { minutes: Option<i64> },
    SwitchMode(TimerMode),
    Tick,
}

/// Side effects requested by a transition, executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEffect {
    SubscribeClock,
    CancelClock,
    RecordFocusSession,
    RecordBreak { minutes: u32 },
    NotifyCompletion { mode: TimerMode },
    PublishStatus,
    Emit(TimerEvent),
}

/// Converts an explicit reset duration to seconds.
fn reset_seconds(minutes: i64) -> Result<u32, TimerError> {
    if minutes <= 0 {
        return Err(TimerError::InvalidDuration(minutes));
    }
    u32::try_from(minutes)
        .ok()
        .and_then(|m| m.checked_mul(60))
        .ok_or(TimerError::InvalidDuration(minutes))
}

/// Applies `input` to `state` and returns the effects to carry out.
///
/// On error the state is left untouched. Clock effects come first and follow
/// the running flag: false→true subscribes, true→false cancels.
pub fn transition(
    state: &mut TimerState,
    config: &TimerConfig,
    input: &TimerInput,
) -> Result<Vec<TimerEffect>, TimerError> {
    let was_running = state.is_running;
    let mut effects = Vec::new();

    match *input {
        TimerInput::Start => {
            state.start(config);
            if !was_running {
                effects.push(TimerEffect::Emit(TimerEvent::Started {
                    mode: state.mode,
                    remaining_seconds: state.remaining_seconds,
                }));
            }
        }
        TimerInput::Pause => {
            state.pause();
            if was_running {
                effects.push(TimerEffect::Emit(TimerEvent::Paused {
                    remaining_seconds: state.remaining_seconds,
                }));
            }
        }
        TimerInput::Reset { minutes } => {
            let seconds = match minutes {
                Some(minutes) => reset_seconds(minutes)?,
                None => config.seconds_for(state.mode),
            };
            state.reset_to(seconds);
            effects.push(TimerEffect::Emit(TimerEvent::Reset {
                mode: state.mode,
                remaining_seconds: state.remaining_seconds,
            }));
        }
        TimerInput::SwitchMode(mode) => {
            state.switch_mode(mode, config);
            effects.push(TimerEffect::Emit(TimerEvent::ModeSwitched { mode }));
        }
        TimerInput::Tick => {
            if !was_running {
                return Ok(Vec::new());
            }

            let completed = state.tick();
            effects.push(TimerEffect::Emit(TimerEvent::Tick {
                remaining_seconds: state.remaining_seconds,
            }));

            if completed {
                let mode = state.mode;
                effects.push(if mode.is_focus() {
                    TimerEffect::RecordFocusSession
                } else {
                    TimerEffect::RecordBreak {
                        minutes: config.minutes_for(mode),
                    }
                });
                effects.push(TimerEffect::NotifyCompletion { mode });
                effects.push(TimerEffect::Emit(TimerEvent::Completed { mode }));
            }
        }
    }

    match (was_running, state.is_running) {
        (false, true) => effects.insert(0, TimerEffect::SubscribeClock),
        (true, false) => effects.insert(0, TimerEffect::CancelClock),
        _ => {}
    }
    effects.push(TimerEffect::PublishStatus);

    Ok(effects)
}

// ============================================================================
// TimerEngine
// ============================================================================

/// External collaborators of the engine.
#[derive(Clone)]
pub struct TimerSinks {
    pub session_counter: Arc<dyn SessionCounter>,
    pub completion: Arc<dyn CompletionSink>,
    pub status: Arc<dyn StatusSink>,
}

/// Timer engine that owns the countdown state.
pub struct TimerEngine {
    state: TimerState,
    config: TimerConfig,
    clock: Box<dyn ClockSource>,
    sinks: TimerSinks,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates a stopped engine in focus mode at the full focus duration.
    pub fn new(
        config: TimerConfig,
        clock: Box<dyn ClockSource>,
        sinks: TimerSinks,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            state: TimerState::new(&config),
            config,
            clock,
            sinks,
            event_tx,
        }
    }

    /// Starts the countdown. Idempotent while running.
    pub fn start(&mut self) -> Result<(), TimerError> {
        self.apply(TimerInput::Start)
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.apply(TimerInput::Pause)
    }

    /// Stops and reloads the countdown, with `minutes` or the mode default.
    ///
    /// # Errors
    ///
    /// `TimerError::InvalidDuration` for zero, negative or oversized minutes;
    /// the state is unchanged.
    pub fn reset(&mut self, minutes: Option<i64>) -> Result<(), TimerError> {
        self.apply(TimerInput::Reset { minutes })
    }

    pub fn switch_mode(&mut self, mode: TimerMode) -> Result<(), TimerError> {
        self.apply(TimerInput::SwitchMode(mode))
    }

    /// Advances the countdown by one second. Ignored while stopped.
    pub fn tick(&mut self) -> Result<(), TimerError> {
        self.apply(TimerInput::Tick)
    }

    /// Applies a tick from the clock, dropping ticks of a cancelled subscription.
    pub fn on_clock_tick(&mut self, tick: ClockTick) {
        if !self.clock.accepts(tick) {
            trace!(generation = tick.generation, "stale tick dropped");
            return;
        }
        if let Err(e) = self.tick() {
            warn!("tick failed: {}", e);
        }
    }

    /// Reloads a finished countdown, unless something happened since.
    ///
    /// Returns true if the reset was applied.
    pub fn reset_if_finished(&mut self) -> bool {
        if self.state.is_running || self.state.remaining_seconds != 0 {
            return false;
        }
        self.reset(None).is_ok()
    }

    /// Runs `input` through [`transition`] and carries out its effects.
    pub fn apply(&mut self, input: TimerInput) -> Result<(), TimerError> {
        let effects = transition(&mut self.state, &self.config, &input)?;
        debug!(?input, effects = effects.len(), "timer transition");

        for effect in effects {
            self.execute(effect);
        }
        Ok(())
    }

    fn execute(&mut self, effect: TimerEffect) {
        match effect {
            TimerEffect::SubscribeClock => self.clock.subscribe(),
            TimerEffect::CancelClock => self.clock.cancel(),
            TimerEffect::RecordFocusSession => {
                if let Err(e) = self.sinks.session_counter.increment_focus_session() {
                    warn!("集中セッションを記録できませんでした: {}", e);
                }
            }
            TimerEffect::RecordBreak { minutes } => {
                if let Err(e) = self.sinks.session_counter.record_break(minutes) {
                    warn!("休憩時間を記録できませんでした: {}", e);
                }
            }
            TimerEffect::NotifyCompletion { mode } => {
                info!("{}", mode.completion_title());
                if let Err(e) = self.sinks.completion.notify_completion(
                    mode,
                    mode.completion_title(),
                    mode.completion_body(),
                ) {
                    warn!("完了通知に失敗しました: {}", e);
                }
            }
            TimerEffect::PublishStatus => self.publish_status(),
            TimerEffect::Emit(event) => {
                if self.event_tx.send(event).is_err() {
                    trace!("event receiver closed");
                }
            }
        }
    }

    /// Sends the current title to the status sink.
    pub fn publish_status(&self) {
        if let Err(e) = self.sinks.status.publish(&self.state.status_title()) {
            debug!("status update failed: {}", e);
        }
    }

    /// Stops ticking for good.
    pub fn shutdown(&mut self) {
        self.clock.cancel();
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn status_title(&self) -> String {
        self.state.status_title()
    }

    /// Returns true while a clock subscription is live.
    pub fn is_ticking(&self) -> bool {
        self.clock.is_subscribed()
    }
}

// ============================================================================
// Tests
// ============================================================================
