//! Daemon module for the timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with state transitions and countdown logic
//! - `clock`: One-second tick sources
//! - `status`: Title line sinks
//! - `ipc`: Unix socket server and request dispatch
//!
//! [`run`] wires them together and serves until Ctrl-C.

pub mod clock;
pub mod ipc;
pub mod status;
pub mod timer;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

pub use clock::{ClockSource, ClockTick, IntervalClock, ManualClock, TICK_PERIOD};
pub use ipc::{serve_connection, IpcError, IpcServer, RequestHandler};
pub use status::{MockStatusSink, StatusFileSink, StatusSink};
pub use timer::{
    transition, TimerEffect, TimerEngine, TimerError, TimerEvent, TimerInput, TimerSinks,
};

use crate::config::{AppConfig, AppPaths};
use crate::notification::{create_notifier, CompletionAlerts};
use crate::sound::{completion_sound, try_create_player, SoundAlert};
use crate::stats::{LocalToday, StoredSessionCounter};
use crate::storage::{DegradingStore, JsonFileStore, KeyValueStore};

// ============================================================================
// DaemonOptions
// ============================================================================

/// Command-line overrides for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub paths: AppPaths,
    pub focus_minutes: Option<u32>,
    pub break_minutes: Option<u32>,
    pub long_break_minutes: Option<u32>,
    pub no_sound: bool,
    pub no_notify: bool,
    pub no_auto_reset: bool,
}

impl DaemonOptions {
    pub fn new(paths: AppPaths) -> Self {
        Self {
            paths,
            focus_minutes: None,
            break_minutes: None,
            long_break_minutes: None,
            no_sound: false,
            no_notify: false,
            no_auto_reset: false,
        }
    }

    /// Applies the overrides on top of the file configuration.
    ///
    /// # Errors
    ///
    /// Fails if an overridden duration is out of range.
    pub fn apply_to(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(minutes) = self.focus_minutes {
            config.timer.focus_minutes = minutes;
        }
        if let Some(minutes) = self.break_minutes {
            config.timer.break_minutes = minutes;
        }
        if let Some(minutes) = self.long_break_minutes {
            config.timer.long_break_minutes = minutes;
        }
        if self.no_sound {
            config.sound_enabled = false;
        }
        if self.no_notify {
            config.notifications_enabled = false;
        }
        if self.no_auto_reset {
            config.auto_reset = false;
        }
        config.validate()
    }
}

// ============================================================================
// Daemon loop
// ============================================================================

/// Runs the timer daemon until Ctrl-C.
///
/// # Errors
///
/// Fails on invalid configuration or when the socket cannot be bound.
pub async fn run(options: DaemonOptions) -> Result<()> {
    let paths = options.paths.clone();
    paths.ensure_home()?;

    let mut config = AppConfig::load(&paths.config())?;
    options.apply_to(&mut config)?;
    debug!(?config, "daemon configuration");

    let store: Arc<dyn KeyValueStore> =
        Arc::new(DegradingStore::new(JsonFileStore::new(paths.storage())));
    let session_counter = Arc::new(StoredSessionCounter::new(
        store,
        Arc::new(LocalToday),
        config.timer.focus_minutes,
    ));

    let mut alerts = CompletionAlerts::new().with(create_notifier(config.notifications_enabled).await);
    if config.sound_enabled {
        if let Some(player) = try_create_player(false) {
            let alert = SoundAlert::new(player, completion_sound(&paths.sounds()));
            debug!("Completion sound: {}", alert.source().name());
            alerts = alerts.with(Arc::new(alert));
        }
    }

    let status = Arc::new(StatusFileSink::new(paths.status()));

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let engine = TimerEngine::new(
        config.timer.clone(),
        Box::new(IntervalClock::new(tick_tx)),
        TimerSinks {
            session_counter,
            completion: Arc::new(alerts),
            status: status.clone(),
        },
        event_tx,
    );
    engine.publish_status();
    let engine = Arc::new(Mutex::new(engine));

    let server = IpcServer::new(&paths.socket()).context("デーモンを起動できません")?;
    let handler = RequestHandler::new(engine.clone());
    let auto_reset_delay = Duration::from_millis(config.auto_reset_delay_ms);
    info!("デーモンを起動しました: {}", server.socket_path().display());

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, handler).await {
                            debug!("IPC connection error: {:#}", e);
                        }
                    });
                }
                Err(e) => warn!("接続を受け付けられませんでした: {:#}", e),
            },
            Some(tick) = tick_rx.recv() => {
                engine.lock().await.on_clock_tick(tick);
            }
            Some(event) = event_rx.recv() => {
                if let TimerEvent::Completed { mode } = event {
                    debug!(mode = mode.as_str(), "countdown completed");
                    if config.auto_reset {
                        schedule_auto_reset(engine.clone(), auto_reset_delay);
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("シグナルを待機できません: {}", e);
                }
                break;
            }
        }
    }

    info!("デーモンを停止します");
    engine.lock().await.shutdown();
    if let Err(e) = status.clear() {
        debug!("status file not removed: {}", e);
    }
    Ok(())
}

/// Reloads a finished countdown after `delay`.
///
/// Skipped if the timer was restarted or changed in the meantime.
pub fn schedule_auto_reset(engine: Arc<Mutex<TimerEngine>>, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if engine.lock().await.reset_if_finished() {
            debug!("auto reset applied");
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
