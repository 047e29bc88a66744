//! Clock sources driving the countdown.
//!
//! A clock never touches the timer itself. It delivers [`ClockTick`] messages
//! that the daemon feeds back into the engine, so ticks and commands are
//! applied one at a time under the same lock.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::trace;

/// Default tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One tick, tagged with the subscription that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub generation: u64,
}

/// A periodic tick provider that can be (un)subscribed.
pub trait ClockSource: Send {
    /// Starts ticking. Does nothing if already subscribed.
    fn subscribe(&mut self);

    /// Stops ticking. Does nothing if not subscribed.
    fn cancel(&mut self);

    fn is_subscribed(&self) -> bool;

    /// Returns true if `tick` belongs to the live subscription.
    fn accepts(&self, tick: ClockTick) -> bool;
}

// ============================================================================
// IntervalClock
// ============================================================================

/// Clock backed by a tokio interval task.
///
/// The first tick arrives one period after subscribing. Ticks that were
/// queued before a cancel carry an old generation and are rejected by
/// [`ClockSource::accepts`].
pub struct IntervalClock {
    tick_tx: mpsc::UnboundedSender<ClockTick>,
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl IntervalClock {
    pub fn new(tick_tx: mpsc::UnboundedSender<ClockTick>) -> Self {
        Self::with_period(tick_tx, TICK_PERIOD)
    }

    pub fn with_period(tick_tx: mpsc::UnboundedSender<ClockTick>, period: Duration) -> Self {
        Self {
            tick_tx,
            period,
            generation: 0,
            task: None,
        }
    }
}

impl ClockSource for IntervalClock {
    fn subscribe(&mut self) {
        if self.task.is_some() {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let period = self.period;
        let tick_tx = self.tick_tx.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if tick_tx.send(ClockTick { generation }).is_err() {
                    trace!("tick receiver closed");
                    break;
                }
            }
        }));
        trace!(generation, "clock subscribed");
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            trace!(generation = self.generation, "clock cancelled");
        }
    }

    fn is_subscribed(&self) -> bool {
        self.task.is_some()
    }

    fn accepts(&self, tick: ClockTick) -> bool {
        self.task.is_some() && tick.generation == self.generation
    }
}

impl Drop for IntervalClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// ManualClock
// ============================================================================

#[derive(Debug, Default)]
struct ManualClockState {
    subscribed: bool,
    generation: u64,
    subscribe_count: u32,
    cancel_count: u32,
}

/// Clock driven by hand, for tests.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// the other.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualClockState>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualClockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Returns the tick the live subscription would deliver, if any.
    pub fn current_tick(&self) -> Option<ClockTick> {
        let state = self.lock();
        state.subscribed.then_some(ClockTick {
            generation: state.generation,
        })
    }

    /// Number of actual subscriptions (idempotent calls not counted).
    pub fn subscribe_count(&self) -> u32 {
        self.lock().subscribe_count
    }

    /// Number of actual cancellations.
    pub fn cancel_count(&self) -> u32 {
        self.lock().cancel_count
    }
}

impl ClockSource for ManualClock {
    fn subscribe(&mut self) {
        let mut state = self.lock();
        if !state.subscribed {
            state.subscribed = true;
            state.generation += 1;
            state.subscribe_count += 1;
        }
    }

    fn cancel(&mut self) {
        let mut state = self.lock();
        if state.subscribed {
            state.subscribed = false;
            state.cancel_count += 1;
        }
    }

    fn is_subscribed(&self) -> bool {
        self.lock().subscribed
    }

    fn accepts(&self, tick: ClockTick) -> bool {
        let state = self.lock();
        state.subscribed && tick.generation == state.generation
    }
}
