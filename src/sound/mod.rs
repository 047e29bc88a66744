//! Sound playback: the completion chime and ambient loops.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   SoundAlert     │────▶│   SoundPlayer    │ ← completion sound
//! │ (CompletionSink) │     └────────┬─────────┘
//! └──────────────────┘              │
//!                                   ▼
//!                          ┌──────────────────┐
//!                          │   SoundSource    │ finish.mp3 → Glass → chime
//!                          └──────────────────┘
//!
//! ┌──────────────────┐
//! │  AmbientPlayer   │ ← <sounds>/<id>.mp3, looped, with fades
//! └──────────────────┘
//! ```

mod ambient;
mod chime;
mod error;
mod player;
mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub use ambient::{clamp_volume, volume_ramp, AmbientPlayer, DEFAULT_VOLUME, FADE_INTERVAL, FADE_STEP};
pub use chime::{chime_tones, CHIME_TONES};
pub use error::SoundError;
pub use player::{try_create_player, RodioSoundPlayer};
pub use source::{completion_sound, find_system_sound, AmbientSound, SoundSource, FINISH_SOUND_FILE};

use crate::notification::{CompletionSink, NotificationError};
use crate::types::TimerMode;

/// Trait for sound playback implementations.
pub trait SoundPlayer: Send + Sync {
    /// Plays a sound from the given source without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails.
    fn play(&self, source: &SoundSource) -> Result<(), SoundError>;

    /// Returns true if the audio system is available.
    fn is_available(&self) -> bool;

    /// Returns true if sound playback is disabled.
    fn is_disabled(&self) -> bool;

    fn enable(&self);

    fn disable(&self);
}

impl SoundPlayer for RodioSoundPlayer {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        RodioSoundPlayer::play(self, source)
    }

    fn is_available(&self) -> bool {
        RodioSoundPlayer::is_available(self)
    }

    fn is_disabled(&self) -> bool {
        RodioSoundPlayer::is_disabled(self)
    }

    fn enable(&self) {
        RodioSoundPlayer::enable(self)
    }

    fn disable(&self) {
        RodioSoundPlayer::disable(self)
    }
}

/// Plays the completion sound when a countdown finishes.
pub struct SoundAlert {
    player: Arc<dyn SoundPlayer>,
    source: SoundSource,
}

impl SoundAlert {
    pub fn new(player: Arc<dyn SoundPlayer>, source: SoundSource) -> Self {
        Self { player, source }
    }

    pub fn source(&self) -> &SoundSource {
        &self.source
    }
}

impl CompletionSink for SoundAlert {
    fn notify_completion(
        &self,
        _mode: TimerMode,
        _title: &str,
        _body: &str,
    ) -> Result<(), NotificationError> {
        self.player.play(&self.source)?;
        Ok(())
    }
}

/// Mock sound player for testing.
#[derive(Debug)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<SoundSource>>,
    disabled: AtomicBool,
    should_fail: AtomicBool,
}

impl Default for MockSoundPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            play_calls: Mutex::new(Vec::new()),
            disabled: AtomicBool::new(false),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.get_play_calls().len()
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<SoundSource> {
        self.play_calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        if self.disabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.play_calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(source.clone());
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }
}
