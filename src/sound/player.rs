//! Sound player implementation using rodio.
//!
//! rodio's `OutputStream` cannot leave the thread that created it, so the
//! player keeps it on a dedicated audio thread and sends play requests over a
//! channel. The handle itself is `Send + Sync` and can live inside the
//! daemon's shared state.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use super::chime::chime_tones;
use super::error::SoundError;
use super::source::SoundSource;

/// A sound player that uses rodio for audio playback.
///
/// Playback is non-blocking; sounds continue playing in the background.
pub struct RodioSoundPlayer {
    requests: mpsc::Sender<SoundSource>,
    disabled: AtomicBool,
}

impl RodioSoundPlayer {
    /// Creates a new sound player and its audio thread.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new(disabled: bool) -> Result<Self, SoundError> {
        let (requests, request_rx) = mpsc::channel::<SoundSource>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        thread::Builder::new()
            .name("pomotask-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                debug!("Audio output stream initialized");

                // Runs until every RodioSoundPlayer handle is dropped
                for source in request_rx {
                    if let Err(e) = play_on(&handle, &source) {
                        warn!("サウンドを再生できませんでした: {}", e);
                    }
                }
                debug!("Audio thread finished");
            })
            .map_err(|e| SoundError::StreamError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                requests,
                disabled: AtomicBool::new(disabled),
            }),
            Ok(Err(e)) => Err(SoundError::DeviceNotAvailable(e)),
            Err(_) => Err(SoundError::StreamError("audio thread exited".to_string())),
        }
    }

    /// Queues `source` for playback.
    ///
    /// A file that cannot be opened or decoded is replaced by the chime on the
    /// audio thread.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::PlaybackError` if the audio thread is gone.
    pub fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.is_disabled() {
            debug!("Sound playback disabled, skipping");
            return Ok(());
        }

        self.requests
            .send(source.clone())
            .map_err(|_| SoundError::PlaybackError("audio thread stopped".to_string()))
    }

    /// Returns true if sound playback is currently disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    pub fn enable(&self) {
        self.disabled.store(false, Ordering::Relaxed);
        debug!("Sound playback enabled");
    }

    pub fn disable(&self) {
        self.disabled.store(true, Ordering::Relaxed);
        debug!("Sound playback disabled");
    }

    /// Always true: construction fails when there is no device.
    #[must_use]
    pub fn is_available(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer")
            .field("disabled", &self.is_disabled())
            .finish_non_exhaustive()
    }
}

fn play_on(handle: &OutputStreamHandle, source: &SoundSource) -> Result<(), SoundError> {
    match source {
        SoundSource::File { name, path } => {
            debug!("Playing sound file: {}", name);
            match play_file(handle, path) {
                Err(e) if e.should_fallback_to_chime() => {
                    warn!("'{}' を再生できないためチャイムを鳴らします: {}", name, e);
                    play_chime(handle)
                }
                other => other,
            }
        }
        SoundSource::Chime { .. } => play_chime(handle),
    }
}

fn play_file(handle: &OutputStreamHandle, path: &Path) -> Result<(), SoundError> {
    let file = File::open(path)
        .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))?;
    let decoder =
        Decoder::new(BufReader::new(file)).map_err(|e| SoundError::DecodeError(e.to_string()))?;

    let sink = Sink::try_new(handle).map_err(|e| SoundError::StreamError(e.to_string()))?;
    sink.append(decoder);
    sink.detach();
    Ok(())
}

fn play_chime(handle: &OutputStreamHandle) -> Result<(), SoundError> {
    let sink = Sink::try_new(handle).map_err(|e| SoundError::StreamError(e.to_string()))?;
    for tone in chime_tones() {
        sink.append(tone);
    }
    sink.detach();
    Ok(())
}

/// Creates a sound player, returning None if audio is unavailable.
#[must_use]
pub fn try_create_player(disabled: bool) -> Option<Arc<RodioSoundPlayer>> {
    match RodioSoundPlayer::new(disabled) {
        Ok(player) => Some(Arc::new(player)),
        Err(e) => {
            warn!("オーディオが利用できないため完了音は無効です: {}", e);
            None
        }
    }
}
