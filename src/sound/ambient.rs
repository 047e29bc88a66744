//! Looping ambient sound player with volume fades.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink};
use tracing::debug;

use super::error::SoundError;
use super::source::AmbientSound;

/// Volume change per fade step.
pub const FADE_STEP: f32 = 0.05;

/// Delay between fade steps.
pub const FADE_INTERVAL: Duration = Duration::from_millis(50);

/// Default ambient volume.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Clamps a volume to `0.0..=1.0`. NaN becomes silence.
#[must_use]
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Intermediate volumes for a fade from `from` to `to`, ending exactly at `to`.
///
/// Each step moves by at most [`FADE_STEP`]. Equal endpoints yield no steps.
#[must_use]
pub fn volume_ramp(from: f32, to: f32) -> Vec<f32> {
    let from = clamp_volume(from);
    let to = clamp_volume(to);
    let distance = to - from;
    let steps = (distance.abs() / FADE_STEP).ceil() as usize;

    (1..=steps)
        .map(|i| {
            if i == steps {
                to
            } else {
                from + distance * i as f32 / steps as f32
            }
        })
        .collect()
}

/// Plays one ambient loop until stopped.
///
/// Owns its audio output, so it must stay on the thread that opened it.
pub struct AmbientPlayer {
    _stream: OutputStream,
    sink: Sink,
    sound: AmbientSound,
    volume: f32,
}

impl AmbientPlayer {
    /// Opens `<sounds_dir>/<sound>.mp3` and queues it, silent, in a loop.
    ///
    /// # Errors
    ///
    /// `FileNotFound`/`DecodeError` for a bad file, `DeviceNotAvailable` or
    /// `StreamError` when there is no audio output.
    pub fn open(sound: AmbientSound, sounds_dir: &Path, volume: f32) -> Result<Self, SoundError> {
        let path = sound.path_in(sounds_dir);
        let file = File::open(&path)
            .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        let looped = Decoder::new_looped(BufReader::new(file))
            .map_err(|e| SoundError::DecodeError(e.to_string()))?;

        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| SoundError::StreamError(e.to_string()))?;
        sink.set_volume(0.0);
        sink.append(looped);

        debug!(sound = sound.as_str(), "ambient sound opened");
        Ok(Self {
            _stream: stream,
            sink,
            sound,
            volume: clamp_volume(volume),
        })
    }

    pub fn sound(&self) -> AmbientSound {
        self.sound
    }

    /// Target volume.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Ramps from silence up to the target volume.
    pub async fn fade_in(&self) {
        self.fade_to(self.volume).await;
    }

    /// Ramps down to silence and stops playback.
    pub async fn fade_out(self) {
        self.fade_to(0.0).await;
        self.sink.stop();
        debug!(sound = self.sound.as_str(), "ambient sound stopped");
    }

    async fn fade_to(&self, target: f32) {
        for step in volume_ramp(self.sink.volume(), target) {
            self.sink.set_volume(step);
            tokio::time::sleep(FADE_INTERVAL).await;
        }
    }
}
