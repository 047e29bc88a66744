//! Synthesised completion chime.
//!
//! Used when no sound file is available, so a completion is always audible.

use std::time::Duration;

use rodio::source::{Amplify, SineWave, Source, TakeDuration};

/// Frequency (Hz) and length (ms) of each tone, played in order.
pub const CHIME_TONES: &[(f32, u64)] = &[(880.0, 180), (1320.0, 260)];

const CHIME_GAIN: f32 = 0.25;

/// One tone of the chime.
pub type ChimeTone = Amplify<TakeDuration<SineWave>>;

/// Builds the chime as a sequence of tones to append to a sink.
pub fn chime_tones() -> Vec<ChimeTone> {
    CHIME_TONES
        .iter()
        .map(|&(frequency, millis)| {
            SineWave::new(frequency)
                .take_duration(Duration::from_millis(millis))
                .amplify(CHIME_GAIN)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_rising_tones() {
        assert_eq!(CHIME_TONES.len(), 2);
        assert!(CHIME_TONES[0].0 < CHIME_TONES[1].0);
        assert_eq!(chime_tones().len(), 2);
    }

    #[test]
    fn test_tone_format() {
        let tone = &chime_tones()[0];
        assert_eq!(tone.channels(), 1);
        assert!(tone.sample_rate() > 0);
    }
}
