//! Sound sources: the completion sound and the ambient loops.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

use super::error::SoundError;

/// File name of a user-provided completion sound inside the sounds directory.
pub const FINISH_SOUND_FILE: &str = "finish.mp3";

/// Directories to search for system sounds, in order of priority.
const SYSTEM_SOUND_DIRS: &[&str] = &["/System/Library/Sounds", "/Library/Sounds"];

/// Supported audio file extensions.
const SUPPORTED_EXTENSIONS: &[&str] = &["aiff", "wav", "mp3", "m4a", "flac"];

/// System sound used for completions when no finish sound is installed.
const DEFAULT_SYSTEM_SOUND: &str = "Glass";

/// Represents the source of a sound to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// An audio file on disk.
    File {
        /// Display name (e.g., "finish", "Glass").
        name: String,
        /// Full path to the file.
        path: PathBuf,
    },
    /// The synthesised two-tone chime.
    Chime {
        name: String,
    },
}

impl SoundSource {
    #[must_use]
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::File {
            name: name.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn chime() -> Self {
        Self::Chime {
            name: "chime".to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Chime { name } => name,
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    #[must_use]
    pub fn is_chime(&self) -> bool {
        matches!(self, Self::Chime { .. })
    }

    /// Returns the file path if this is a file sound.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Chime { .. } => None,
        }
    }
}

/// Finds a system sound by name in the system sound directories.
///
/// # Errors
///
/// Returns `SoundError::FileNotFound` if no sound with the given name exists.
pub fn find_system_sound(name: &str) -> Result<SoundSource, SoundError> {
    SYSTEM_SOUND_DIRS
        .iter()
        .flat_map(|dir| {
            SUPPORTED_EXTENSIONS
                .iter()
                .map(move |ext| Path::new(dir).join(format!("{name}.{ext}")))
        })
        .find(|path| path.is_file())
        .map(|path| SoundSource::file(name, path))
        .ok_or_else(|| SoundError::FileNotFound(format!("System sound '{}' not found", name)))
}

/// Picks the completion sound.
///
/// Prefers `<sounds_dir>/finish.mp3`, then the `Glass` system sound, and
/// finally the synthesised chime.
#[must_use]
pub fn completion_sound(sounds_dir: &Path) -> SoundSource {
    let finish = sounds_dir.join(FINISH_SOUND_FILE);
    if finish.is_file() {
        return SoundSource::file("finish", finish);
    }

    find_system_sound(DEFAULT_SYSTEM_SOUND).unwrap_or_else(|_| SoundSource::chime())
}

// ============================================================================
// AmbientSound
// ============================================================================

/// Looping background sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum AmbientSound {
    Rain,
    Cafe,
    Fire,
    Ocean,
    Night,
    Train,
}

impl AmbientSound {
    /// Identifier, also the file stem.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::Cafe => "cafe",
            Self::Fire => "fire",
            Self::Ocean => "ocean",
            Self::Night => "night",
            Self::Train => "train",
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rain => "雨音",
            Self::Cafe => "カフェ",
            Self::Fire => "焚き火",
            Self::Ocean => "波の音",
            Self::Night => "夜の虫",
            Self::Train => "電車",
        }
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.mp3", self.as_str())
    }

    /// Path of the loop inside `sounds_dir`.
    #[must_use]
    pub fn path_in(&self, sounds_dir: &Path) -> PathBuf {
        sounds_dir.join(self.file_name())
    }
}

impl fmt::Display for AmbientSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
