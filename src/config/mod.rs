//! Application configuration and on-disk locations.
//!
//! Everything lives under one home directory, `$POMOTASK_HOME` or
//! `~/.pomotask`:
//!
//! ```text
//! ~/.pomotask/
//!   config.json     AppConfig
//!   storage.json    key/value store (tasks, logs)
//!   status          current title, rewritten by the daemon
//!   pomotask.sock   daemon socket
//!   sounds/         finish.mp3 and ambient loops
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::TimerConfig;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "POMOTASK_HOME";

// ============================================================================
// AppConfig
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_auto_reset_delay_ms() -> u64 {
    1000
}

fn default_ambient_volume() -> f32 {
    0.5
}

/// User configuration, read from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub timer: TimerConfig,

    /// Play the completion chime
    #[serde(default = "default_true")]
    pub sound_enabled: bool,

    /// Post desktop notifications on completion
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    /// Refill the countdown after it finishes
    #[serde(default = "default_true")]
    pub auto_reset: bool,

    #[serde(default = "default_auto_reset_delay_ms")]
    pub auto_reset_delay_ms: u64,

    #[serde(default = "default_ambient_volume")]
    pub ambient_volume: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            sound_enabled: true,
            notifications_enabled: true,
            auto_reset: true,
            auto_reset_delay_ms: default_auto_reset_delay_ms(),
            ambient_volume: default_ambient_volume(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()))
            }
        };

        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("設定ファイルの形式が不正です: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates timer durations and volume.
    pub fn validate(&self) -> Result<()> {
        self.timer.validate().map_err(anyhow::Error::msg)?;
        if !(0.0..=1.0).contains(&self.ambient_volume) {
            anyhow::bail!("ambient_volumeは0.0〜1.0の範囲で指定してください");
        }
        Ok(())
    }
}

// ============================================================================
// AppPaths
// ============================================================================

/// Filesystem locations derived from the home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    home: PathBuf,
}

impl AppPaths {
    /// Resolves the home directory from `POMOTASK_HOME` or the user's home.
    pub fn resolve() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_home(home));
        }

        let home = dirs::home_dir().context("ホームディレクトリが見つかりません")?;
        Ok(Self::with_home(home.join(".pomotask")))
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn socket(&self) -> PathBuf {
        self.home.join("pomotask.sock")
    }

    pub fn storage(&self) -> PathBuf {
        self.home.join("storage.json")
    }

    pub fn status(&self) -> PathBuf {
        self.home.join("status")
    }

    pub fn sounds(&self) -> PathBuf {
        self.home.join("sounds")
    }

    pub fn config(&self) -> PathBuf {
        self.home.join("config.json")
    }

    /// Creates the home directory if it does not exist yet.
    pub fn ensure_home(&self) -> Result<()> {
        fs::create_dir_all(&self.home)
            .with_context(|| format!("ディレクトリを作成できません: {}", self.home.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod app_config_tests {
        use super::*;

        #[test]
        fn test_missing_file_gives_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let config = AppConfig::load(&dir.path().join("config.json")).unwrap();

            assert_eq!(config, AppConfig::default());
            assert_eq!(config.timer.focus_minutes, 25);
            assert!(config.auto_reset);
            assert_eq!(config.auto_reset_delay_ms, 1000);
            assert!((config.ambient_volume - 0.5).abs() < f32::EPSILON);
        }

        #[test]
        fn test_partial_file_fills_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.json");
            fs::write(&path, r#"{"timer":{"focus_minutes":50},"sound_enabled":false}"#).unwrap();

            let config = AppConfig::load(&path).unwrap();

            assert_eq!(config.timer.focus_minutes, 50);
            assert_eq!(config.timer.break_minutes, 5);
            assert!(!config.sound_enabled);
            assert!(config.notifications_enabled);
        }

        #[test]
        fn test_invalid_json_is_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.json");
            fs::write(&path, "{").unwrap();

            let err = AppConfig::load(&path).unwrap_err();
            assert!(err.to_string().contains("設定ファイルの形式が不正です"));
        }

        #[test]
        fn test_out_of_range_values_are_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.json");
            fs::write(&path, r#"{"timer":{"focus_minutes":0}}"#).unwrap();
            assert!(AppConfig::load(&path).is_err());

            fs::write(&path, r#"{"ambient_volume":1.5}"#).unwrap();
            assert!(AppConfig::load(&path).is_err());
        }
    }

    mod app_paths_tests {
        use super::*;

        #[test]
        fn test_paths_under_home() {
            let paths = AppPaths::with_home("/tmp/pomo");

            assert_eq!(paths.socket(), PathBuf::from("/tmp/pomo/pomotask.sock"));
            assert_eq!(paths.storage(), PathBuf::from("/tmp/pomo/storage.json"));
            assert_eq!(paths.status(), PathBuf::from("/tmp/pomo/status"));
            assert_eq!(paths.sounds(), PathBuf::from("/tmp/pomo/sounds"));
            assert_eq!(paths.config(), PathBuf::from("/tmp/pomo/config.json"));
        }

        #[test]
        fn test_ensure_home_creates_directory() {
            let dir = tempfile::tempdir().unwrap();
            let paths = AppPaths::with_home(dir.path().join("a").join("b"));

            paths.ensure_home().unwrap();
            assert!(paths.home().is_dir());
        }
    }
}
