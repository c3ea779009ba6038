//! Settings Persistence System
//!
//! Provides persistent application settings with:
//! - Atomic file writes (temp file + rename)
//! - Defaults for missing or corrupt fields
//! - Normalization of out-of-range values
//!
//! Storage location: {data_dir}/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::annotations::DATABASE_FILE_NAME;
use crate::core::fs::atomic_write_json_pretty;
use crate::core::{CoreError, CoreResult, FrameRate};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

/// Default directory name under the platform data dir
pub const APP_DIR_NAME: &str = "framenote";

/// Returns `{platform data dir}/framenote`, falling back to the working directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

// =============================================================================
// Settings Model
// =============================================================================

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub clips: ClipSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            playback: PlaybackSettings::default(),
            storage: StorageSettings::default(),
            clips: ClipSettings::default(),
        }
    }
}

impl AppSettings {
    /// Corrects bad values instead of failing, so an old or hand-edited file
    /// still loads.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        if !FrameRate::new(self.playback.frame_rate).is_ok_and(|r| r.is_supported()) {
            warn!(
                "Unsupported frame rate {} in settings, using {}",
                self.playback.frame_rate,
                FrameRate::default()
            );
            self.playback.frame_rate = FrameRate::default().get();
        }

        if self.storage.database_file.trim().is_empty() {
            self.storage.database_file = default_database_file();
        }

        if self
            .clips
            .ffmpeg_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.clips.ffmpeg_path = None;
        }
        if self
            .clips
            .output_dir
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.clips.output_dir = None;
        }
    }

    /// Frame rate used for stepping
    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::new(self.playback.frame_rate).unwrap_or_default()
    }

    /// Database location relative to the data directory
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.storage.database_file)
    }
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    /// Frames per second used for frame stepping (30 or 10)
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
        }
    }
}

fn default_frame_rate() -> u32 {
    FrameRate::default().get()
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    /// SQLite file name, relative to the data directory
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
        }
    }
}

fn default_database_file() -> String {
    DATABASE_FILE_NAME.to_string()
}

/// Clip extraction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClipSettings {
    /// Explicit ffmpeg binary; searched on PATH when unset
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Where clip downloads are written; working directory when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Settings manager for loading, saving, and resetting settings
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a new settings manager with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join(SETTINGS_FILE),
        }
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CoreError::Settings(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| CoreError::Settings(format!("Failed to open settings lock file: {}", e)))?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file).map_err(|e| {
                CoreError::Settings(format!("Failed to lock settings file (exclusive): {}", e))
            })?;
        } else {
            fs2::FileExt::lock_shared(&lock_file).map_err(|e| {
                CoreError::Settings(format!("Failed to lock settings file (shared): {}", e))
            })?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if the file is missing or unreadable
    pub fn load(&self) -> AppSettings {
        let result = self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(AppSettings::default());
            }

            let content = fs::read_to_string(&self.settings_path)
                .map_err(|e| CoreError::Settings(format!("Failed to read settings file: {}", e)))?;

            let mut settings = serde_json::from_str::<AppSettings>(&content).map_err(|e| {
                CoreError::Settings(format!("Failed to parse settings file: {}", e))
            })?;

            settings.normalize();
            Ok(settings)
        });

        match result {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    /// Save settings to disk using atomic write (temp file + rename)
    pub fn save(&self, settings: &AppSettings) -> CoreResult<AppSettings> {
        self.with_lock(true, || {
            let mut normalized = settings.clone();
            normalized.normalize();

            atomic_write_json_pretty(&self.settings_path, &normalized)
                .map_err(|e| CoreError::Settings(format!("Failed to write settings: {}", e)))?;

            info!("Settings saved to {:?}", self.settings_path);
            Ok(normalized)
        })
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<AppSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                fs::remove_file(&self.settings_path).map_err(|e| {
                    CoreError::Settings(format!("Failed to delete settings file: {}", e))
                })?;
                info!("Settings file deleted");
            }
            Ok(AppSettings::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.playback.frame_rate, 30);
        assert_eq!(settings.storage.database_file, "framenote.db");
        assert!(settings.clips.ffmpeg_path.is_none());
        assert!(settings.clips.output_dir.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{ "playback": { "frameRate": 10 } }"#).unwrap();
        assert_eq!(settings.playback.frame_rate, 10);
        assert_eq!(settings.storage.database_file, "framenote.db");
        assert_eq!(settings.frame_rate(), FrameRate::FPS_10);
    }

    #[test]
    fn test_normalize_unsupported_frame_rate() {
        let mut settings = AppSettings::default();
        settings.playback.frame_rate = 0;
        settings.normalize();
        assert_eq!(settings.playback.frame_rate, 30);

        settings.playback.frame_rate = 24;
        settings.normalize();
        assert_eq!(settings.playback.frame_rate, 30);
    }

    #[test]
    fn test_normalize_empty_values() {
        let mut settings = AppSettings::default();
        settings.version = 0;
        settings.storage.database_file = "  ".to_string();
        settings.clips.ffmpeg_path = Some(PathBuf::new());
        settings.normalize();

        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.storage.database_file, "framenote.db");
        assert!(settings.clips.ffmpeg_path.is_none());
    }

    #[test]
    fn test_camel_case_serialization() {
        let json = serde_json::to_string(&AppSettings::default()).unwrap();
        assert!(json.contains("\"frameRate\":30"));
        assert!(json.contains("\"databaseFile\""));
        assert!(json.contains("\"ffmpegPath\""));
        assert!(json.contains("\"outputDir\""));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        assert_eq!(manager.load(), AppSettings::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());

        let mut settings = AppSettings::default();
        settings.playback.frame_rate = 10;
        settings.clips.output_dir = Some(dir.path().join("clips"));

        let saved = manager.save(&settings).unwrap();
        assert_eq!(saved, settings);
        assert!(manager.settings_path().exists());
        assert_eq!(manager.load(), settings);
    }

    #[test]
    fn test_save_normalizes() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());

        let mut settings = AppSettings::default();
        settings.playback.frame_rate = 999;
        let saved = manager.save(&settings).unwrap();
        assert_eq!(saved.playback.frame_rate, 30);
    }

    #[test]
    fn test_load_corrupt_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        std::fs::write(manager.settings_path(), "{ not json").unwrap();

        assert_eq!(manager.load(), AppSettings::default());
    }

    #[test]
    fn test_reset_deletes_file() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());

        let mut settings = AppSettings::default();
        settings.playback.frame_rate = 10;
        manager.save(&settings).unwrap();

        let reset = manager.reset().unwrap();
        assert_eq!(reset, AppSettings::default());
        assert!(!manager.settings_path().exists());
    }

    #[test]
    fn test_database_path() {
        let settings = AppSettings::default();
        assert_eq!(
            settings.database_path(Path::new("/data")),
            PathBuf::from("/data/framenote.db")
        );
    }
}
