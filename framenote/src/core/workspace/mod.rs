//! Workspace
//!
//! Top-level handle a host works through: the video library, the annotation
//! manager for the open video, and persisted preferences.
//!
//! The record store is created once and injected here; nothing reaches for a
//! global connection.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::core::annotations::{AnnotationManager, RecordStore, SqliteRecordStore, Video};
use crate::core::fs::resolve_media_file;
use crate::core::playback::Playhead;
use crate::core::prompt::UserPrompt;
use crate::core::settings::{AppSettings, SettingsManager};
use crate::core::{CoreError, CoreResult, FrameRate, TimeSec};

pub struct Workspace {
    store: Arc<dyn RecordStore>,
    manager: AnnotationManager,
    settings_manager: SettingsManager,
    settings: AppSettings,
}

impl Workspace {
    /// Creates a workspace over an already opened store
    pub fn new(store: Arc<dyn RecordStore>, settings_manager: SettingsManager) -> Self {
        let settings = settings_manager.load();
        Self::assemble(store, settings_manager, settings)
    }

    /// Loads settings from `data_dir` and opens the SQLite store they point at
    pub fn open(data_dir: &Path) -> CoreResult<Self> {
        let settings_manager = SettingsManager::new(data_dir.to_path_buf());
        let settings = settings_manager.load();
        let store: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::open(settings.database_path(data_dir))?);
        info!("Workspace ready at {}", data_dir.display());
        Ok(Self::assemble(store, settings_manager, settings))
    }

    fn assemble(
        store: Arc<dyn RecordStore>,
        settings_manager: SettingsManager,
        settings: AppSettings,
    ) -> Self {
        Self {
            manager: AnnotationManager::new(Arc::clone(&store)),
            store,
            settings_manager,
            settings,
        }
    }

    pub fn manager(&self) -> &AnnotationManager {
        &self.manager
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    // =========================================================================
    // Video Library
    // =========================================================================

    pub async fn list_videos(&self) -> CoreResult<Vec<Video>> {
        self.store.list_videos().await
    }

    /// Registers a local video file; the display name defaults to the file name
    pub async fn add_video(&self, path: &Path, name: Option<&str>) -> CoreResult<Video> {
        let file = resolve_media_file(path)?;
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            Some(_) => {
                return Err(CoreError::ValidationError(
                    "Video name cannot be empty".to_string(),
                ))
            }
            None => file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.to_string_lossy().to_string()),
        };

        let video = self.store.create_video(&name, &file).await?;
        info!("Added video {} ({})", video.name, video.id);
        Ok(video)
    }

    /// Deletes a video and its annotations after confirmation
    ///
    /// Returns false if the user declined. Closes the video if it is open.
    pub async fn delete_video(&self, video_id: &str, prompt: &dyn UserPrompt) -> CoreResult<bool> {
        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or_else(|| CoreError::VideoNotFound(video_id.to_string()))?;

        let question = format!(
            "Are you sure you want to delete \"{}\" and all its annotations?",
            video.name
        );
        if !prompt.confirm(&question) {
            return Ok(false);
        }

        self.store.delete_video(video_id).await?;
        if self
            .manager
            .current_video()
            .await
            .is_some_and(|open| open.id == video_id)
        {
            self.manager.close_video().await;
        }

        info!("Deleted video {} ({})", video.name, video.id);
        Ok(true)
    }

    /// Opens a video in the annotation manager and loads its annotations
    pub async fn open_video(&self, video_id: &str) -> CoreResult<Video> {
        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or_else(|| CoreError::VideoNotFound(video_id.to_string()))?;
        self.manager.open_video(video.clone()).await?;
        Ok(video)
    }

    // =========================================================================
    // Playback Preferences
    // =========================================================================

    pub fn frame_rate(&self) -> FrameRate {
        self.settings.frame_rate()
    }

    /// Selects one of the supported frame rates and persists it
    pub fn set_frame_rate(&mut self, rate: FrameRate) -> CoreResult<()> {
        if !rate.is_supported() {
            return Err(CoreError::ValidationError(format!(
                "Unsupported frame rate: {}",
                rate
            )));
        }
        let mut next = self.settings.clone();
        next.playback.frame_rate = rate.get();
        self.settings = self.settings_manager.save(&next)?;
        Ok(())
    }

    /// Headless playhead at the current frame rate
    pub fn playhead(&self, duration: TimeSec) -> Playhead {
        Playhead::new(duration, self.frame_rate())
    }
}
