//! Annotation Manager
//!
//! Async driver around `AnnotationSession`: owns the open video, its sorted
//! annotation list, and the clip slot, and issues record store calls.
//!
//! State lives behind a `tokio::sync::Mutex` that is released before every
//! store or extractor await, so a host can keep issuing actions while a call
//! is pending. Refreshes are tagged with a sequence number and the video they
//! fetched for; results that are no longer current are dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::core::clips::{ClipExtractor, ClipProgress, ClipRequest, ClipSlot};
use crate::core::export::{parse_csv, Download, ExportFormat};
use crate::core::playback::PlaybackControl;
use crate::core::prompt::{Notice, UserPrompt};
use crate::core::{CoreError, CoreResult, TimeSec, VideoId};

use super::{
    sort_by_start, Annotation, AnnotationSession, CommitPlan, NewAnnotation, PendingRange,
    RecordStore, SessionState, Video,
};

const PROGRESS_CHANNEL_CAPACITY: usize = 32;

#[derive(Default)]
struct ManagerState {
    video: Option<Video>,
    annotations: Vec<Annotation>,
    session: AnnotationSession,
    /// Last refresh sequence handed out
    issued_seq: u64,
    /// Sequence of the refresh whose result is currently shown
    applied_seq: u64,
}

impl ManagerState {
    fn open_video_id(&self) -> Option<VideoId> {
        self.video.as_ref().map(|v| v.id.clone())
    }

    fn require_video(&self) -> CoreResult<&Video> {
        self.video.as_ref().ok_or(CoreError::NoVideoOpen)
    }

    fn find(&self, annotation_id: &str) -> CoreResult<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.id == annotation_id)
            .ok_or_else(|| CoreError::AnnotationNotFound(annotation_id.to_string()))
    }
}

/// Annotation lifecycle for the currently open video
pub struct AnnotationManager {
    store: Arc<dyn RecordStore>,
    state: Mutex<ManagerState>,
    clips: ClipSlot,
}

impl AnnotationManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            state: Mutex::new(ManagerState::default()),
            clips: ClipSlot::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    // =========================================================================
    // Video Context
    // =========================================================================

    /// Switches to `video`, dropping the previous session, and loads its annotations
    pub async fn open_video(&self, video: Video) -> CoreResult<()> {
        {
            let mut state = self.state.lock().await;
            info!("Opening video {} ({})", video.name, video.id);
            state.video = Some(video);
            state.annotations.clear();
            state.session.reset();
        }
        self.refresh().await
    }

    /// Closes the open video, if any
    pub async fn close_video(&self) {
        let mut state = self.state.lock().await;
        state.video = None;
        state.annotations.clear();
        state.session.reset();
    }

    pub async fn current_video(&self) -> Option<Video> {
        self.state.lock().await.video.clone()
    }

    /// Re-fetches the open video's annotations and sorts them by start time
    ///
    /// The result is discarded if another video was opened or a newer
    /// refresh was applied in the meantime.
    pub async fn refresh(&self) -> CoreResult<()> {
        let (video_id, seq) = {
            let mut state = self.state.lock().await;
            let Some(video_id) = state.open_video_id() else {
                return Ok(());
            };
            state.issued_seq += 1;
            (video_id, state.issued_seq)
        };

        let mut annotations = self.store.list_annotations(&video_id).await?;
        sort_by_start(&mut annotations);

        let mut state = self.state.lock().await;
        let still_open = state.open_video_id().as_deref() == Some(video_id.as_str());
        if !still_open || seq < state.applied_seq {
            debug!(
                "Discarding stale refresh #{} for video {} ({} annotations)",
                seq,
                video_id,
                annotations.len()
            );
            return Ok(());
        }

        state.annotations = annotations;
        state.applied_seq = seq;
        Ok(())
    }

    /// Refresh following a committed write; failures leave the old list in place
    async fn refresh_after_write(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Refresh after write failed: {}", e);
        }
    }

    /// Annotations of the open video, sorted by start time
    pub async fn annotations(&self) -> Vec<Annotation> {
        self.state.lock().await.annotations.clone()
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn session_state(&self) -> SessionState {
        self.state.lock().await.session.state()
    }

    pub async fn pending_range(&self) -> PendingRange {
        self.state.lock().await.session.range()
    }

    pub async fn editing(&self) -> Option<Annotation> {
        self.state.lock().await.session.editing().cloned()
    }

    /// Text to pre-fill the annotation input with
    pub async fn seed_text(&self) -> String {
        self.state.lock().await.session.seed_text().to_string()
    }

    pub async fn mark_start(&self, time: TimeSec) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.require_video()?;
        state.session.mark_start(time)
    }

    pub async fn mark_end(&self, time: TimeSec) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.require_video()?;
        state.session.mark_end(time)
    }

    /// Loads an annotation from the current list into the editor
    pub async fn begin_edit(&self, annotation_id: &str) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let annotation = state.find(annotation_id)?.clone();
        state.session.begin_edit(annotation);
        Ok(())
    }

    /// Drops pending marks and any edit, without a store call
    pub async fn cancel_edit(&self) {
        self.state.lock().await.session.reset();
    }

    /// Commits the session: creates a new annotation or updates the edited one
    ///
    /// Validation failures never reach the store. On a store failure the
    /// session and list are left as they were. Marks or edits made while the
    /// store call is pending are kept.
    pub async fn save(&self, text: &str) -> CoreResult<Annotation> {
        let (video_id, generation, plan) = {
            let state = self.state.lock().await;
            let video_id = state.require_video()?.id.clone();
            let plan = state.session.plan_commit(&video_id, text)?;
            (video_id, state.session.generation(), plan)
        };

        let saved = match plan {
            CommitPlan::Create(draft) => self.store.create_annotation(draft).await?,
            CommitPlan::Update(annotation) => {
                self.store.update_annotation(&annotation).await?;
                annotation
            }
        };
        info!(
            "Saved annotation {} ({:.3}-{:.3})",
            saved.id, saved.start_time, saved.end_time
        );

        {
            let mut state = self.state.lock().await;
            let same_video = state.open_video_id().as_deref() == Some(video_id.as_str());
            if same_video && state.session.generation() == generation {
                state.session.reset();
            } else {
                debug!("Session changed during save of {}, keeping it", saved.id);
            }
        }

        self.refresh_after_write().await;
        Ok(saved)
    }

    /// Deletes an annotation after confirmation; returns false if declined
    pub async fn delete(&self, annotation_id: &str, prompt: &dyn UserPrompt) -> CoreResult<bool> {
        if !prompt.confirm("Are you sure you want to delete this annotation?") {
            return Ok(false);
        }

        self.store.delete_annotation(annotation_id).await?;
        info!("Deleted annotation {}", annotation_id);

        {
            let mut state = self.state.lock().await;
            if state.session.on_deleted(annotation_id) {
                debug!("Cancelled edit of deleted annotation {}", annotation_id);
            }
        }

        self.refresh_after_write().await;
        Ok(true)
    }

    /// Seeks playback to the start of an annotation
    pub async fn select(
        &self,
        annotation_id: &str,
        playback: &mut dyn PlaybackControl,
    ) -> CoreResult<TimeSec> {
        let start_time = self.state.lock().await.find(annotation_id)?.start_time;
        playback.seek(start_time);
        Ok(start_time)
    }

    // =========================================================================
    // Import / Export
    // =========================================================================

    /// Imports CSV rows into the open video after confirmation
    ///
    /// Returns the number of annotations created.
    pub async fn import_csv(&self, content: &str, prompt: &dyn UserPrompt) -> CoreResult<usize> {
        let video_id = self.state.lock().await.require_video()?.id.clone();

        let import = parse_csv(content)?;
        if import.drafts.is_empty() {
            prompt.notify(&Notice::NoValidAnnotations);
            return Ok(0);
        }
        if import.skipped_rows > 0 {
            debug!("Import skipped {} rows", import.skipped_rows);
        }

        let question = format!(
            "Found {} annotations. Do you want to add them to this video? This cannot be undone.",
            import.drafts.len()
        );
        if !prompt.confirm(&question) {
            return Ok(0);
        }

        let drafts: Vec<NewAnnotation> = import
            .drafts
            .into_iter()
            .map(|d| d.for_video(&video_id))
            .collect();
        let created = self.store.create_annotations(drafts).await?;
        let count = created.len();
        info!("Imported {} annotations into video {}", count, video_id);

        self.refresh_after_write().await;
        prompt.notify(&Notice::Imported { count });
        Ok(count)
    }

    /// Renders the current list; `None` when there is nothing to export
    pub async fn export(&self, format: ExportFormat) -> CoreResult<Option<Download>> {
        let state = self.state.lock().await;
        let video = state.require_video()?;
        Ok(Download::annotations(format, &video.name, &state.annotations))
    }

    // =========================================================================
    // Clips
    // =========================================================================

    /// Extracts the annotation's range from the open video
    ///
    /// Returns `Ok(None)` without calling the extractor while another
    /// extraction is in flight.
    pub async fn download_clip(
        &self,
        annotation_id: &str,
        extractor: &dyn ClipExtractor,
    ) -> CoreResult<Option<Download>> {
        let (video, annotation) = {
            let state = self.state.lock().await;
            let video = state.require_video()?.clone();
            let annotation = state.find(annotation_id)?.clone();
            (video, annotation)
        };

        let Some(permit) = self.clips.try_acquire(annotation_id) else {
            debug!("Clip already in flight, ignoring request for {}", annotation_id);
            return Ok(None);
        };

        let request = ClipRequest::new(
            video.file.clone(),
            annotation.start_time,
            annotation.end_time,
        )?;
        let (tx, mut rx) = mpsc::channel::<f64>(PROGRESS_CHANNEL_CAPACITY);

        let (result, ()) = tokio::join!(extractor.extract(&request, tx), async {
            while let Some(percent) = rx.recv().await {
                permit.set_progress(percent);
            }
        });

        let output = result.map_err(|e| {
            error!("Clip extraction failed for {}: {}", annotation_id, e);
            e
        })?;

        Ok(Some(Download::clip(
            &video.name,
            annotation.start_time,
            annotation.end_time,
            output.bytes,
        )))
    }

    /// Progress of the in-flight clip extraction, if any
    pub fn clip_progress(&self) -> Option<ClipProgress> {
        self.clips.progress()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;

    /// Pauses `list_annotations` for one video until released
    pub struct ListGate {
        pub video_id: String,
        pub entered: Arc<Notify>,
        pub release: Arc<Notify>,
    }

    /// In-memory store with failure injection and call counting
    #[derive(Default)]
    pub struct MockStore {
        videos: StdMutex<Vec<Video>>,
        annotations: StdMutex<Vec<Annotation>>,
        next_id: AtomicUsize,
        pub fail_writes: AtomicBool,
        pub fail_lists: AtomicBool,
        pub write_calls: AtomicUsize,
        gate: StdMutex<Option<ListGate>>,
        create_gate: StdMutex<Option<(Arc<Notify>, Arc<Notify>)>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn video(&self, id: &str, name: &str) -> Video {
            let video = Video {
                id: id.to_string(),
                name: name.to_string(),
                file: PathBuf::from(format!("/videos/{}.mp4", id)),
                added_at: "2024-01-01T00:00:00Z".to_string(),
            };
            self.videos.lock().unwrap().push(video.clone());
            video
        }

        pub fn seed(&self, video_id: &str, start: f64, end: f64, text: &str) -> Annotation {
            let id = format!("ann_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let annotation = NewAnnotation::new(video_id, start, end, text).with_id(id);
            self.annotations.lock().unwrap().push(annotation.clone());
            annotation
        }

        pub fn set_gate(&self, video_id: &str) -> (Arc<Notify>, Arc<Notify>) {
            let entered = Arc::new(Notify::new());
            let release = Arc::new(Notify::new());
            *self.gate.lock().unwrap() = Some(ListGate {
                video_id: video_id.to_string(),
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            });
            (entered, release)
        }

        /// Pauses the next `create_annotation` until released
        pub fn set_create_gate(&self) -> (Arc<Notify>, Arc<Notify>) {
            let entered = Arc::new(Notify::new());
            let release = Arc::new(Notify::new());
            *self.create_gate.lock().unwrap() = Some((Arc::clone(&entered), Arc::clone(&release)));
            (entered, release)
        }

        pub fn writes(&self) -> usize {
            self.write_calls.load(Ordering::SeqCst)
        }

        pub fn stored(&self, video_id: &str) -> Vec<Annotation> {
            self.annotations
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.video_id == video_id)
                .cloned()
                .collect()
        }

        fn begin_write(&self) -> CoreResult<()> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CoreError::Storage("disk full".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecordStore for MockStore {
        async fn list_videos(&self) -> CoreResult<Vec<Video>> {
            Ok(self.videos.lock().unwrap().clone())
        }

        async fn get_video(&self, id: &str) -> CoreResult<Option<Video>> {
            Ok(self.videos.lock().unwrap().iter().find(|v| v.id == id).cloned())
        }

        async fn create_video(&self, name: &str, file: &Path) -> CoreResult<Video> {
            self.begin_write()?;
            let id = format!("vid_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let video = Video {
                id,
                name: name.to_string(),
                file: file.to_path_buf(),
                added_at: "2024-01-01T00:00:00Z".to_string(),
            };
            self.videos.lock().unwrap().push(video.clone());
            Ok(video)
        }

        async fn delete_video(&self, id: &str) -> CoreResult<()> {
            self.begin_write()?;
            self.videos.lock().unwrap().retain(|v| v.id != id);
            self.annotations.lock().unwrap().retain(|a| a.video_id != id);
            Ok(())
        }

        async fn list_annotations(&self, video_id: &str) -> CoreResult<Vec<Annotation>> {
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(CoreError::Storage("connection lost".to_string()));
            }
            let snapshot = self.stored(video_id);
            let gate = {
                let mut slot = self.gate.lock().unwrap();
                if slot.as_ref().is_some_and(|g| g.video_id == video_id) {
                    slot.take()
                } else {
                    None
                }
            };
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            Ok(snapshot)
        }

        async fn create_annotation(&self, draft: NewAnnotation) -> CoreResult<Annotation> {
            let gate = self.create_gate.lock().unwrap().take();
            if let Some((entered, release)) = gate {
                entered.notify_one();
                release.notified().await;
            }
            self.begin_write()?;
            let id = format!("ann_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let annotation = draft.with_id(id);
            self.annotations.lock().unwrap().push(annotation.clone());
            Ok(annotation)
        }

        async fn create_annotations(
            &self,
            drafts: Vec<NewAnnotation>,
        ) -> CoreResult<Vec<Annotation>> {
            self.begin_write()?;
            let mut created = Vec::with_capacity(drafts.len());
            for draft in drafts {
                let id = format!("ann_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
                created.push(draft.with_id(id));
            }
            self.annotations
                .lock()
                .unwrap()
                .extend(created.iter().cloned());
            Ok(created)
        }

        async fn update_annotation(&self, annotation: &Annotation) -> CoreResult<()> {
            self.begin_write()?;
            let mut list = self.annotations.lock().unwrap();
            let existing = list
                .iter_mut()
                .find(|a| a.id == annotation.id)
                .ok_or_else(|| CoreError::AnnotationNotFound(annotation.id.clone()))?;
            *existing = annotation.clone();
            Ok(())
        }

        async fn delete_annotation(&self, id: &str) -> CoreResult<()> {
            self.begin_write()?;
            self.annotations.lock().unwrap().retain(|a| a.id != id);
            Ok(())
        }
    }
}
