//! Record Store Contract
//!
//! Persistence boundary for video and annotation records. The core only
//! talks to storage through this trait; `SqliteRecordStore` is the bundled
//! implementation.

use std::path::Path;

use async_trait::async_trait;

use crate::core::CoreResult;

use super::{Annotation, NewAnnotation, Video};

/// CRUD access to videos and their annotations
///
/// Implementations must treat each call as atomic. Deleting a video also
/// deletes every annotation whose `video_id` matches it.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists all registered videos
    async fn list_videos(&self) -> CoreResult<Vec<Video>>;

    /// Looks up a single video
    async fn get_video(&self, id: &str) -> CoreResult<Option<Video>>;

    /// Registers a video under a freshly generated id
    async fn create_video(&self, name: &str, file: &Path) -> CoreResult<Video>;

    /// Deletes a video and all of its annotations
    async fn delete_video(&self, id: &str) -> CoreResult<()>;

    /// Lists annotations for a video, in no particular order
    async fn list_annotations(&self, video_id: &str) -> CoreResult<Vec<Annotation>>;

    /// Creates an annotation and assigns its id
    async fn create_annotation(&self, draft: NewAnnotation) -> CoreResult<Annotation>;

    /// Creates many annotations at once (all or nothing)
    async fn create_annotations(&self, drafts: Vec<NewAnnotation>) -> CoreResult<Vec<Annotation>>;

    /// Replaces an existing annotation
    async fn update_annotation(&self, annotation: &Annotation) -> CoreResult<()>;

    /// Deletes an annotation
    async fn delete_annotation(&self, id: &str) -> CoreResult<()>;
}
