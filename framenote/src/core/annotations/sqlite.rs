//! SQLite Record Store
//!
//! Persists videos and annotations in a single SQLite database file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::{CoreError, CoreResult};

use super::{Annotation, NewAnnotation, RecordStore, Video};

/// Default database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "framenote.db";

// =============================================================================
// SQLite Record Store
// =============================================================================

/// Record store backed by SQLite
///
/// A handle is only returned once the schema is in place, so holding one
/// means the store is ready for use.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens (or creates) a database file at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("Failed to open database: {}", e)))?;

        let store = Self::init(conn)?;
        info!("Record store ready at {}", path.display());
        Ok(store)
    }

    /// Creates an in-memory database (for testing)
    pub fn in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CoreError::Storage(format!("Failed to create in-memory database: {}", e))
        })?;

        Self::init(conn)
    }

    /// Returns the default database path inside a data directory
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join(DATABASE_FILE_NAME)
    }

    fn init(conn: Connection) -> CoreResult<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Videos table: registered media files
            CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                added_at TEXT NOT NULL
            );

            -- Annotations table: time-ranged notes per video
            CREATE TABLE IF NOT EXISTS annotations (
                id TEXT PRIMARY KEY,
                video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                start_sec REAL NOT NULL,
                end_sec REAL NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_annotations_video ON annotations(video_id);
            CREATE INDEX IF NOT EXISTS idx_annotations_time ON annotations(video_id, start_sec);
            "#,
        )
        .map_err(|e| CoreError::Storage(format!("Failed to initialize schema: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn video_from_row(row: &Row<'_>) -> rusqlite::Result<Video> {
    let file_path: String = row.get(2)?;
    Ok(Video {
        id: row.get(0)?,
        name: row.get(1)?,
        file: PathBuf::from(file_path),
        added_at: row.get(3)?,
    })
}

fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        id: row.get(0)?,
        video_id: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        text: row.get(4)?,
    })
}

fn insert_annotation(conn: &Connection, draft: NewAnnotation) -> CoreResult<Annotation> {
    let annotation = draft.with_id(new_id());
    conn.execute(
        "INSERT INTO annotations (id, video_id, start_sec, end_sec, text) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            annotation.id,
            annotation.video_id,
            annotation.start_time,
            annotation.end_time,
            annotation.text
        ],
    )
    .map_err(|e| CoreError::Storage(format!("Failed to insert annotation: {}", e)))?;
    Ok(annotation)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_videos(&self) -> CoreResult<Vec<Video>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id, name, file_path, added_at FROM videos ORDER BY added_at, rowid")
            .map_err(|e| CoreError::Storage(format!("Failed to query videos: {}", e)))?;

        let videos = stmt
            .query_map([], video_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| CoreError::Storage(format!("Failed to read videos: {}", e)))?;

        Ok(videos)
    }

    async fn get_video(&self, id: &str) -> CoreResult<Option<Video>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, file_path, added_at FROM videos WHERE id = ?1",
            [id],
            video_from_row,
        )
        .optional()
        .map_err(|e| CoreError::Storage(format!("Failed to read video {}: {}", id, e)))
    }

    async fn create_video(&self, name: &str, file: &Path) -> CoreResult<Video> {
        let video = Video {
            id: new_id(),
            name: name.to_string(),
            file: file.to_path_buf(),
            added_at: chrono::Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO videos (id, name, file_path, added_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                video.id,
                video.name,
                video.file.to_string_lossy(),
                video.added_at
            ],
        )
        .map_err(|e| CoreError::Storage(format!("Failed to insert video: {}", e)))?;

        info!("Added video {} ({})", video.name, video.id);
        Ok(video)
    }

    async fn delete_video(&self, id: &str) -> CoreResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("Failed to begin transaction: {}", e)))?;

        let removed = tx
            .execute("DELETE FROM annotations WHERE video_id = ?1", [id])
            .map_err(|e| CoreError::Storage(format!("Failed to delete annotations: {}", e)))?;
        tx.execute("DELETE FROM videos WHERE id = ?1", [id])
            .map_err(|e| CoreError::Storage(format!("Failed to delete video: {}", e)))?;

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("Failed to commit video deletion: {}", e)))?;

        info!("Deleted video {} and {} annotation(s)", id, removed);
        Ok(())
    }

    async fn list_annotations(&self, video_id: &str) -> CoreResult<Vec<Annotation>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, video_id, start_sec, end_sec, text FROM annotations WHERE video_id = ?1 ORDER BY rowid",
            )
            .map_err(|e| CoreError::Storage(format!("Failed to query annotations: {}", e)))?;

        let annotations = stmt
            .query_map([video_id], annotation_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| CoreError::Storage(format!("Failed to read annotations: {}", e)))?;

        Ok(annotations)
    }

    async fn create_annotation(&self, draft: NewAnnotation) -> CoreResult<Annotation> {
        let conn = self.conn.lock().await;
        let annotation = insert_annotation(&conn, draft)?;
        debug!("Created annotation {}", annotation.id);
        Ok(annotation)
    }

    async fn create_annotations(&self, drafts: Vec<NewAnnotation>) -> CoreResult<Vec<Annotation>> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("Failed to begin transaction: {}", e)))?;

        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            created.push(insert_annotation(&tx, draft)?);
        }

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("Failed to commit annotations: {}", e)))?;

        info!("Created {} annotation(s) in bulk", created.len());
        Ok(created)
    }

    async fn update_annotation(&self, annotation: &Annotation) -> CoreResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE annotations SET video_id = ?2, start_sec = ?3, end_sec = ?4, text = ?5 WHERE id = ?1",
                params![
                    annotation.id,
                    annotation.video_id,
                    annotation.start_time,
                    annotation.end_time,
                    annotation.text
                ],
            )
            .map_err(|e| CoreError::Storage(format!("Failed to update annotation: {}", e)))?;

        if changed == 0 {
            return Err(CoreError::AnnotationNotFound(annotation.id.clone()));
        }
        debug!("Updated annotation {}", annotation.id);
        Ok(())
    }

    async fn delete_annotation(&self, id: &str) -> CoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM annotations WHERE id = ?1", [id])
            .map_err(|e| CoreError::Storage(format!("Failed to delete annotation: {}", e)))?;
        debug!("Deleted annotation {}", id);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
