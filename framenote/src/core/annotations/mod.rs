//! Video Annotation System
//!
//! Time-ranged text annotations attached to registered videos.
//!
//! ## Layout
//!
//! - `models`: persisted records and their invariants
//! - `store`: the `RecordStore` persistence contract
//! - `sqlite`: bundled SQLite implementation of the contract
//! - `session`: pure create/edit state machine
//! - `manager`: async driver tying session, store, export and clips together

pub mod manager;
pub mod models;
pub mod session;
pub mod sqlite;
pub mod store;

pub use manager::AnnotationManager;
pub use models::*;
pub use session::{AnnotationSession, CommitPlan, PendingRange, SessionState};
pub use sqlite::{SqliteRecordStore, DATABASE_FILE_NAME};
pub use store::RecordStore;
