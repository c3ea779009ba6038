//! Annotation Export Module
//!
//! Serializes annotation sets for download:
//! - CSV (round-trips through `parse_csv`)
//! - Plain-text report
//!
//! Also owns the naming rules shared by every downloadable artifact.

pub mod csv;
pub mod txt;

pub use csv::{export_csv, parse_csv, CsvImport, CSV_HEADER};
pub use txt::export_txt;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::timecode::filename_timestamp;
use crate::core::{CoreResult, TimeSec};

use super::annotations::Annotation;

/// MIME type for CSV exports
pub const CSV_MIME: &str = "text/csv";

/// MIME type for plain-text exports
pub const TXT_MIME: &str = "text/plain";

/// MIME type for extracted clips
pub const MP4_MIME: &str = "video/mp4";

// =============================================================================
// Export Format
// =============================================================================

/// Downloadable annotation formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Txt => TXT_MIME,
        }
    }

    /// Renders annotations; `None` when there is nothing to export
    pub fn render(self, annotations: &[Annotation]) -> Option<String> {
        match self {
            ExportFormat::Csv => export_csv(annotations),
            ExportFormat::Txt => export_txt(annotations),
        }
    }

    /// File name for a video's annotation export
    pub fn file_name(self, video_name: &str) -> String {
        format!(
            "{}_annotations.{}",
            sanitize_file_stem(video_name),
            self.extension()
        )
    }
}

// =============================================================================
// Download
// =============================================================================

/// A generated file offered to the user
#[derive(Clone, Debug, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Builds an annotation export download
    pub fn annotations(
        format: ExportFormat,
        video_name: &str,
        annotations: &[Annotation],
    ) -> Option<Self> {
        let content = format.render(annotations)?;
        Some(Self {
            file_name: format.file_name(video_name),
            mime_type: format.mime_type(),
            bytes: content.into_bytes(),
        })
    }

    /// Builds a clip download
    pub fn clip(video_name: &str, start_time: TimeSec, end_time: TimeSec, bytes: Vec<u8>) -> Self {
        Self {
            file_name: clip_file_name(video_name, start_time, end_time),
            mime_type: MP4_MIME,
            bytes,
        }
    }

    /// Writes the download into `dir` and returns the written path
    pub fn save_to(&self, dir: &Path) -> CoreResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        crate::core::fs::atomic_write_bytes(&path, &self.bytes)?;
        Ok(path)
    }
}

// =============================================================================
// Naming
// =============================================================================

/// Lowercases a name and replaces every non-alphanumeric character with `_`
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `{video}_clip_{start}_to_{end}.mp4`
pub fn clip_file_name(video_name: &str, start_time: TimeSec, end_time: TimeSec) -> String {
    format!(
        "{}_clip_{}_to_{}.mp4",
        sanitize_file_stem(video_name),
        filename_timestamp(start_time),
        filename_timestamp(end_time)
    )
}
