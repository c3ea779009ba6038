//! Filesystem utilities.
//!
//! Crash-tolerant writes for settings and downloads, plus validation of
//! media paths handed in by the host.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// Path Validation
// =============================================================================

/// Resolves a user-supplied media path to an absolute path of an existing file.
///
/// Remote URLs are rejected; relative paths are resolved against the current
/// directory.
pub fn resolve_media_file(path: &Path) -> CoreResult<PathBuf> {
    let raw = path.to_string_lossy();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(
            "Media path is empty".to_string(),
        ));
    }

    if trimmed.contains("://") {
        return Err(CoreError::ValidationError(format!(
            "Media path must be a local file, not a URL: {}",
            trimmed
        )));
    }

    let resolved = std::fs::canonicalize(trimmed)
        .map_err(|_| CoreError::FileNotFound(trimmed.to_string()))?;

    let meta = std::fs::metadata(&resolved)?;
    if !meta.is_file() {
        return Err(CoreError::ValidationError(format!(
            "Media path is not a file: {}",
            resolved.display()
        )));
    }

    Ok(resolved)
}

// =============================================================================
// Atomic Writes
// =============================================================================

/// Write a file atomically (temp file + rename).
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_path(path, "tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)
}

/// Write a JSON file atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| suffix.to_string());
    path.with_file_name(format!("{file_name}.{suffix}"))
}

fn atomic_replace(dest: &Path, src_tmp: &Path) -> CoreResult<()> {
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    // rename-over-existing is not portable; swap through a backup
    let bak = sibling_path(dest, "bak");
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(src_tmp);
            Err(CoreError::IoError(e))
        }
    }
}
