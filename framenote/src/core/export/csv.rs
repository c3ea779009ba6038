//! CSV Codec
//!
//! Exports annotations as CSV and imports them back as drafts.
//!
//! # Format
//!
//! ```text
//! start_time_seconds,start_time_formatted,end_time_seconds,end_time_formatted,annotation_text
//! 0.500,00:00.500,2.250,00:02.250,"hello ""world"""
//! ```
//!
//! The text column is always quoted with embedded quotes doubled. Commas and
//! line breaks inside the text are not escaped further; the importer rejoins
//! trailing fields to tolerate commas.

use serde::Serialize;
use tracing::debug;

use crate::core::annotations::{validate_text, validate_time_range, Annotation, DraftAnnotation};
use crate::core::timecode::format_timestamp;
use crate::core::{CoreError, CoreResult, TimeSec};

/// Column names, in order
pub const CSV_COLUMNS: [&str; 5] = [
    "start_time_seconds",
    "start_time_formatted",
    "end_time_seconds",
    "end_time_formatted",
    "annotation_text",
];

/// Header row of every export
pub const CSV_HEADER: &str =
    "start_time_seconds,start_time_formatted,end_time_seconds,end_time_formatted,annotation_text";

/// Result of parsing an import file
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImport {
    /// Rows that parsed into valid drafts, in file order
    pub drafts: Vec<DraftAnnotation>,
    /// Non-blank data rows that were dropped
    pub skipped_rows: usize,
}

// =============================================================================
// Export
// =============================================================================

/// Exports annotations to CSV; `None` for an empty list
pub fn export_csv(annotations: &[Annotation]) -> Option<String> {
    if annotations.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(annotations.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for annotation in annotations {
        lines.push(format!(
            "{:.3},{},{:.3},{},{}",
            annotation.start_time,
            format_timestamp(annotation.start_time),
            annotation.end_time,
            format_timestamp(annotation.end_time),
            quote_field(&annotation.text)
        ));
    }

    Some(lines.join("\n"))
}

fn quote_field(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

// =============================================================================
// Import
// =============================================================================

/// Parses CSV produced by `export_csv`
///
/// Fails only when the header does not match; malformed rows are skipped.
pub fn parse_csv(content: &str) -> CoreResult<CsvImport> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines();

    let header = lines
        .next()
        .ok_or_else(|| CoreError::ImportFormat("File is empty".to_string()))?;
    check_header(header)?;

    let mut import = CsvImport::default();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line) {
            Some(draft) => import.drafts.push(draft),
            None => {
                debug!("Skipping CSV row {}", line_no + 2);
                import.skipped_rows += 1;
            }
        }
    }

    Ok(import)
}

fn check_header(header: &str) -> CoreResult<()> {
    let fields: Vec<&str> = header.split(',').collect();
    if fields != CSV_COLUMNS {
        return Err(CoreError::ImportFormat(format!(
            "Expected header '{}', found '{}'",
            CSV_HEADER,
            header
        )));
    }
    Ok(())
}

fn parse_row(line: &str) -> Option<DraftAnnotation> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < CSV_COLUMNS.len() {
        return None;
    }

    let start_time = parse_seconds(parts[0])?;
    let end_time = parse_seconds(parts[2])?;
    let text = unquote_field(&parts[4..].join(","));

    validate_time_range(start_time, end_time).ok()?;
    validate_text(&text).ok()?;

    Some(DraftAnnotation {
        start_time,
        end_time,
        text,
    })
}

fn parse_seconds(field: &str) -> Option<TimeSec> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn unquote_field(field: &str) -> String {
    let inner = if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        &field[1..field.len() - 1]
    } else {
        field
    };
    inner.replace("\"\"", "\"")
}

// =============================================================================
// Tests
// =============================================================================
