//! Plain-text annotation report

use crate::core::annotations::Annotation;
use crate::core::timecode::format_timestamp;

const BLOCK_SEPARATOR: &str = "\n---\n\n";

/// Renders one block per annotation; `None` for an empty list
pub fn export_txt(annotations: &[Annotation]) -> Option<String> {
    if annotations.is_empty() {
        return None;
    }

    let blocks: Vec<String> = annotations
        .iter()
        .enumerate()
        .map(|(index, annotation)| {
            format!(
                "Annotation {}:\nTime: {} --> {}\nText: {}\n",
                index + 1,
                format_timestamp(annotation.start_time),
                format_timestamp(annotation.end_time),
                annotation.text
            )
        })
        .collect();

    Some(blocks.join(BLOCK_SEPARATOR))
}
