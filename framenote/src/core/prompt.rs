//! User Prompt
//!
//! Host capability for confirmations and notices. Destructive actions ask
//! through `confirm` before touching the store.

use std::fmt;

use serde::Serialize;

/// Messages the core reports to the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notice {
    /// Export requested on an empty list
    NothingToExport,
    /// Import file had a valid header but no usable rows
    NoValidAnnotations,
    /// Import finished
    Imported { count: usize },
    /// Clip extraction failed
    ClipFailed { message: String },
    /// A store call failed
    StorageFailed { message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NothingToExport => write!(f, "No annotations to export."),
            Notice::NoValidAnnotations => write!(f, "No valid annotations found in file."),
            Notice::Imported { count } => {
                write!(f, "Successfully imported {} annotations.", count)
            }
            Notice::ClipFailed { message } => write!(f, "Failed to create clip: {}", message),
            Notice::StorageFailed { message } => write!(f, "Storage error: {}", message),
        }
    }
}

/// Confirmation and notification surface provided by the host
pub trait UserPrompt: Send + Sync {
    /// Asks a yes/no question; `false` aborts the action
    fn confirm(&self, message: &str) -> bool;

    /// Shows a notice
    fn notify(&self, notice: &Notice);
}
