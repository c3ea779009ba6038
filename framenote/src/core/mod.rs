//! FrameNote Core
//!
//! Frame-accurate video annotation: timecode arithmetic, the annotation
//! lifecycle, persistence, CSV/TXT exchange, and clip extraction.

pub mod annotations;
pub mod clips;
pub mod export;
pub mod fs;
pub mod playback;
pub mod popover;
pub mod prompt;
pub mod settings;
pub mod timecode;
pub mod workspace;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
