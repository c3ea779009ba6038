//! FrameNote Core Library
//!
//! Frame-accurate video annotation engine. Hosts (the bundled CLI, or any
//! other front end) drive a `core::workspace::Workspace` and supply the
//! playback, prompt, and clip extraction capabilities.

pub mod core;

use std::path::Path;
use std::sync::OnceLock;

use tracing_subscriber::prelude::*;

// =============================================================================
// Logging
// =============================================================================

/// Log file prefix inside the log directory
pub const LOG_FILE_NAME: &str = "framenote.log";

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Installs the global tracing subscriber
///
/// Logs go to stderr, and additionally to a daily rolling file when
/// `log_dir` is given. `RUST_LOG` overrides the default `info` level.
/// Calling this more than once is harmless.
pub fn init_logging(log_dir: Option<&Path>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions));

    let file_layer = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    // Already initialized (tests, repeated calls)
    let _ = tracing::subscriber::set_global_default(subscriber);
}
