//! FrameNote CLI
//!
//! Headless host for the annotation engine: registers videos, edits
//! annotations, and writes exports and clips to disk.

use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod commands;
mod prompt;

use cli::Cli;
use framenote_lib::core::settings::default_data_dir;
use framenote_lib::core::workspace::Workspace;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    framenote_lib::init_logging(Some(&data_dir.join("logs")));

    let mut workspace = Workspace::open(&data_dir)
        .with_context(|| format!("Failed to open workspace at {}", data_dir.display()))?;

    commands::run(&cli, &mut workspace).await
}
