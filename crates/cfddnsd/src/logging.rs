//! Log sink: every line goes to an appended file and to stderr

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global subscriber
///
/// The file stays open for the life of the process.
pub fn init(level: Level, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::default()
        .add_directive(level.into())
        .add_directive("hyper_util=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(())
}
