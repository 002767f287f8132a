//! Console control surface and shutdown signals
//!
//! Stands in for a tray menu: it only raises the loop's flags or asks the
//! registrar to toggle the startup entry.

use cfddns_core::{AutostartRegistrar, ControlFlags};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const HELP: &str = "Commands: update (u), startup (s), exit (q)";

/// A console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run a cycle now
    Update,
    /// Toggle login startup
    Startup,
    /// Stop the agent
    Exit,
    Help,
}

/// Parse one input line; blank lines are ignored
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let word = line.trim().to_lowercase();
    let command = match word.as_str() {
        "" => return None,
        "update" | "u" => Command::Update,
        "startup" | "s" => Command::Startup,
        "exit" | "quit" | "q" => Command::Exit,
        "help" | "h" | "?" => Command::Help,
        _ => return Some(Err(word)),
    };
    Some(Ok(command))
}

/// Read commands from stdin until it closes
pub fn spawn_console(flags: ControlFlags, registrar: Arc<AutostartRegistrar>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("{}", HELP);
        let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read console input: {}", e);
                    break;
                }
            };

            match parse_command(&line) {
                None => {}
                Some(Ok(Command::Update)) => flags.request_manual_check(),
                Some(Ok(Command::Startup)) => {
                    registrar.toggle(true).await;
                }
                Some(Ok(Command::Exit)) => {
                    flags.request_exit();
                    break;
                }
                Some(Ok(Command::Help)) => info!("{}", HELP),
                Some(Err(word)) => warn!("Unknown command '{}'. {}", word, HELP),
            }
        }

        debug!("Console input closed");
    })
}

/// Raise the exit flag on Ctrl-C (and SIGTERM on Unix)
pub fn spawn_signal_watcher(flags: ControlFlags) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                flags.request_exit();
            }
            Err(e) => warn!("Shutdown signals unavailable: {}", e),
        }
    })
}

#[cfg(unix)]
async fn wait_for_shutdown() -> std::io::Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL-C")
}
