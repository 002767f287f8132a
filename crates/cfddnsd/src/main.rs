// # cfddnsd - Cloudflare DDNS agent
//
// Thin integration layer: all reconciliation, notification and autostart
// policy lives in cfddns-core. This binary is responsible for:
// 1. Reading its own settings from environment variables
// 2. Installing the log sink
// 3. Loading (and if needed interactively completing) the configuration
// 4. Wiring the HTTP resolver, the Cloudflare client and the platform glue
// 5. Running the reconciliation loop until exit is requested
//
// ## Environment
//
// - `CFDDNS_CONFIG`: configuration file (default `<config_dir>/cfddns/config.json`)
// - `CFDDNS_LOG_FILE`: log file, appended (default `<data_local_dir>/cfddns/cfddns.log`)
// - `CFDDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Console
//
// While running, stdin accepts `update`/`u`, `startup`/`s` and `exit`/`q`.
// Ctrl-C (and SIGTERM on Unix) requests exit.

mod control;
mod desktop;
mod logging;
mod prompt;
mod startup;

use anyhow::{Context, Result};
use cfddns_core::{
    AutostartRegistrar, ConfigStore, Configuration, ControlFlags, DdnsEngine, EngineEvent, Notifier,
};
use cfddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};

/// Grace period for blocking stdin readers when the runtime shuts down
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or storage error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process settings, read from the environment
#[derive(Debug)]
struct Settings {
    config_path: PathBuf,
    log_file: PathBuf,
    log_level: Level,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        let config_path = match env::var_os("CFDDNS_CONFIG").filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .context("Cannot determine the configuration directory. Set CFDDNS_CONFIG")?
                .join("cfddns")
                .join("config.json"),
        };

        let log_file = match env::var_os("CFDDNS_LOG_FILE").filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => dirs::data_local_dir()
                .context("Cannot determine the data directory. Set CFDDNS_LOG_FILE")?
                .join("cfddns")
                .join("cfddns.log"),
        };

        let log_level = parse_log_level(&env::var("CFDDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))?;

        Ok(Self {
            config_path,
            log_file,
            log_level,
        })
    }
}

fn parse_log_level(value: &str) -> Result<Level> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "CFDDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = logging::init(settings.log_level, &settings.log_file) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting cfddnsd {}", env!("CARGO_PKG_VERSION"));
    debug!("Settings: {:?}", settings);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(run_agent(settings));
    rt.shutdown_timeout(SHUTDOWN_GRACE);

    info!("cfddnsd stopped ({:?})", code);
    code.into()
}

/// Load the configuration, then run until exit
async fn run_agent(settings: Settings) -> DdnsExitCode {
    let store = Arc::new(ConfigStore::new(
        &settings.config_path,
        Arc::new(prompt::TerminalPrompter::new()),
    ));

    let config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return if e.is_fatal() {
                DdnsExitCode::ConfigError
            } else {
                DdnsExitCode::RuntimeError
            };
        }
    };
    info!("Configuration loaded from {}", store.path().display());
    debug!("{:?}", config);

    match run(config, store).await {
        Ok(()) => DdnsExitCode::CleanShutdown,
        Err(e) => {
            error!("Agent error: {:#}", e);
            DdnsExitCode::RuntimeError
        }
    }
}

async fn run(config: Configuration, store: Arc<ConfigStore>) -> Result<()> {
    let notifier = Arc::new(Notifier::new(Arc::new(desktop::DesktopNotifier::new())));
    let flags = ControlFlags::new();

    let executable = env::current_exe().context("Failed to locate the agent executable")?;
    let registrar = Arc::new(AutostartRegistrar::new(
        startup::platform_registry()?,
        store,
        Arc::clone(&notifier),
        flags.clone(),
        executable,
    ));

    // Create the startup entry if the configuration asks for one
    registrar.toggle(false).await;
    if flags.exit_requested() {
        info!("Handing over to the elevated instance");
        return Ok(());
    }

    let provider = CloudflareProvider::from_config(&config)?;
    let (mut engine, events) = DdnsEngine::new(
        Box::new(cfddns_ip_http::default_resolver()),
        Box::new(provider),
        notifier,
        config,
        flags.clone(),
    )?;

    let watchers = [
        tokio::spawn(log_events(events)),
        control::spawn_signal_watcher(flags.clone()),
        control::spawn_console(flags, registrar),
    ];

    engine.run().await;

    for watcher in watchers {
        watcher.abort();
    }
    Ok(())
}

async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Started {
                record_name,
                interval_secs,
            } => debug!("Engine started for {} ({}s)", record_name, interval_secs),
            EngineEvent::CycleCompleted(report) => debug!(
                "Cycle finished at {}{}: {}",
                report.finished_at.to_rfc3339(),
                if report.forced { " (manual)" } else { "" },
                report.message
            ),
            EngineEvent::Stopped { reason } => debug!("Engine stopped: {}", reason),
        }
    }
}
