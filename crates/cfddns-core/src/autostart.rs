//! Login-startup registration toggle
//!
//! [`AutostartRegistrar::toggle`] queries the OS entry first, so repeated
//! calls converge instead of stacking:
//!
//! | entry exists | explicit | cfg.autostart | action                 |
//! |--------------|----------|---------------|------------------------|
//! | yes          | yes      | any           | remove, autostart=false |
//! | yes          | no       | any           | leave untouched        |
//! | no           | any      | true          | create, autostart=true |
//! | no           | yes      | false         | create, autostart=true |
//! | no           | no       | false         | nothing                |
//!
//! Only the `autostart` key of the configuration file is rewritten. A
//! missing or unparseable file fails the toggle before the OS entry is
//! touched.
//!
//! Registry calls may spawn helper processes, so they run on the blocking
//! pool.
//!
//! A permission refusal is reported with a remediation hint. When the
//! process is not elevated the registrar may relaunch itself elevated and
//! raise the exit flag.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Configuration;
use crate::control::ControlFlags;
use crate::error::{Error, Result};
use crate::notify::{Notifier, NotifyPrefs};
use crate::store::ConfigStore;
use crate::traits::{Severity, StartupRegistry};

/// User-facing message when the OS refuses the registry change
pub const RUN_AS_ADMIN_MESSAGE: &str = "Please run the application as admin!";

/// Result of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutostartChange {
    /// Entry created, `autostart = true` persisted
    Enabled,
    /// Entry removed, `autostart = false` persisted
    Disabled,
    /// Nothing to do
    Unchanged,
    /// An elevated instance was launched and exit was requested
    ElevationRequested,
    /// The change failed and was reported
    Failed,
}

/// Installs or removes the agent from OS login startup
pub struct AutostartRegistrar {
    registry: Arc<dyn StartupRegistry>,
    store: Arc<ConfigStore>,
    notifier: Arc<Notifier>,
    flags: ControlFlags,
    executable: PathBuf,
}

impl AutostartRegistrar {
    /// Create a registrar whose entry points at `executable`
    pub fn new(
        registry: Arc<dyn StartupRegistry>,
        store: Arc<ConfigStore>,
        notifier: Arc<Notifier>,
        flags: ControlFlags,
        executable: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            flags,
            executable: executable.into(),
        }
    }

    /// Toggle (explicit) or reconcile (implicit) the startup entry
    pub async fn toggle(&self, explicit: bool) -> AutostartChange {
        let loaded = self.store.load_existing().await.and_then(|cfg| {
            cfg.ok_or_else(|| {
                Error::storage(format!(
                    "Configuration {} not found",
                    self.store.path().display()
                ))
            })
        });
        let cfg = match loaded {
            Ok(cfg) => cfg,
            Err(e) => {
                let prefs = NotifyPrefs::from(&Configuration::default());
                self.notifier.report(Severity::Error, &e.to_string(), explicit, prefs);
                return AutostartChange::Failed;
            }
        };
        let prefs = NotifyPrefs::from(&cfg);

        match self.apply(cfg, explicit).await {
            Ok(AutostartChange::Enabled) => {
                self.notifier.report(Severity::Info, "Startup enabled.", explicit, prefs);
                AutostartChange::Enabled
            }
            Ok(AutostartChange::Disabled) => {
                self.notifier.report(Severity::Info, "Startup disabled.", explicit, prefs);
                AutostartChange::Disabled
            }
            Ok(change) => change,
            Err(Error::PermissionDenied(detail)) => {
                tracing::warn!("Startup registration refused: {}", detail);
                self.notifier.report(Severity::Error, RUN_AS_ADMIN_MESSAGE, explicit, prefs);
                self.elevate().await
            }
            Err(e) => {
                self.notifier.report(Severity::Error, &e.to_string(), explicit, prefs);
                AutostartChange::Failed
            }
        }
    }

    async fn apply(&self, cfg: Configuration, explicit: bool) -> Result<AutostartChange> {
        if self.on_registry(|registry| registry.is_registered()).await? {
            if !explicit {
                tracing::debug!("Startup entry present, leaving it untouched");
                return Ok(AutostartChange::Unchanged);
            }

            self.on_registry(|registry| registry.unregister()).await?;
            self.store.set_autostart(false).await?;
            return Ok(AutostartChange::Disabled);
        }

        if !(cfg.autostart || explicit) {
            return Ok(AutostartChange::Unchanged);
        }

        let executable = self.executable.clone();
        self.on_registry(move |registry| registry.register(&executable)).await?;
        self.store.set_autostart(true).await?;
        Ok(AutostartChange::Enabled)
    }

    async fn elevate(&self) -> AutostartChange {
        let elevated = self
            .on_registry(|registry| Ok(registry.is_elevated()))
            .await
            .unwrap_or(false);
        if elevated {
            return AutostartChange::Failed;
        }

        match self.on_registry(|registry| registry.request_elevation()).await {
            Ok(true) => {
                tracing::info!("Relaunched elevated, exiting this instance");
                self.flags.request_exit();
                AutostartChange::ElevationRequested
            }
            Ok(false) => AutostartChange::Failed,
            Err(e) => {
                tracing::warn!("Elevation request failed: {}", e);
                AutostartChange::Failed
            }
        }
    }

    /// Run a registry call on the blocking pool
    async fn on_registry<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StartupRegistry) -> Result<T> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || call(registry.as_ref()))
            .await
            .map_err(|e| Error::Other(format!("Startup registry task failed: {}", e)))?
    }
}
