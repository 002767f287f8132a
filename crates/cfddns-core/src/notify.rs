//! Notification and logging policy
//!
//! Every event is logged. Whether a desktop notification is shown as well is
//! decided by [`should_notify`]:
//!
//! | forced | silent | severity | notify_on_success | notify |
//! |--------|--------|----------|-------------------|--------|
//! | yes    | any    | any      | any               | yes    |
//! | no     | yes    | any      | any               | no     |
//! | no     | no     | error    | any               | yes    |
//! | no     | no     | info     | yes               | yes    |
//! | no     | no     | info     | no                | no     |
//!
//! Dispatch happens on a detached thread and never blocks or fails the caller.

use std::sync::Arc;

use crate::config::Configuration;
use crate::traits::{NotificationSink, Severity};

/// The configuration flags the policy depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyPrefs {
    pub silent: bool,
    pub notify_on_success: bool,
}

impl From<&Configuration> for NotifyPrefs {
    fn from(cfg: &Configuration) -> Self {
        Self {
            silent: cfg.silent,
            notify_on_success: cfg.notify_on_success,
        }
    }
}

/// Decide whether an event surfaces as a desktop notification
pub fn should_notify(severity: Severity, forced: bool, prefs: NotifyPrefs) -> bool {
    if forced {
        return true;
    }
    if prefs.silent {
        return false;
    }
    match severity {
        Severity::Error => true,
        Severity::Info => prefs.notify_on_success,
    }
}

/// Logs every event and forwards the ones the policy selects to a sink
///
/// Constructed once at startup and shared (`Arc<Notifier>`) between the
/// reconciliation loop and the autostart registrar.
#[derive(Clone)]
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
}

impl Notifier {
    /// Notifier rendering through `sink`
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Notifier that only writes the log trail
    pub fn log_only() -> Self {
        Self { sink: None }
    }

    /// Log `message` and, if the policy says so, notify
    ///
    /// Returns whether a notification was dispatched.
    pub fn report(&self, severity: Severity, message: &str, forced: bool, prefs: NotifyPrefs) -> bool {
        match severity {
            Severity::Info => tracing::info!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }

        if !should_notify(severity, forced, prefs) {
            return false;
        }

        let Some(sink) = self.sink.as_ref().map(Arc::clone) else {
            return false;
        };

        let message = message.to_string();
        let spawned = std::thread::Builder::new()
            .name("cfddns-notify".to_string())
            .spawn(move || {
                if let Err(e) = sink.show(severity, &message) {
                    tracing::debug!("Notification delivery failed: {}", e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to dispatch notification: {}", e);
            return false;
        }
        true
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
