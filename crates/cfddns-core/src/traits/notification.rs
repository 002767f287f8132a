// # Notification Sink Trait
//
// Renders a native desktop notification. Delivery failure is never
// observable to the reconciliation loop: the Notifier dispatches on a
// detached thread and only logs a failed delivery.

use std::fmt;

/// Severity of a reported event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Desktop notification renderer
pub trait NotificationSink: Send + Sync {
    /// Show `message`; may block for as long as the platform takes
    fn show(&self, severity: Severity, message: &str) -> Result<(), crate::Error>;
}
