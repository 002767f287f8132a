//! Desktop notifications through the platform's own notifier
//!
//! - Linux/BSD: `notify-send`
//! - macOS: `osascript` (`display notification`)
//! - Windows: PowerShell toast via `Windows.UI.Notifications`
//!
//! Runs on the notifier's detached thread, so blocking until the helper
//! exits is fine.

use cfddns_core::traits::{NotificationSink, Severity};
use cfddns_core::{Error, Result};
use std::process::{Command, Stdio};

const TITLE: &str = "cfddns";

/// Shells out to the platform notifier
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for DesktopNotifier {
    fn show(&self, severity: Severity, message: &str) -> Result<()> {
        let (program, args) = notification_command(severity, message);
        let status = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Other(format!("Failed to run {}: {}", program, e)))?;

        if !status.success() {
            return Err(Error::Other(format!("{} exited with {}", program, status)));
        }
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn notification_command(_severity: Severity, message: &str) -> (&'static str, Vec<String>) {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(message),
        TITLE
    );
    ("osascript", vec!["-e".to_string(), script])
}

#[cfg(windows)]
fn notification_command(_severity: Severity, message: &str) -> (&'static str, Vec<String>) {
    let script = format!(
        "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] > $null; \
         $t = [Windows.UI.Notifications.ToastNotificationManager]::GetTemplateContent([Windows.UI.Notifications.ToastTemplateType]::ToastText02); \
         $x = $t.GetElementsByTagName('text'); \
         $x.Item(0).AppendChild($t.CreateTextNode({title})) > $null; \
         $x.Item(1).AppendChild($t.CreateTextNode({message})) > $null; \
         [Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier({title}).Show([Windows.UI.Notifications.ToastNotification]::new($t))",
        title = powershell_quote(TITLE),
        message = powershell_quote(message),
    );
    (
        "powershell",
        vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            script,
        ],
    )
}

#[cfg(not(any(target_os = "macos", windows)))]
fn notification_command(severity: Severity, message: &str) -> (&'static str, Vec<String>) {
    let urgency = match severity {
        Severity::Info => "normal",
        Severity::Error => "critical",
    };
    (
        "notify-send",
        vec![
            "--app-name".to_string(),
            TITLE.to_string(),
            "--urgency".to_string(),
            urgency.to_string(),
            TITLE.to_string(),
            message.to_string(),
        ],
    )
}

/// Escape text for an AppleScript string literal
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quote text as a PowerShell single-quoted literal
#[cfg_attr(not(windows), allow(dead_code))]
fn powershell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
