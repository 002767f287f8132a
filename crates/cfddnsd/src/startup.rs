//! Per-user login startup entries
//!
//! | Platform  | Entry                                                        |
//! |-----------|--------------------------------------------------------------|
//! | Linux/BSD | `<config_dir>/autostart/cfddns.desktop`                      |
//! | macOS     | `~/Library/LaunchAgents/com.cfddns.agent.plist`              |
//! | Windows   | `HKCU\Software\Microsoft\Windows\CurrentVersion\Run` `cfddns` |
//!
//! A refusal by the OS surfaces as `Error::PermissionDenied`.

#[cfg(not(windows))]
use anyhow::Context;
use cfddns_core::traits::StartupRegistry;
use cfddns_core::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the startup entry
const ENTRY_NAME: &str = "cfddns";

/// The registry for the current platform
pub fn platform_registry() -> anyhow::Result<Arc<dyn StartupRegistry>> {
    #[cfg(windows)]
    {
        Ok(Arc::new(windows::RunKey::new()))
    }

    #[cfg(target_os = "macos")]
    {
        let home = dirs::home_dir().context("Cannot determine the home directory")?;
        Ok(Arc::new(LaunchAgent::new(home.join("Library").join("LaunchAgents"))))
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    {
        let config = dirs::config_dir().context("Cannot determine the configuration directory")?;
        Ok(Arc::new(XdgAutostart::new(config.join("autostart"))))
    }
}

/// Map filesystem errors, keeping permission refusals distinguishable
fn fs_error(action: &str, path: &Path, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::PermissionDenied {
        Error::permission_denied(format!("{} {}: {}", action, path.display(), err))
    } else {
        Error::storage(format!("{} {}: {}", action, path.display(), err))
    }
}

/// Write `content` to `path`, creating parent directories
fn write_entry(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_error("Failed to create", parent, e))?;
    }
    fs::write(path, content).map_err(|e| fs_error("Failed to write", path, e))
}

fn remove_entry(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fs_error("Failed to remove", path, e)),
    }
}

/// XDG autostart `.desktop` entry
#[cfg_attr(any(windows, target_os = "macos"), allow(dead_code))]
pub struct XdgAutostart {
    dir: PathBuf,
}

#[cfg_attr(any(windows, target_os = "macos"), allow(dead_code))]
impl XdgAutostart {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self) -> PathBuf {
        self.dir.join(format!("{}.desktop", ENTRY_NAME))
    }

    fn render(executable: &Path) -> String {
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name={name}\n\
             Comment=Keep a Cloudflare A record on this machine's public IPv4 address\n\
             Exec=\"{exec}\"\n\
             Terminal=false\n\
             X-GNOME-Autostart-enabled=true\n",
            name = ENTRY_NAME,
            exec = executable.display().to_string().replace('"', "\\\""),
        )
    }
}

impl StartupRegistry for XdgAutostart {
    fn is_registered(&self) -> Result<bool> {
        Ok(self.entry_path().is_file())
    }

    fn register(&self, executable: &Path) -> Result<()> {
        let path = self.entry_path();
        write_entry(&path, &Self::render(executable))?;
        tracing::debug!("Wrote autostart entry {}", path.display());
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        remove_entry(&self.entry_path())
    }
}

/// macOS LaunchAgent plist
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub struct LaunchAgent {
    dir: PathBuf,
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
impl LaunchAgent {
    const LABEL: &'static str = "com.cfddns.agent";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self) -> PathBuf {
        self.dir.join(format!("{}.plist", Self::LABEL))
    }

    fn render(executable: &Path) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exec}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#,
            label = Self::LABEL,
            exec = xml_escape(&executable.display().to_string()),
        )
    }
}

impl StartupRegistry for LaunchAgent {
    fn is_registered(&self) -> Result<bool> {
        Ok(self.entry_path().is_file())
    }

    fn register(&self, executable: &Path) -> Result<()> {
        let path = self.entry_path();
        write_entry(&path, &Self::render(executable))?;
        tracing::debug!("Wrote LaunchAgent {}", path.display());
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        remove_entry(&self.entry_path())
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(windows)]
mod windows {
    use super::ENTRY_NAME;
    use cfddns_core::traits::StartupRegistry;
    use cfddns_core::{Error, Result};
    use std::path::Path;
    use std::process::{Command, Output, Stdio};

    const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

    /// `Run` key value managed through `reg.exe`
    pub struct RunKey;

    impl RunKey {
        pub fn new() -> Self {
            Self
        }

        fn reg(args: &[&str]) -> Result<Output> {
            Command::new("reg")
                .args(args)
                .stdin(Stdio::null())
                .output()
                .map_err(|e| Error::Other(format!("Failed to run reg.exe: {}", e)))
        }

        fn check(output: Output, action: &str) -> Result<()> {
            if output.status.success() {
                return Ok(());
            }
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.to_lowercase().contains("access is denied") {
                Err(Error::permission_denied(stderr))
            } else {
                Err(Error::Other(format!("{} failed: {}", action, stderr)))
            }
        }

        fn powershell(script: &str) -> Result<Output> {
            Command::new("powershell")
                .args(["-NoProfile", "-NonInteractive", "-Command", script])
                .stdin(Stdio::null())
                .output()
                .map_err(|e| Error::Other(format!("Failed to run powershell: {}", e)))
        }
    }

    impl StartupRegistry for RunKey {
        fn is_registered(&self) -> Result<bool> {
            Ok(Self::reg(&["query", RUN_KEY, "/v", ENTRY_NAME])?.status.success())
        }

        fn register(&self, executable: &Path) -> Result<()> {
            let value = format!("\"{}\"", executable.display());
            let output = Self::reg(&["add", RUN_KEY, "/v", ENTRY_NAME, "/t", "REG_SZ", "/d", &value, "/f"])?;
            Self::check(output, "Registering startup entry")
        }

        fn unregister(&self) -> Result<()> {
            let output = Self::reg(&["delete", RUN_KEY, "/v", ENTRY_NAME, "/f"])?;
            Self::check(output, "Removing startup entry")
        }

        fn is_elevated(&self) -> bool {
            Self::powershell(
                "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent())\
                 .IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)",
            )
            .map(|out| String::from_utf8_lossy(&out.stdout).trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        }

        fn request_elevation(&self) -> Result<bool> {
            let executable = std::env::current_exe()?;
            let script = format!(
                "Start-Process -FilePath '{}' -Verb RunAs",
                executable.display().to_string().replace('\'', "''")
            );
            Ok(Self::powershell(&script)?.status.success())
        }
    }
}
