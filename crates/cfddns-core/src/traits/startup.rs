// # Startup Registry Trait
//
// A single named entry in the OS per-user login startup location whose value
// is the absolute path of the agent's executable.
//
// ## Implementations
//
// Platform wrappers live in the `cfddnsd` binary (XDG autostart, macOS
// LaunchAgent, Windows `Run` key).

use std::path::Path;

/// OS login-startup registration
///
/// A refusal by the OS must surface as `Error::PermissionDenied` so that the
/// registrar can offer an elevated re-run.
pub trait StartupRegistry: Send + Sync {
    /// Whether the entry currently exists
    fn is_registered(&self) -> Result<bool, crate::Error>;

    /// Create or overwrite the entry
    fn register(&self, executable: &Path) -> Result<(), crate::Error>;

    /// Remove the entry
    fn unregister(&self) -> Result<(), crate::Error>;

    /// Whether the process already runs with elevated privileges
    fn is_elevated(&self) -> bool {
        true
    }

    /// Relaunch the agent elevated
    ///
    /// Returns `Ok(true)` when an elevated instance was started; the caller
    /// must then exit.
    fn request_elevation(&self) -> Result<bool, crate::Error> {
        Ok(false)
    }
}
