//! Error types for the cfddns agent
//!
//! Only storage failures at startup are fatal. Everything else is logged,
//! reported through the notifier and retried on the next cycle.

use thiserror::Error;

/// Result type alias for cfddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the cfddns agent
#[derive(Error, Debug)]
pub enum Error {
    /// Network or timeout failure on an HTTP call
    #[error("Transport error: {0}")]
    Transport(String),

    /// Every IP discovery endpoint failed
    #[error("Failed to find a valid IP.")]
    ResolutionExhausted,

    /// The provider holds no A record for the configured name
    #[error("Record does not exist, perhaps create one first? ({ip} for {record})")]
    RecordNotFound {
        /// Configured record name
        record: String,
        /// Address that would have been written
        ip: String,
    },

    /// The provider refused an update
    #[error("Update rejected: {0}")]
    UpdateRejected(String),

    /// A required configuration field is missing and could not be collected
    #[error("Configuration incomplete: {0} is required")]
    ConfigIncomplete(String),

    /// Startup registration was refused by the OS
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Configuration storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a "record not found" error
    pub fn record_not_found(record: impl Into<String>, ip: impl Into<String>) -> Self {
        Self::RecordNotFound {
            record: record.into(),
            ip: ip.into(),
        }
    }

    /// Create an update rejected error
    pub fn update_rejected(msg: impl Into<String>) -> Self {
        Self::UpdateRejected(msg.into())
    }

    /// Create a configuration incomplete error
    pub fn config_incomplete(field: impl Into<String>) -> Self {
        Self::ConfigIncomplete(field.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error should stop the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_) | Self::ConfigIncomplete(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_names_record_and_ip() {
        let err = Error::record_not_found("home.example.com", "5.6.7.8");
        assert_eq!(
            err.to_string(),
            "Record does not exist, perhaps create one first? (5.6.7.8 for home.example.com)"
        );
    }

    #[test]
    fn only_startup_conditions_are_fatal() {
        assert!(Error::storage("permission denied").is_fatal());
        assert!(Error::config_incomplete("zone_id").is_fatal());
        assert!(!Error::transport("timeout").is_fatal());
        assert!(!Error::ResolutionExhausted.is_fatal());
        assert!(!Error::update_rejected("success=false").is_fatal());
        assert!(!Error::permission_denied("Access is denied").is_fatal());
    }
}
