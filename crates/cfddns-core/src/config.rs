//! Configuration types for the cfddns agent
//!
//! [`Configuration`] is the single record persisted by the
//! [`ConfigStore`](crate::store::ConfigStore). Raw JSON is turned into a
//! configuration by [`merge_defaults`], which substitutes the documented
//! default for every field that is absent, blank or not coercible.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Default values for configuration fields.
pub mod defaults {
    /// Register the agent at login
    pub const AUTOSTART: bool = false;
    /// Suppress unsolicited desktop notifications
    pub const SILENT: bool = true;
    /// Notify on informational outcomes
    pub const NOTIFY_ON_SUCCESS: bool = false;
    /// Seconds between scheduled reconciliation cycles
    pub const CHECK_INTERVAL_SECONDS: u64 = 600;
    /// Proxy the record through the provider
    pub const PROXIED: bool = false;
    /// TTL written with every update
    pub const TTL_SECONDS: u32 = 600;
}

/// Authentication scheme for the DNS provider API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Bearer API token
    #[default]
    Token,
    /// Account email plus global API key
    Basic,
}

impl AuthMethod {
    /// Parse a user-supplied scheme name
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "token" => Some(Self::Token),
            "basic" => Some(Self::Basic),
            _ => None,
        }
    }

    /// Scheme name as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Basic => "basic",
        }
    }
}

/// Every field the agent recognizes, in interactive prompt order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    AuthEmail,
    AuthKey,
    ZoneId,
    RecordName,
    TtlSeconds,
    Proxied,
    CheckIntervalSeconds,
    NotifyOnSuccess,
    Silent,
    Autostart,
    AuthMethod,
}

impl ConfigField {
    /// All recognized fields, in the order they are prompted on first run
    pub const ALL: [ConfigField; 11] = [
        ConfigField::AuthEmail,
        ConfigField::AuthKey,
        ConfigField::ZoneId,
        ConfigField::RecordName,
        ConfigField::TtlSeconds,
        ConfigField::Proxied,
        ConfigField::CheckIntervalSeconds,
        ConfigField::NotifyOnSuccess,
        ConfigField::Silent,
        ConfigField::Autostart,
        ConfigField::AuthMethod,
    ];

    /// Fields that must be non-empty before the agent may run
    pub const REQUIRED: [ConfigField; 4] = [
        ConfigField::AuthEmail,
        ConfigField::AuthKey,
        ConfigField::ZoneId,
        ConfigField::RecordName,
    ];

    /// Key in the persisted record
    pub fn key(&self) -> &'static str {
        match self {
            Self::AuthEmail => "auth_email",
            Self::AuthKey => "auth_key",
            Self::ZoneId => "zone_id",
            Self::RecordName => "record_name",
            Self::TtlSeconds => "ttl_seconds",
            Self::Proxied => "proxied",
            Self::CheckIntervalSeconds => "check_interval_seconds",
            Self::NotifyOnSuccess => "notify_on_success",
            Self::Silent => "silent",
            Self::Autostart => "autostart",
            Self::AuthMethod => "auth_method",
        }
    }

    /// Key used by config files written before the fields were renamed
    pub fn legacy_key(&self) -> Option<&'static str> {
        match self {
            Self::ZoneId => Some("zone_identifier"),
            Self::TtlSeconds => Some("ttl"),
            Self::Proxied => Some("proxy"),
            Self::CheckIntervalSeconds => Some("check_interval"),
            Self::NotifyOnSuccess => Some("message"),
            Self::Autostart => Some("start"),
            _ => None,
        }
    }

    /// Human-readable prompt label
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthEmail => "* Auth Email",
            Self::AuthKey => "* Auth Key",
            Self::ZoneId => "* Zone Identifier",
            Self::RecordName => "* Record Name",
            Self::TtlSeconds => "TTL (seconds)",
            Self::Proxied => "Enable Proxy (true/false)",
            Self::CheckIntervalSeconds => "Check Interval (seconds)",
            Self::NotifyOnSuccess => "Enable Messages (true/false)",
            Self::Silent => "Enable Silent Mode (true/false)",
            Self::Autostart => "Start at Login (true/false)",
            Self::AuthMethod => "Auth Method (token/basic)",
        }
    }

    /// Whether the field must be non-empty for the configuration to be complete
    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The agent's settings
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub autostart: bool,
    pub silent: bool,
    pub notify_on_success: bool,
    pub check_interval_seconds: u64,
    pub proxied: bool,
    pub ttl_seconds: u32,
    pub record_name: String,
    pub zone_id: String,
    pub auth_key: String,
    pub auth_method: AuthMethod,
    pub auth_email: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            autostart: defaults::AUTOSTART,
            silent: defaults::SILENT,
            notify_on_success: defaults::NOTIFY_ON_SUCCESS,
            check_interval_seconds: defaults::CHECK_INTERVAL_SECONDS,
            proxied: defaults::PROXIED,
            ttl_seconds: defaults::TTL_SECONDS,
            record_name: String::new(),
            zone_id: String::new(),
            auth_key: String::new(),
            auth_method: AuthMethod::default(),
            auth_email: String::new(),
        }
    }
}

// Custom Debug implementation that hides the auth key
impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("autostart", &self.autostart)
            .field("silent", &self.silent)
            .field("notify_on_success", &self.notify_on_success)
            .field("check_interval_seconds", &self.check_interval_seconds)
            .field("proxied", &self.proxied)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("record_name", &self.record_name)
            .field("zone_id", &self.zone_id)
            .field("auth_key", &"<REDACTED>")
            .field("auth_method", &self.auth_method)
            .field("auth_email", &self.auth_email)
            .finish()
    }
}

impl Configuration {
    /// Interval between scheduled cycles
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// Required fields that are still empty
    pub fn missing_required(&self) -> Vec<ConfigField> {
        ConfigField::REQUIRED
            .into_iter()
            .filter(|field| self.text(*field).is_some_and(|v| v.trim().is_empty()))
            .collect()
    }

    /// A configuration is complete once every required field is non-empty
    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Current value of a free-text field
    pub fn text(&self, field: ConfigField) -> Option<&str> {
        match field {
            ConfigField::AuthEmail => Some(&self.auth_email),
            ConfigField::AuthKey => Some(&self.auth_key),
            ConfigField::ZoneId => Some(&self.zone_id),
            ConfigField::RecordName => Some(&self.record_name),
            _ => None,
        }
    }

    /// Set a free-text field; returns false for non-text fields
    pub fn set_text(&mut self, field: ConfigField, value: impl Into<String>) -> bool {
        let slot = match field {
            ConfigField::AuthEmail => &mut self.auth_email,
            ConfigField::AuthKey => &mut self.auth_key,
            ConfigField::ZoneId => &mut self.zone_id,
            ConfigField::RecordName => &mut self.record_name,
            _ => return false,
        };
        *slot = value.into();
        true
    }
}

/// Build a configuration from a raw persisted record.
///
/// Recognized keys that are absent, blank or not coercible take their default.
/// Unrecognized keys are ignored.
pub fn merge_defaults(raw: &Map<String, Value>) -> Configuration {
    let mut cfg = Configuration::default();

    for field in ConfigField::ALL {
        let Some(value) = lookup(raw, field) else {
            continue;
        };

        match field {
            ConfigField::AuthEmail
            | ConfigField::AuthKey
            | ConfigField::ZoneId
            | ConfigField::RecordName => {
                if let Some(text) = as_text(value) {
                    cfg.set_text(field, text);
                }
            }
            ConfigField::TtlSeconds => {
                if let Some(ttl) = as_positive(value).and_then(|v| u32::try_from(v).ok()) {
                    cfg.ttl_seconds = ttl;
                }
            }
            ConfigField::CheckIntervalSeconds => {
                if let Some(interval) = as_positive(value) {
                    cfg.check_interval_seconds = interval;
                }
            }
            ConfigField::Proxied => {
                if let Some(flag) = as_bool(value) {
                    cfg.proxied = flag;
                }
            }
            ConfigField::NotifyOnSuccess => {
                if let Some(flag) = as_bool(value) {
                    cfg.notify_on_success = flag;
                }
            }
            ConfigField::Silent => {
                if let Some(flag) = as_bool(value) {
                    cfg.silent = flag;
                }
            }
            ConfigField::Autostart => {
                if let Some(flag) = as_bool(value) {
                    cfg.autostart = flag;
                }
            }
            ConfigField::AuthMethod => {
                if let Some(method) = value.as_str().and_then(AuthMethod::parse) {
                    cfg.auth_method = method;
                }
            }
        }
    }

    cfg
}

/// First non-blank value under the canonical key, then the legacy key
fn lookup(raw: &Map<String, Value>, field: ConfigField) -> Option<&Value> {
    std::iter::once(field.key())
        .chain(field.legacy_key())
        .filter_map(|key| raw.get(key))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_u64().map(|v| v != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_positive(value: &Value) -> Option<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.filter(|v| *v > 0)
}
