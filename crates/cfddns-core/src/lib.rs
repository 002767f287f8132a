// # cfddns-core
//
// Core library for the cfddns dynamic DNS agent.
//
// ## Architecture Overview
//
// Keeps one Cloudflare A record pointed at the host's public IPv4 address:
// - **IpResolver**: ordered endpoint fallback implementing `PublicIpSource`
// - **DnsProvider**: trait for fetching and updating the managed record
// - **ConfigStore**: JSON configuration with defaults, backfill and atomic save
// - **Notifier**: logging plus the desktop notification policy
// - **AutostartRegistrar**: idempotent login-startup toggle
// - **DdnsEngine**: the reconciliation loop
//
// Platform glue (terminal prompts, desktop notifications, startup entries,
// console controls) lives in the `cfddnsd` binary behind the traits here.

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod store;
pub mod resolver;
pub mod notify;
pub mod control;
pub mod autostart;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpEndpoint, NotificationSink, Prompter, PublicIpSource, StartupRegistry};
pub use engine::{CycleOutcome, CycleReport, DdnsEngine, EngineEvent};
pub use config::{AuthMethod, ConfigField, Configuration};
pub use error::{Error, Result};
pub use store::ConfigStore;
pub use resolver::IpResolver;
pub use notify::{Notifier, NotifyPrefs};
pub use control::ControlFlags;
pub use autostart::{AutostartChange, AutostartRegistrar};
