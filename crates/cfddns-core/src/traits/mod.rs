//! Core traits for the cfddns agent
//!
//! Every collaborator that touches the network, the terminal, the desktop or
//! the OS sits behind one of these interfaces.
//!
//! - [`IpEndpoint`] / [`PublicIpSource`]: public IPv4 discovery
//! - [`DnsProvider`]: fetch and update the managed A record
//! - [`Prompter`]: interactive collection of configuration fields
//! - [`NotificationSink`]: native desktop notifications
//! - [`StartupRegistry`]: OS per-user login startup entry

pub mod ip_source;
pub mod dns_provider;
pub mod prompt;
pub mod notification;
pub mod startup;

pub use ip_source::{IpEndpoint, PublicIpSource};
pub use dns_provider::{DnsProvider, RecordSnapshot};
pub use prompt::Prompter;
pub use notification::{NotificationSink, Severity};
pub use startup::StartupRegistry;
