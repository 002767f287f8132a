// # IP Source Traits
//
// Two layers:
// - `IpEndpoint`: one discovery service, returns the raw response body
// - `PublicIpSource`: yields a validated public IPv4 address, or nothing
//
// `IpResolver` (crate::resolver) implements `PublicIpSource` on top of an
// ordered list of endpoints. The reconciliation loop only sees
// `PublicIpSource`, so tests can substitute a fixed address.

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// A single public-IP discovery service
///
/// Implementations perform one bounded-timeout request per call and
/// never retry. A transport failure or non-success status is an `Err`.
#[async_trait]
pub trait IpEndpoint: Send + Sync {
    /// Fetch the response body
    async fn fetch(&self) -> Result<String, crate::Error>;

    /// Endpoint name (for logging)
    fn name(&self) -> &str;
}

/// Source of the machine's externally visible IPv4 address
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Resolve the current public address
    ///
    /// Returns `None` when no valid address could be determined this cycle.
    async fn resolve(&self) -> Option<Ipv4Addr>;
}
