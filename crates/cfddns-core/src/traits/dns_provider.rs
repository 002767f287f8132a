// # DNS Provider Trait
//
// Queries and updates the single A record the agent manages.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// The trait deliberately collapses failures: `fetch_record` yields `None` and
// `update_record` yields `false`. Implementations log the underlying cause.
// The reconciliation loop decides what to report.

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Provider-side state of the managed A record
///
/// Re-fetched every cycle, never persisted. A missing record is represented
/// by `fetch_record` returning `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Provider record identifier
    pub record_id: String,
    /// Current record content
    pub current_ip: String,
}

impl RecordSnapshot {
    pub fn new(record_id: impl Into<String>, current_ip: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            current_ip: current_ip.into(),
        }
    }

    /// Whether the record already points at `ip`
    pub fn points_at(&self, ip: Ipv4Addr) -> bool {
        self.current_ip
            .trim()
            .parse::<Ipv4Addr>()
            .is_ok_and(|current| current == ip)
    }
}

/// Client for one record in one zone
///
/// # Trust Level: Untrusted
///
/// Providers perform API calls to their own endpoint only. They do not retry,
/// cache, or decide whether an update is needed.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the configured A record
    ///
    /// Returns `None` on transport error, non-2xx status, or zero matches.
    async fn fetch_record(&self) -> Option<RecordSnapshot>;

    /// Point the record at `new_ip` using the configured TTL and proxy flag
    ///
    /// Returns `true` only on a 2xx status with an explicit success flag.
    async fn update_record(&self, record_id: &str, new_ip: Ipv4Addr) -> bool;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_compares_by_address() {
        let snapshot = RecordSnapshot::new("abc", "1.2.3.4");
        assert!(snapshot.points_at(Ipv4Addr::new(1, 2, 3, 4)));
        assert!(!snapshot.points_at(Ipv4Addr::new(5, 6, 7, 8)));
    }

    #[test]
    fn unparseable_content_never_matches() {
        let snapshot = RecordSnapshot::new("abc", "not-an-ip");
        assert!(!snapshot.points_at(Ipv4Addr::new(1, 2, 3, 4)));
    }
}
