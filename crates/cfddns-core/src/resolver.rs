//! Public IPv4 resolution with endpoint fallback
//!
//! Endpoints are tried in fixed priority order. The first one that answers
//! with a syntactically valid dotted-quad wins. There are no retries inside a
//! cycle; the next cycle tries again.

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::traits::{IpEndpoint, PublicIpSource};

/// Ordered list of discovery endpoints
pub struct IpResolver {
    endpoints: Vec<Box<dyn IpEndpoint>>,
}

impl IpResolver {
    /// Create a resolver trying `endpoints` in the given order
    pub fn new(endpoints: Vec<Box<dyn IpEndpoint>>) -> Self {
        Self { endpoints }
    }

    /// Number of configured endpoints
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no endpoint is configured
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[async_trait]
impl PublicIpSource for IpResolver {
    async fn resolve(&self) -> Option<Ipv4Addr> {
        for endpoint in &self.endpoints {
            let body = match endpoint.fetch().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("IP endpoint {} failed: {}", endpoint.name(), e);
                    continue;
                }
            };

            match extract_ipv4(&body) {
                Some(ip) => {
                    tracing::debug!("Resolved {} via {}", ip, endpoint.name());
                    return Some(ip);
                }
                None => {
                    tracing::warn!(
                        "IP endpoint {} returned no valid IPv4 address: {:?}",
                        endpoint.name(),
                        body.trim()
                    );
                }
            }
        }

        tracing::debug!("All {} IP endpoints exhausted", self.endpoints.len());
        None
    }
}

/// Extract the IPv4 token from a discovery response body.
///
/// Accepted shapes:
/// - a bare address (`"1.2.3.4\n"`)
/// - a `key=value` trailer (`"ip=1.2.3.4"`), split on the last `=`
/// - a multi-line `key=value` listing with an `ip` line (`cdn-cgi/trace`);
///   if that line does not hold an address the last-`=` rule applies
pub fn extract_ipv4(body: &str) -> Option<Ipv4Addr> {
    let body = body.trim();

    let ip_line = body.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "ip").then_some(value)
    });

    ip_line
        .and_then(parse_dotted_quad)
        .or_else(|| parse_dotted_quad(body.rsplit('=').next().unwrap_or(body)))
}

/// Four decimal octets of one to three digits each, leading zeros allowed
fn parse_dotted_quad(token: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = token.trim().split('.');

    for octet in &mut octets {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}
