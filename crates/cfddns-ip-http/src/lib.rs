// # HTTP IP Endpoints
//
// HTTPS discovery endpoints for the public IPv4 address.
//
// ## Architecture
//
// Each `HttpEndpoint` performs one GET per call and hands the raw body to the
// core resolver, which extracts and validates the address. Endpoints never
// retry and never cache; the resolver moves on to the next endpoint instead.
//
// The default chain, in priority order:
// - `https://cloudflare.com/cdn-cgi/trace` (key=value listing with an `ip=` line)
// - `https://api.ipify.org` (plain text)
// - `https://ipv4.icanhazip.com` (plain text)

use cfddns_core::resolver::IpResolver;
use cfddns_core::traits::IpEndpoint;
use cfddns_core::{Error, Result};

use std::time::Duration;

/// Per-request timeout for discovery endpoints
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default discovery endpoints as (name, url), highest priority first
pub const DEFAULT_ENDPOINTS: &[(&str, &str)] = &[
    ("cloudflare-trace", "https://cloudflare.com/cdn-cgi/trace"),
    ("ipify", "https://api.ipify.org"),
    ("icanhazip", "https://ipv4.icanhazip.com"),
];

/// One HTTPS discovery endpoint
pub struct HttpEndpoint {
    /// Name used in logs
    name: String,

    /// URL to fetch
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpEndpoint {
    /// Create an endpoint with its own client
    ///
    /// # Parameters
    ///
    /// - `name`: label used in log lines
    /// - `url`: URL returning a body that contains the caller's IPv4 address
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_client(name, url, default_client())
    }

    /// Create an endpoint sharing an existing client
    pub fn with_client(name: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpEndpoint for HttpEndpoint {
    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!("{} returned HTTP {}", self.url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response from {}: {}", self.url, e)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The default endpoint chain sharing one client
pub fn default_endpoints() -> Vec<Box<dyn IpEndpoint>> {
    let client = default_client();
    DEFAULT_ENDPOINTS
        .iter()
        .map(|(name, url)| Box::new(HttpEndpoint::with_client(*name, *url, client.clone())) as Box<dyn IpEndpoint>)
        .collect()
}

/// A resolver over [`DEFAULT_ENDPOINTS`]
pub fn default_resolver() -> IpResolver {
    IpResolver::new(default_endpoints())
}

fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build HTTP client ({}), using defaults", e);
            reqwest::Client::new()
        })
}
