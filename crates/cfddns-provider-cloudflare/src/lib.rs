// # Cloudflare DNS Provider
//
// Cloudflare v4 client for the single A record the agent manages.
//
// ## Trust Level: Untrusted (DNS Provider)
//
// One HTTP request per trait call. No retries, no caching, no background
// tasks. Scheduling and the decision whether to update belong to the
// reconciliation loop.
//
// ## Error Handling
//
// The inherent methods return typed errors with the HTTP status mapped:
// 401/403 authentication, 404 not found, 429 rate limited, 5xx transient.
// The `DnsProvider` impl logs the cause and collapses the result to
// `Option` / `bool`.
//
// ## Security Requirements
//
// - The auth key NEVER appears in logs or Debug output
//
// ## API Reference
//
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::{AuthMethod, Configuration};
use cfddns_core::traits::{DnsProvider, RecordSnapshot};
use cfddns_core::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// How requests authenticate
#[derive(Clone, PartialEq, Eq)]
enum Credentials {
    /// `Authorization: Bearer <key>`
    Token { key: String },
    /// `X-Auth-Email` + `X-Auth-Key`
    Basic { email: String, key: String },
}

/// Cloudflare DNS provider
///
/// Built once from the loaded [`Configuration`]; carries the zone, the
/// record name, the TTL and the proxy flag used for every update.
pub struct CloudflareProvider {
    base_url: String,
    zone_id: String,
    record_name: String,
    ttl_seconds: u32,
    proxied: bool,
    /// ⚠️ NEVER log this value
    credentials: Credentials,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the auth key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth_method = match self.credentials {
            Credentials::Token { .. } => AuthMethod::Token,
            Credentials::Basic { .. } => AuthMethod::Basic,
        };
        f.debug_struct("CloudflareProvider")
            .field("base_url", &self.base_url)
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("proxied", &self.proxied)
            .field("auth_method", &auth_method)
            .field("auth_key", &"<REDACTED>")
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider from a complete configuration
    ///
    /// # Returns
    ///
    /// - `Ok(CloudflareProvider)`
    /// - `Err(Error::ConfigIncomplete)`: zone, record or key is empty, or
    ///   basic auth is selected without an email
    pub fn from_config(cfg: &Configuration) -> Result<Self> {
        for (field, value) in [
            ("zone_id", &cfg.zone_id),
            ("record_name", &cfg.record_name),
            ("auth_key", &cfg.auth_key),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_incomplete(field));
            }
        }

        let credentials = match cfg.auth_method {
            AuthMethod::Token => Credentials::Token {
                key: cfg.auth_key.clone(),
            },
            AuthMethod::Basic => {
                if cfg.auth_email.trim().is_empty() {
                    return Err(Error::config_incomplete("auth_email"));
                }
                Credentials::Basic {
                    email: cfg.auth_email.clone(),
                    key: cfg.auth_key.clone(),
                }
            }
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client ({}), using defaults", e);
                reqwest::Client::default()
            });

        Ok(Self {
            base_url: CLOUDFLARE_API_BASE.to_string(),
            zone_id: cfg.zone_id.clone(),
            record_name: cfg.record_name.clone(),
            ttl_seconds: cfg.ttl_seconds,
            proxied: cfg.proxied,
            credentials,
            client,
        })
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the record listing request
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// ```
    pub fn list_request(&self) -> Result<reqwest::Request> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, self.zone_id);
        self.authorize(self.client.get(url))
            .query(&[("type", "A"), ("name", self.record_name.as_str())])
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("Invalid list request: {}", e)))
    }

    /// Build the record update request
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// {"type":"A","name":"...","content":"5.6.7.8","ttl":600,"proxied":false}
    /// ```
    pub fn update_request(&self, record_id: &str, new_ip: Ipv4Addr) -> Result<reqwest::Request> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, self.zone_id, record_id
        );
        let payload = UpdatePayload {
            record_type: "A",
            name: &self.record_name,
            content: new_ip.to_string(),
            ttl: self.ttl_seconds,
            proxied: self.proxied,
        };
        self.authorize(self.client.patch(url))
            .json(&payload)
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("Invalid update request: {}", e)))
    }

    /// Look up the configured record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(snapshot))`: the first matching record
    /// - `Ok(None)`: the zone holds no A record with this name
    /// - `Err(Error)`: transport failure, non-2xx status or malformed body
    pub async fn find_record(&self) -> Result<Option<RecordSnapshot>> {
        tracing::debug!("Looking up A record {}", self.record_name);

        let body = self.execute(self.list_request()?, "Record lookup").await?;
        parse_listing(&body)
    }

    /// Point `record_id` at `new_ip`
    pub async fn patch_record(&self, record_id: &str, new_ip: Ipv4Addr) -> Result<()> {
        tracing::info!(
            "Updating Cloudflare DNS record: {} -> {}",
            self.record_name,
            new_ip
        );

        let body = self
            .execute(self.update_request(record_id, new_ip)?, "Record update")
            .await?;
        parse_update(&body)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Content-Type", "application/json");
        match &self.credentials {
            Credentials::Token { key } => builder.bearer_auth(key),
            Credentials::Basic { email, key } => builder
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    async fn execute(&self, request: reqwest::Request, context: &str) -> Result<String> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, context));
        }
        Ok(body)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn fetch_record(&self) -> Option<RecordSnapshot> {
        match self.find_record().await {
            Ok(Some(snapshot)) => {
                tracing::debug!(
                    "Found record {} -> {}",
                    snapshot.record_id,
                    snapshot.current_ip
                );
                Some(snapshot)
            }
            Ok(None) => {
                tracing::debug!("No A record named {}", self.record_name);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to get DNS record: {}", e);
                None
            }
        }
    }

    async fn update_record(&self, record_id: &str, new_ip: Ipv4Addr) -> bool {
        match self.patch_record(record_id, new_ip).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to update DNS record: {}", e);
                false
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[derive(Serialize)]
struct UpdatePayload<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: String,
    ttl: u32,
    proxied: bool,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    result: Vec<DnsRecord>,
    result_info: Option<ResultInfo>,
}

#[derive(Deserialize)]
struct ResultInfo {
    #[serde(default)]
    count: u64,
}

#[derive(Deserialize)]
struct DnsRecord {
    id: String,
    content: String,
}

#[derive(Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Parse a record listing body
///
/// The record exists when `result_info.count` is positive (or, without
/// `result_info`, when `result` is non-empty). The first entry wins.
pub fn parse_listing(body: &str) -> Result<Option<RecordSnapshot>> {
    let listing: ListResponse = serde_json::from_str(body)
        .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

    let count = listing
        .result_info
        .map(|info| info.count)
        .unwrap_or(listing.result.len() as u64);
    if count == 0 {
        return Ok(None);
    }

    Ok(listing
        .result
        .into_iter()
        .next()
        .map(|record| RecordSnapshot::new(record.id, record.content)))
}

/// Parse an update body; only an explicit `"success": true` counts
pub fn parse_update(body: &str) -> Result<()> {
    let update: UpdateResponse = serde_json::from_str(body)
        .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

    if update.success {
        return Ok(());
    }

    let reasons = update
        .errors
        .iter()
        .map(|e| format!("{} {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::update_rejected(if reasons.is_empty() {
        "success flag not set".to_string()
    } else {
        reasons
    }))
}

/// Map a non-2xx status to a typed error
fn status_error(status: StatusCode, body: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::provider(
            PROVIDER,
            format!("Authentication failed: Invalid credentials or insufficient permissions. Status: {}", status),
        ),
        404 => Error::provider(PROVIDER, format!("{} failed: zone or record not found. Status: {}", context, status)),
        429 => Error::provider(
            PROVIDER,
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloudflare server error (transient): {} - {}", status, body.trim()),
        ),
        _ => Error::provider(PROVIDER, format!("{} failed: {} - {}", context, status, body.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(auth_method: AuthMethod) -> Configuration {
        Configuration {
            auth_email: "me@example.com".to_string(),
            auth_key: "secret_token_12345".to_string(),
            zone_id: "zone123".to_string(),
            record_name: "home.example.com".to_string(),
            auth_method,
            ..Configuration::default()
        }
    }

    fn provider(auth_method: AuthMethod) -> CloudflareProvider {
        CloudflareProvider::from_config(&config(auth_method)).unwrap()
    }

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> Option<&'a str> {
        request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn json_body(request: &reqwest::Request) -> serde_json::Value {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    /// Serve `status` with `body` to every connection on a loopback port
    async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn list_request_targets_zone_and_record() {
        let request = provider(AuthMethod::Token).list_request().unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://api.cloudflare.com/client/v4/zones/zone123/dns_records?type=A&name=home.example.com"
        );
        assert_eq!(header(&request, "Authorization"), Some("Bearer secret_token_12345"));
        assert_eq!(header(&request, "X-Auth-Key"), None);
    }

    #[test]
    fn basic_auth_uses_email_and_key_headers() {
        let request = provider(AuthMethod::Basic).list_request().unwrap();

        assert_eq!(header(&request, "X-Auth-Email"), Some("me@example.com"));
        assert_eq!(header(&request, "X-Auth-Key"), Some("secret_token_12345"));
        assert_eq!(header(&request, "Authorization"), None);
    }

    #[test]
    fn update_request_carries_ttl_and_proxy() {
        let request = provider(AuthMethod::Token)
            .update_request("abc", Ipv4Addr::new(5, 6, 7, 8))
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::PATCH);
        assert_eq!(
            request.url().as_str(),
            "https://api.cloudflare.com/client/v4/zones/zone123/dns_records/abc"
        );
        assert_eq!(
            json_body(&request),
            serde_json::json!({
                "type": "A",
                "name": "home.example.com",
                "content": "5.6.7.8",
                "ttl": 600,
                "proxied": false,
            })
        );
    }

    #[test]
    fn listing_with_match_yields_first_record() {
        let body = r#"{"success":true,"result":[{"id":"abc","content":"1.2.3.4","type":"A"},{"id":"def","content":"9.9.9.9"}],"result_info":{"count":2}}"#;
        assert_eq!(parse_listing(body).unwrap(), Some(RecordSnapshot::new("abc", "1.2.3.4")));
    }

    #[test]
    fn empty_listing_means_missing() {
        let body = r#"{"success":true,"result":[],"result_info":{"count":0}}"#;
        assert_eq!(parse_listing(body).unwrap(), None);
        assert_eq!(parse_listing(r#"{"result":[]}"#).unwrap(), None);
    }

    #[test]
    fn malformed_listing_is_an_error() {
        assert!(parse_listing("<html>").is_err());
    }

    #[test]
    fn update_requires_explicit_success() {
        assert!(parse_update(r#"{"success":true,"result":{"id":"abc"}}"#).is_ok());
        assert!(matches!(parse_update("{}"), Err(Error::UpdateRejected(_))));

        let rejected = parse_update(r#"{"success":false,"errors":[{"code":9109,"message":"Invalid access token"}]}"#);
        match rejected {
            Err(Error::UpdateRejected(reason)) => assert!(reason.contains("9109")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn status_codes_are_mapped() {
        let auth = status_error(StatusCode::FORBIDDEN, "", "Record lookup").to_string();
        assert!(auth.contains("Authentication failed"));

        let limited = status_error(StatusCode::TOO_MANY_REQUESTS, "", "Record lookup").to_string();
        assert!(limited.contains("Rate limit"));

        let transient = status_error(StatusCode::BAD_GATEWAY, "upstream", "Record update").to_string();
        assert!(transient.contains("transient"));
    }

    #[test]
    fn incomplete_configuration_is_rejected() {
        let mut cfg = config(AuthMethod::Token);
        cfg.zone_id = " ".to_string();
        assert!(matches!(
            CloudflareProvider::from_config(&cfg),
            Err(Error::ConfigIncomplete(field)) if field == "zone_id"
        ));

        let mut cfg = config(AuthMethod::Basic);
        cfg.auth_email.clear();
        assert!(matches!(
            CloudflareProvider::from_config(&cfg),
            Err(Error::ConfigIncomplete(field)) if field == "auth_email"
        ));
    }

    #[test]
    fn auth_key_not_exposed_in_debug() {
        let debug_str = format!("{:?}", provider(AuthMethod::Token));
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[tokio::test]
    async fn fetch_record_against_canned_listing() {
        let base = serve(
            "200 OK",
            r#"{"success":true,"result":[{"id":"abc","content":"1.2.3.4"}],"result_info":{"count":1}}"#,
        )
        .await;
        let provider = provider(AuthMethod::Token).with_base_url(base);

        assert_eq!(provider.fetch_record().await, Some(RecordSnapshot::new("abc", "1.2.3.4")));
    }

    #[tokio::test]
    async fn fetch_record_collapses_http_errors() {
        let base = serve("403 Forbidden", r#"{"success":false}"#).await;
        let provider = provider(AuthMethod::Token).with_base_url(base);

        assert!(matches!(provider.find_record().await, Err(Error::Provider { .. })));
        assert_eq!(provider.fetch_record().await, None);
    }

    #[tokio::test]
    async fn update_record_reports_provider_verdict() {
        let ok = provider(AuthMethod::Token).with_base_url(serve("200 OK", r#"{"success":true}"#).await);
        assert!(ok.update_record("abc", Ipv4Addr::new(5, 6, 7, 8)).await);

        let refused = provider(AuthMethod::Token).with_base_url(serve("200 OK", r#"{"success":false}"#).await);
        assert!(!refused.update_record("abc", Ipv4Addr::new(5, 6, 7, 8)).await);

        let down = provider(AuthMethod::Token).with_base_url(serve("503 Service Unavailable", "{}").await);
        assert!(!down.update_record("abc", Ipv4Addr::new(5, 6, 7, 8)).await);
    }
}
