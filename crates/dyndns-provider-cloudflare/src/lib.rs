// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for dyndns.
//
// - One HTTP request per trait call; errors are returned, never retried
//   (the next sync cycle is the retry)
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode: reads hit the API, patches are only logged
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if the token cannot be used as a bearer credential
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - DNS Record Details: GET `/zones/:zone_id/dns_records/:record_id`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dyndns_core::config::ProviderConfig;
use dyndns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord};
use dyndns_core::{Error, Result};
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable switching every Cloudflare provider to dry-run
pub const MODE_ENV: &str = "DYNDNS_MODE";

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// DNS record as returned by Cloudflare
#[derive(Debug, Deserialize)]
struct CloudflareRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
}

impl From<CloudflareRecord> for DnsRecord {
    fn from(record: CloudflareRecord) -> Self {
        DnsRecord::new(record.id, record.record_type, record.name, record.content)
    }
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (record listing and lookup)
/// - Log the intended PATCH payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridden in tests)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PATCH updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// Fails with [`Error::ClientInit`] if the token is empty or cannot be
    /// sent as a bearer credential, or if the HTTP client cannot be built.
    /// The token itself never appears in the error.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();

        if api_token.is_empty() {
            return Err(Error::client_init("Cloudflare API token cannot be empty"));
        }
        if api_token.chars().any(char::is_whitespace)
            || HeaderValue::from_str(&format!("Bearer {}", api_token)).is_err()
        {
            return Err(Error::client_init(
                "Cloudflare API token contains characters not allowed in an HTTP header",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::client_init(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a new Cloudflare provider (production/live mode)
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, false)
    }

    /// Create a new Cloudflare provider (dry-run mode)
    ///
    /// In dry-run mode, the provider will perform all GET requests but skip
    /// PATCH updates, logging what would have been changed.
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, true)
    }

    /// Point the provider at another API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/zones/{}/dns_records/{}", self.api_base, zone_id, record_id)
    }

    /// Send a request and unwrap the Cloudflare envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("Cloudflare request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(map_status(status.as_u16(), what, &error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read Cloudflare response: {}", e)))?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;

        if !envelope.success {
            let detail = envelope
                .errors
                .first()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(Error::provider(
                "cloudflare",
                format!("{} failed: {}", what, detail),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider(
                "cloudflare",
                format!("Invalid response format: {} returned no result", what),
            )
        })
    }
}

/// Map a non-success HTTP status to an error
fn map_status(status: u16, what: &str, error_text: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid Cloudflare API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", what, error_text)),
        409 => Error::provider(
            "cloudflare",
            format!(
                "Conflict: Record is being updated by another process. Status: {}",
                status
            ),
        ),
        429 => Error::rate_limited(format!(
            "Cloudflare rate limit exceeded. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("{} failed: {} - {}", what, status, error_text),
        ),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Listing Cloudflare DNS records for {}", name);

        let request = self
            .client
            .get(self.records_url(zone_id))
            .query(&[("name", name)]);
        let records: Vec<CloudflareRecord> = self.send(request, "Record listing").await?;

        tracing::debug!("Found {} record(s) for {}", records.len(), name);
        Ok(records.into_iter().map(DnsRecord::from).collect())
    }

    /// ```http
    /// GET /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let request = self.client.get(self.record_url(zone_id, record_id));
        let record: CloudflareRecord = self.send(request, "Record lookup").await?;
        Ok(record.into())
    }

    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// { "content": "1.2.3.4" }
    /// ```
    async fn patch_record(&self, zone_id: &str, record_id: &str, content: &str) -> Result<()> {
        let url = self.record_url(zone_id, record_id);
        let payload = serde_json::json!({ "content": content });

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                payload
            );
            return Ok(());
        }

        let request = self.client.patch(&url).json(&payload);
        let _: CloudflareRecord = self.send(request, "Record update").await?;

        tracing::debug!("Cloudflare record {} now holds {}", record_id, content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare { api_token, .. } => {
                // Check for dry-run mode environment variable
                let dry_run = std::env::var(MODE_ENV)
                    .unwrap_or_default()
                    .to_lowercase()
                    == "dry-run";

                if dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Box::new(CloudflareProvider::new(api_token.clone(), dry_run)?))
            }
        }
    }
}
