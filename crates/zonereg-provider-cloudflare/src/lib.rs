// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for zonereg.
//
// - One HTTP request per call (listing follows pagination, one request per page)
// - Full error propagation; no retry, no backoff, no rate limiting
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - No caching between calls
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - API token MUST be provided via environment variables only
// - Provider MUST fail fast if token or zone ID is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?per_page=...&page=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use zonereg_core::config::ProviderConfig;
use zonereg_core::traits::{DesiredRecord, DnsProvider, DnsProviderFactory, ProviderRecord};
use zonereg_core::{Error, Result};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing a zone
const LIST_PAGE_SIZE: u32 = 1000;

/// Largest zone listing accepted, in pages; bigger zones are refused
const MAX_LIST_PAGES: u32 = 100;

/// Cloudflare DNS provider
///
/// Isolated, stateless and single-shot. Deciding whether a write is needed
/// is owned by `zonereg_core::reconcile`.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone holding the managed domain
    zone_id: String,

    /// API base URL (overridable for tests and proxies)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Envelope wrapping every Cloudflare API v4 response
#[derive(Debug, Deserialize)]
struct CfEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CfMessage>,
    result: Option<T>,
    result_info: Option<CfResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CfMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CfResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

/// A DNS record as Cloudflare returns it
#[derive(Debug, Deserialize)]
struct CfDnsRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    /// 1 means "automatic"
    ttl: u32,
}

impl From<CfDnsRecord> for ProviderRecord {
    fn from(record: CfDnsRecord) -> Self {
        ProviderRecord {
            id: record.id,
            name: record.name,
            record_type: record.record_type,
            content: record.content,
            ttl: record.ttl,
        }
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone holding the managed domain
    ///
    /// # Security
    ///
    /// The API token will NEVER be logged or displayed in error messages.
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        let zone_id = zone_id.into();

        if api_token.is_empty() {
            return Err(Error::config("CLOUDFLARE_API_TOKEN not set"));
        }
        if zone_id.is_empty() {
            return Err(Error::config("CLOUDFLARE_ZONE_ID not set"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Send requests to `base_url` instead of the public API
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.records_url(), id)
    }

    /// Send a request and decode the envelope
    ///
    /// # Parameters
    ///
    /// - `request`: The prepared request (auth headers are added here)
    /// - `context`: What the request does, for error messages
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<CfEnvelope<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status.as_u16(), &error_text, context));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to read response: {}", e)))?;

        parse_envelope(&body, context)
    }

    async fn list_page(&self, page: u32) -> Result<(Vec<ProviderRecord>, u32)> {
        tracing::debug!("Listing DNS records (page {})", page);

        let request = self.client.get(self.records_url()).query(&[
            ("per_page", LIST_PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ]);
        let envelope: CfEnvelope<Vec<CfDnsRecord>> = self.send(request, "Record listing").await?;

        let total_pages = envelope
            .result_info
            .as_ref()
            .map(|info| info.total_pages)
            .unwrap_or(1);
        let records = envelope
            .result
            .ok_or_else(|| Error::provider("cloudflare", "Invalid response format: result is missing"))?
            .into_iter()
            .map(ProviderRecord::from)
            .collect();

        Ok((records, total_pages))
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List every record in the zone
    ///
    /// # API Calls
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?per_page=1000&page=N
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self) -> Result<Vec<ProviderRecord>> {
        let records = collect_pages(|page| self.list_page(page)).await?;

        tracing::debug!("Zone holds {} record(s)", records.len());
        Ok(records)
    }

    /// Create a record
    ///
    /// # API Calls
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "www.example.com", "content": "1.2.3.4", "ttl": 3600 }
    /// ```
    async fn create_record(&self, record: &DesiredRecord) -> Result<ProviderRecord> {
        tracing::info!("Creating Cloudflare DNS record: {}", record);

        let request = self.client.post(self.records_url()).json(&record_payload(record));
        let envelope: CfEnvelope<CfDnsRecord> = self.send(request, "Failed to create record").await?;

        envelope
            .result
            .map(ProviderRecord::from)
            .ok_or_else(|| Error::provider("cloudflare", "Invalid response format: result is missing"))
    }

    /// Replace a record
    ///
    /// # API Calls
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "type": "A", "name": "www.example.com", "content": "1.2.3.4", "ttl": 3600 }
    /// ```
    async fn update_record(&self, id: &str, record: &DesiredRecord) -> Result<ProviderRecord> {
        tracing::info!("Updating Cloudflare DNS record {}: {}", id, record);

        let request = self.client.put(self.record_url(id)).json(&record_payload(record));
        let envelope: CfEnvelope<CfDnsRecord> = self.send(request, "Failed to update record").await?;

        envelope
            .result
            .map(ProviderRecord::from)
            .ok_or_else(|| Error::provider("cloudflare", "Invalid response format: result is missing"))
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Follow a paginated listing to its last page
///
/// `fetch(page)` returns one page of records and the total page count.
async fn collect_pages<F, Fut>(mut fetch: F) -> Result<Vec<ProviderRecord>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(Vec<ProviderRecord>, u32)>>,
{
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let (batch, total_pages) = fetch(page).await?;
        if total_pages > MAX_LIST_PAGES {
            return Err(Error::provider(
                "cloudflare",
                format!(
                    "Zone listing spans {} pages, more than the {} supported",
                    total_pages, MAX_LIST_PAGES
                ),
            ));
        }
        records.extend(batch);

        if page >= total_pages {
            break;
        }
        page += 1;
    }

    Ok(records)
}

/// JSON body for create and update requests
fn record_payload(record: &DesiredRecord) -> serde_json::Value {
    serde_json::json!({
        "type": record.record_type.as_str(),
        "name": record.name,
        "content": record.content,
        "ttl": record.ttl,
    })
}

/// Map a non-2xx status to an error
fn status_error(status: u16, body: &str, context: &str) -> Error {
    let detail = format!("Cloudflare API error {}: {}", status, body);
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. {}",
            detail
        )),
        404 => Error::not_found(format!("{}: {}", context, detail)),
        409 => Error::provider(
            "cloudflare",
            format!("Conflict: record already exists or is being modified. {}", detail),
        ),
        429 => Error::rate_limited(format!("Rate limit exceeded. {}", detail)),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient). {}", detail),
        ),
        _ => Error::provider("cloudflare", format!("{}: {}", context, detail)),
    }
}

/// Decode a 2xx response body, rejecting envelopes that report failure
fn parse_envelope<T: DeserializeOwned>(body: &str, context: &str) -> Result<CfEnvelope<T>> {
    let envelope: CfEnvelope<T> = serde_json::from_str(body)
        .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {}", e)))?;

    if !envelope.success {
        let messages: Vec<String> = envelope
            .errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect();
        return Err(Error::provider(
            "cloudflare",
            format!("{}: {}", context, messages.join("; ")),
        ));
    }

    if let Some(info) = &envelope.result_info {
        tracing::trace!("Page {} of {}", info.page, info.total_pages);
    }

    Ok(envelope)
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let ProviderConfig::Cloudflare { api_token, zone_id } = config;
        Ok(Box::new(CloudflareProvider::new(
            api_token.clone(),
            zone_id.clone(),
        )?))
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use zonereg_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// zonereg_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &zonereg_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
