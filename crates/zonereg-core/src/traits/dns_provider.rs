// # DNS Provider Trait
//
// Defines the interface for reading and writing DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `zonereg-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use zonereg_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for record in provider.list_records().await? {
//         println!("{} {} -> {}", record.name, record.record_type, record.content);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{RecordEntry, RecordType, Registry};

/// A record as it exists at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type as reported by the provider (may be one zonereg does not manage)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl ProviderRecord {
    /// The record type, if it is one zonereg manages
    pub fn managed_type(&self) -> Option<RecordType> {
        self.record_type.parse().ok()
    }
}

/// The state a provider record should be brought to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Fully qualified record name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl DesiredRecord {
    /// Desired state of a declared registry record
    pub fn from_entry(registry: &Registry, entry: &RecordEntry) -> Self {
        Self {
            name: registry.fqdn(entry),
            record_type: entry.record_type,
            content: entry.value.clone(),
            ttl: entry.effective_ttl(),
        }
    }
}

impl fmt::Display for DesiredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.name, self.record_type, self.content)
    }
}

/// Trait for DNS provider implementations
///
/// Providers are single-shot: each method performs the API calls it names
/// and nothing else.
///
/// ## Allowed
/// - Perform HTTP/HTTPS API calls to their endpoints only
/// - Parse provider-specific responses
/// - Return success or failure
///
/// ## Forbidden
/// - Retry or back off (a failed call is reported to the caller as-is)
/// - Cache records between calls
/// - Decide whether a write is needed (owned by [`crate::reconcile`])
/// - Spawn tasks or threads
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record in the managed zone
    ///
    /// Implementations follow pagination until the whole zone is listed.
    async fn list_records(&self) -> Result<Vec<ProviderRecord>, crate::Error>;

    /// Create a record
    ///
    /// # Returns
    ///
    /// - `Ok(ProviderRecord)`: The created record, with its new ID
    /// - `Err(Error)`: If the provider rejected the request
    async fn create_record(&self, record: &DesiredRecord) -> Result<ProviderRecord, crate::Error>;

    /// Replace the record identified by `id` with `record`
    async fn update_record(
        &self,
        id: &str,
        record: &DesiredRecord,
    ) -> Result<ProviderRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "cloudflare")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_from_entry_applies_default_ttl() {
        let registry = Registry {
            domain: "nicheweb.dev".to_string(),
            records: vec![RecordEntry::new("www", RecordType::A, "1.2.3.4", "alice")],
        };

        let desired = DesiredRecord::from_entry(&registry, &registry.records[0]);
        assert_eq!(desired.name, "www.nicheweb.dev");
        assert_eq!(desired.ttl, 3600);
        assert_eq!(desired.to_string(), "www.nicheweb.dev A -> 1.2.3.4");
    }

    #[test]
    fn test_managed_type() {
        let record = ProviderRecord {
            id: "1".to_string(),
            name: "nicheweb.dev".to_string(),
            record_type: "MX".to_string(),
            content: "mail.nicheweb.dev".to_string(),
            ttl: 1,
        };
        assert_eq!(record.managed_type(), None);
    }
}
