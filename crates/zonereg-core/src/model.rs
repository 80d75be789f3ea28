//! Registry data model
//!
//! The registry is a JSON document declaring every DNS record of a single
//! domain:
//!
//! ```json
//! {
//!   "domain": "nicheweb.dev",
//!   "records": [
//!     { "subdomain": "www", "type": "CNAME", "value": "host.example.net", "ttl": 3600, "owner": "alice" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// TTL applied to records that do not declare one
pub const DEFAULT_TTL: u32 = 3600;

/// Lowest TTL a record may declare
pub const MIN_TTL: u32 = 60;

/// Subdomain value that addresses the zone apex
pub const APEX_MARKER: &str = "@";

/// Declared state of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// The domain every record lives under
    pub domain: String,

    /// Declared records, in file order
    pub records: Vec<RecordEntry>,
}

impl Registry {
    /// Read a registry file as raw JSON
    ///
    /// The raw value is what [`crate::validate`] inspects, so that unknown
    /// fields and wrong types can be reported instead of failing the parse.
    pub async fn read_document(path: impl AsRef<Path>) -> Result<serde_json::Value> {
        let path = path.as_ref();
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(format!("{} not found.", display_name(path))));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&contents)?)
    }

    /// Fully qualified name of a record in this registry
    pub fn fqdn(&self, record: &RecordEntry) -> String {
        fqdn(&record.subdomain, &self.domain)
    }
}

/// A single declared DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordEntry {
    /// Label under the domain (`@` or empty for the apex)
    pub subdomain: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Record content: an address, a target host name, or text
    pub value: String,

    /// Time-to-live in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Who is responsible for this record
    pub owner: String,
}

impl RecordEntry {
    /// Create a new record entry without an explicit TTL
    pub fn new(
        subdomain: impl Into<String>,
        record_type: RecordType,
        value: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            subdomain: subdomain.into(),
            record_type,
            value: value.into(),
            ttl: None,
            owner: owner.into(),
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Declared TTL, or [`DEFAULT_TTL`]
    pub fn effective_ttl(&self) -> u32 {
        self.ttl.unwrap_or(DEFAULT_TTL)
    }
}

/// DNS record types the registry may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    #[allow(clippy::upper_case_acronyms)]
    AAAA,
    /// Alias to another host name
    #[allow(clippy::upper_case_acronyms)]
    CNAME,
    /// Free-form text
    #[allow(clippy::upper_case_acronyms)]
    TXT,
}

impl RecordType {
    /// All supported types, in declaration order
    pub const ALL: [RecordType; 4] = [RecordType::A, RecordType::AAAA, RecordType::CNAME, RecordType::TXT];

    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::TXT => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("Unsupported record type: {}", s)))
    }
}

/// Build the fully qualified name for a subdomain of `domain`
///
/// An empty subdomain or [`APEX_MARKER`] addresses the domain itself.
pub fn fqdn(subdomain: &str, domain: &str) -> String {
    if subdomain.is_empty() || subdomain == APEX_MARKER {
        domain.to_string()
    } else {
        format!("{}.{}", subdomain, domain)
    }
}

/// Normalize a host name for comparison: lowercase, no trailing dot
pub fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
