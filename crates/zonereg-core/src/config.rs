//! Configuration types for zonereg
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Registry file name used when no path is configured
pub const DEFAULT_REGISTRY_FILE: &str = "registry.json";

/// Domain the registry is expected to declare when none is configured
pub const DEFAULT_DOMAIN: &str = "nicheweb.dev";

/// Options controlling registry validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// When set, the registry's `domain` must equal this value
    #[serde(default)]
    pub expected_domain: Option<String>,
}

impl ValidationOptions {
    /// Require the registry to declare `domain`
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            expected_domain: Some(domain.into()),
        }
    }
}

/// DNS provider configuration
///
/// The Debug implementation never prints the API token.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone holding the managed domain
        zone_id: String,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, zone_id } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("CLOUDFLARE_API_TOKEN not set"));
                }
                if zone_id.is_empty() {
                    return Err(crate::Error::config("CLOUDFLARE_ZONE_ID not set"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .finish(),
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Resolver implementation to use
    #[serde(default = "default_resolver_kind")]
    pub kind: String,

    /// Name servers to query; empty means the system configuration
    #[serde(default)]
    pub nameservers: Vec<IpAddr>,

    /// Per-query timeout in seconds
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.kind.is_empty() {
            return Err(crate::Error::config("Resolver kind cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Resolver timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind: default_resolver_kind(),
            nameservers: Vec::new(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Domain the registry must declare
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Plan and log changes without writing them
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    /// Create a configuration for `domain` with defaults
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(reason) = crate::validate::domain_name_error(&self.domain) {
            return Err(crate::Error::config(format!(
                "Invalid sync domain '{}': {}",
                self.domain, reason
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Validation options matching this configuration
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions::for_domain(self.domain.clone())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(default_domain())
    }
}

/// Health check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Path of the registry file named in the summary header
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Upper bound on concurrently checked records
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl CheckConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.registry_path.as_os_str().is_empty() {
            return Err(crate::Error::config("Registry path cannot be empty"));
        }
        if self.max_concurrency == 0 {
            return Err(crate::Error::config("Check concurrency must be > 0"));
        }
        Ok(())
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_registry_path() -> PathBuf {
    PathBuf::from(DEFAULT_REGISTRY_FILE)
}

fn default_resolver_kind() -> String {
    "hickory".to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_max_concurrency() -> usize {
    16
}
