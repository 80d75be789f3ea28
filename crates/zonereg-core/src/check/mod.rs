//! Live health checks for declared records
//!
//! | type  | check                                                   |
//! |-------|---------------------------------------------------------|
//! | CNAME | target resolves to at least one A or AAAA address       |
//! | A     | value is an IPv4 address                                |
//! | AAAA  | value is an IPv6 address                                |
//! | TXT   | value is non-empty                                      |
//!
//! Records are checked concurrently and the A/AAAA lookups for one CNAME
//! target run in parallel. Lookups are best-effort: a failure marks the
//! record unhealthy and the run continues.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::CheckConfig;
use crate::error::Result;
use crate::model::{RecordEntry, RecordType, Registry, fqdn};
use crate::traits::Resolver;

/// Outcome of checking one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Declared subdomain
    pub subdomain: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Declared value
    pub target: String,
    /// Whether the record is healthy
    pub ok: bool,
    /// What the check found
    pub message: String,
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- {} {} -> {} : {} ({})",
            self.name,
            self.record_type,
            self.target,
            if self.ok { "OK" } else { "FAIL" },
            self.message
        )
    }
}

/// Results of a full check run
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Name of the registry file that was checked
    pub registry: String,
    /// Domain of the registry
    pub domain: String,
    /// When the run started
    pub generated_at: DateTime<Utc>,
    /// One result per declared record, in registry order
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    /// Number of unhealthy records
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.ok).count()
    }

    /// Whether every record is healthy
    pub fn all_ok(&self) -> bool {
        self.failures() == 0
    }

    /// Render the markdown summary
    pub fn to_markdown(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DNS check summary for {}", self.registry)?;
        writeln!(f)?;
        for result in &self.results {
            writeln!(f, "{}", result)?;
        }
        Ok(())
    }
}

/// Runs health checks against a resolver
pub struct HealthChecker {
    resolver: Arc<dyn Resolver>,
    config: CheckConfig,
}

impl HealthChecker {
    /// Create a checker using `resolver` for CNAME lookups
    pub fn new(resolver: Arc<dyn Resolver>, config: CheckConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { resolver, config })
    }

    /// Check every record of `registry`
    ///
    /// At most `max_concurrency` records are checked at once. Results keep
    /// registry order regardless of completion order.
    pub async fn check(&self, registry: &Registry) -> CheckReport {
        let generated_at = Utc::now();
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));

        debug!(
            "Checking {} record(s) with resolver {}",
            registry.records.len(),
            self.resolver.resolver_name()
        );

        let handles: Vec<_> = registry
            .records
            .iter()
            .cloned()
            .map(|entry| {
                let resolver = Arc::clone(&self.resolver);
                let permits = Arc::clone(&permits);
                let domain = registry.domain.clone();
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    check_record(resolver.as_ref(), &domain, &entry).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (entry, handle) in registry.records.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Check task for {} failed: {}", registry.fqdn(entry), e);
                    result_for(&registry.domain, entry, false, format!("check failed: {}", e))
                }
            };
            results.push(result);
        }

        CheckReport {
            registry: registry_display_name(&self.config),
            domain: registry.domain.clone(),
            generated_at,
            results,
        }
    }
}

/// Check one record
pub async fn check_record(resolver: &dyn Resolver, domain: &str, entry: &RecordEntry) -> CheckResult {
    let (ok, message) = match entry.record_type {
        RecordType::CNAME => check_cname(resolver, &entry.value).await,
        RecordType::A => address_check(entry.value.parse::<Ipv4Addr>().is_ok()),
        RecordType::AAAA => address_check(entry.value.parse::<Ipv6Addr>().is_ok()),
        RecordType::TXT => {
            if entry.value.is_empty() {
                (false, "empty value".to_string())
            } else {
                (true, "ok".to_string())
            }
        }
    };

    result_for(domain, entry, ok, message)
}

/// Resolve the A and AAAA records of a CNAME target in parallel
///
/// Healthy when either lookup yields at least one address.
pub async fn check_cname(resolver: &dyn Resolver, target: &str) -> (bool, String) {
    let (v4, v6) = tokio::join!(resolver.lookup_ipv4(target), resolver.lookup_ipv6(target));

    let mut addrs: Vec<String> = Vec::new();
    match v4 {
        Ok(found) => addrs.extend(found.iter().map(ToString::to_string)),
        Err(e) => debug!("A lookup for {} failed: {}", target, e),
    }
    match v6 {
        Ok(found) => addrs.extend(found.iter().map(ToString::to_string)),
        Err(e) => debug!("AAAA lookup for {} failed: {}", target, e),
    }

    if addrs.is_empty() {
        (false, "target does not resolve (no A/AAAA)".to_string())
    } else {
        (true, format!("resolves to {}", addrs.join(", ")))
    }
}

fn address_check(valid: bool) -> (bool, String) {
    if valid {
        (true, "looks like a valid IP".to_string())
    } else {
        (false, "invalid IP format".to_string())
    }
}

fn result_for(domain: &str, entry: &RecordEntry, ok: bool, message: String) -> CheckResult {
    CheckResult {
        subdomain: entry.subdomain.clone(),
        name: fqdn(&entry.subdomain, domain),
        record_type: entry.record_type,
        target: entry.value.clone(),
        ok,
        message,
    }
}

fn registry_display_name(config: &CheckConfig) -> String {
    config
        .registry_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.registry_path.display().to_string())
}
