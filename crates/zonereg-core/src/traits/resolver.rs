// # Resolver Trait
//
// Defines the interface used by health checks to resolve host names.
//
// ## Implementations
//
// - hickory-resolver: `zonereg-resolver-hickory` crate
//
// Lookups are best-effort: a failed lookup is an unhealthy record, never a
// reason to abort the check run.

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Trait for DNS resolver implementations
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve the A records of `host`
    ///
    /// CNAME chains are followed by the resolver. An `Err` covers both
    /// "no such name" and "no A records".
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, crate::Error>;

    /// Resolve the AAAA records of `host`
    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<Ipv6Addr>, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}

/// Helper trait for constructing resolvers from configuration
pub trait ResolverFactory: Send + Sync {
    /// Create a Resolver instance from configuration
    fn create(
        &self,
        config: &crate::config::ResolverConfig,
    ) -> Result<Box<dyn Resolver>, crate::Error>;
}
