// # hickory Resolver
//
// Resolves CNAME targets for zonereg health checks using hickory-resolver.
//
// - Uses the system resolver configuration unless name servers are given
// - One A or AAAA query per call, bounded by the configured timeout
// - Lookup failures are returned to the caller; the health checker decides
//   what they mean
//
// ## Configuration
//
// ```rust
// use zonereg_core::config::ResolverConfig;
//
// let config = ResolverConfig {
//     kind: "hickory".to_string(),
//     nameservers: vec!["1.1.1.1".parse().unwrap()],
//     timeout_secs: 5,
// };
// ```

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig as HickoryConfig, ResolverOpts};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use zonereg_core::config::ResolverConfig;
use zonereg_core::traits::{Resolver, ResolverFactory};
use zonereg_core::{Error, ProviderRegistry, Result};

/// DNS port used for explicitly configured name servers
const DNS_PORT: u16 = 53;

/// Resolver backed by hickory's async stub resolver
pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver").finish_non_exhaustive()
    }
}

impl HickoryResolver {
    /// Create a resolver from the system configuration (`/etc/resolv.conf`)
    pub fn from_system_conf(timeout: Duration) -> Result<Self> {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| Error::resolver(format!("Failed to read system resolver config: {}", e)))?;
        opts.timeout = timeout;

        Ok(Self::with_config(config, opts))
    }

    /// Create a resolver querying `nameservers` over UDP/TCP port 53
    pub fn with_nameservers(nameservers: &[IpAddr], timeout: Duration) -> Result<Self> {
        if nameservers.is_empty() {
            return Err(Error::config("At least one name server is required"));
        }

        let group = NameServerConfigGroup::from_ips_clear(nameservers, DNS_PORT, true);
        let config = HickoryConfig::from_parts(None, vec![], group);

        Ok(Self::with_config(config, lookup_options(timeout)))
    }

    fn with_config(config: HickoryConfig, opts: ResolverOpts) -> Self {
        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

/// Resolver options used for explicit name servers
fn lookup_options(timeout: Duration) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    opts
}

/// Make `host` absolute so search domains are never appended
fn absolute(host: &str) -> String {
    if host.ends_with('.') {
        host.to_string()
    } else {
        format!("{}.", host)
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        let lookup = self
            .inner
            .ipv4_lookup(absolute(host))
            .await
            .map_err(|e| Error::resolver(format!("A lookup for {} failed: {}", host, e)))?;

        let addrs: Vec<Ipv4Addr> = lookup.iter().map(|a| a.0).collect();
        tracing::trace!("{} A -> {:?}", host, addrs);
        Ok(addrs)
    }

    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<Ipv6Addr>> {
        let lookup = self
            .inner
            .ipv6_lookup(absolute(host))
            .await
            .map_err(|e| Error::resolver(format!("AAAA lookup for {} failed: {}", host, e)))?;

        let addrs: Vec<Ipv6Addr> = lookup.iter().map(|aaaa| aaaa.0).collect();
        tracing::trace!("{} AAAA -> {:?}", host, addrs);
        Ok(addrs)
    }

    fn resolver_name(&self) -> &'static str {
        "hickory"
    }
}

/// Factory for creating hickory resolvers
pub struct HickoryFactory;

impl ResolverFactory for HickoryFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn Resolver>> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let resolver = if config.nameservers.is_empty() {
            HickoryResolver::from_system_conf(timeout)?
        } else {
            tracing::debug!("Using name servers {:?}", config.nameservers);
            HickoryResolver::with_nameservers(&config.nameservers, timeout)?
        };

        Ok(Box::new(resolver))
    }
}

/// Register the hickory resolver with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_resolver("hickory", Box::new(HickoryFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute() {
        assert_eq!(absolute("host.example.net"), "host.example.net.");
        assert_eq!(absolute("host.example.net."), "host.example.net.");
    }

    #[test]
    fn test_lookup_options() {
        let opts = lookup_options(Duration::from_secs(3));
        assert_eq!(opts.timeout, Duration::from_secs(3));
        assert_eq!(opts.attempts, 1);
    }

    #[test]
    fn test_no_nameservers_rejected() {
        let err = HickoryResolver::with_nameservers(&[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_factory_with_nameservers() {
        let factory = HickoryFactory;
        let config = ResolverConfig {
            kind: "hickory".to_string(),
            nameservers: vec!["192.0.2.53".parse().unwrap()],
            timeout_secs: 1,
        };

        let resolver = factory.create(&config).unwrap();
        assert_eq!(resolver.resolver_name(), "hickory");
    }

    #[test]
    fn test_register() {
        let registry = ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_resolver("hickory"));
    }
}
