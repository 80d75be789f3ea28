//! Core traits for zonereg
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Read and write records via a provider API
//! - [`Resolver`]: Resolve host names for health checks

pub mod dns_provider;
pub mod resolver;

pub use dns_provider::{DesiredRecord, DnsProvider, DnsProviderFactory, ProviderRecord};
pub use resolver::{Resolver, ResolverFactory};
