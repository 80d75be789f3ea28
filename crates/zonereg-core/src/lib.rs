// # zonereg-core
//
// Core library for zonereg, a declarative DNS record registry.
//
// ## Architecture Overview
//
// A single JSON file (`registry.json`) declares every record of one domain.
// This library provides the three tasks that operate on it:
//
// - **validate**: Schema validation that gates every sync
// - **check**: Live health checks of declared records via a `Resolver`
// - **sync**: Reconciliation of declared records with a `DnsProvider`
//
// ## Design Principles
//
// 1. **Validation first**: The sync engine only accepts a `ValidRegistry`
// 2. **Pure planning**: `reconcile::plan` decides creates and updates without I/O
// 3. **Plugin-based**: Providers and resolvers are registered by name
// 4. **Library-first**: The `zonereg` binary is a thin layer over this crate
// 5. **Single-shot**: No retries, no caches, no local state

pub mod check;
pub mod config;
pub mod error;
pub mod model;
pub mod providers;
pub mod reconcile;
pub mod sync;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use check::{CheckReport, CheckResult, HealthChecker};
pub use config::{CheckConfig, ProviderConfig, ResolverConfig, SyncConfig, ValidationOptions};
pub use error::{Error, Result, ValidationIssue};
pub use model::{RecordEntry, RecordType, Registry};
pub use providers::ProviderRegistry;
pub use reconcile::{Change, SyncPlan};
pub use sync::{SyncEngine, SyncEvent, SyncReport};
pub use traits::{DesiredRecord, DnsProvider, ProviderRecord, Resolver};
pub use validate::ValidRegistry;
