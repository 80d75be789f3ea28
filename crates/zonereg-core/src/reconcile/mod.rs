//! Reconciliation planning
//!
//! Decides, for every declared record, whether the provider must create it,
//! update it, or leave it alone. Planning is pure: it takes the validated
//! registry and a listing of provider records and performs no I/O, so the
//! sync engine can log, dry-run or apply the result.
//!
//! ## Matching
//!
//! A declared record matches the **first** provider record with the same
//! name (case-insensitive, trailing dot ignored) and the same type. Further
//! provider records with that name and type are left untouched.
//!
//! ## Equality
//!
//! | type  | content comparison                         |
//! |-------|--------------------------------------------|
//! | A     | parsed IPv4 address                        |
//! | AAAA  | parsed IPv6 address (`::1` == `0:0::1`)    |
//! | CNAME | case-insensitive, trailing dot ignored     |
//! | TXT   | exact                                      |
//!
//! A record whose content and TTL both match is unchanged.

use serde::Serialize;
use std::collections::HashSet;
use std::net::IpAddr;

use crate::model::{RecordType, Registry, normalize_name};
use crate::traits::{DesiredRecord, ProviderRecord};

/// What must happen to one declared record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Change {
    /// No provider record exists for this name and type
    Create {
        desired: DesiredRecord,
    },
    /// A provider record exists but differs in content or TTL
    Update {
        desired: DesiredRecord,
        current: ProviderRecord,
    },
    /// The provider record already matches
    Unchanged {
        desired: DesiredRecord,
        current: ProviderRecord,
    },
}

impl Change {
    /// The declared state this change converges to
    pub fn desired(&self) -> &DesiredRecord {
        match self {
            Change::Create { desired }
            | Change::Update { desired, .. }
            | Change::Unchanged { desired, .. } => desired,
        }
    }

    /// Whether applying this change writes to the provider
    pub fn is_write(&self) -> bool {
        !matches!(self, Change::Unchanged { .. })
    }
}

/// The full set of changes for one registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// One change per declared record, in registry order
    pub changes: Vec<Change>,

    /// Provider records of a managed type that no declaration covers
    ///
    /// Reported only; zonereg never deletes provider records.
    pub unmanaged: Vec<ProviderRecord>,
}

impl SyncPlan {
    /// Number of records to create
    pub fn creates(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, Change::Create { .. }))
            .count()
    }

    /// Number of records to update
    pub fn updates(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, Change::Update { .. }))
            .count()
    }

    /// Number of records already in the declared state
    pub fn unchanged(&self) -> usize {
        self.changes.len() - self.creates() - self.updates()
    }

    /// Whether applying the plan writes nothing
    pub fn is_noop(&self) -> bool {
        self.changes.iter().all(|c| !c.is_write())
    }
}

/// Compute the changes that bring `existing` to the state `registry` declares
///
/// `existing` is the provider's listing of the zone; records outside the
/// registry's domain are ignored.
pub fn plan(registry: &Registry, existing: &[ProviderRecord]) -> SyncPlan {
    let mut changes = Vec::with_capacity(registry.records.len());
    let mut declared: HashSet<(String, RecordType)> = HashSet::new();

    for entry in &registry.records {
        let desired = DesiredRecord::from_entry(registry, entry);
        let name = normalize_name(&desired.name);
        declared.insert((name.clone(), desired.record_type));

        let current = existing.iter().find(|record| {
            record.managed_type() == Some(desired.record_type) && normalize_name(&record.name) == name
        });

        let change = match current {
            None => Change::Create { desired },
            Some(current) if matches(&desired, current) => Change::Unchanged {
                desired,
                current: current.clone(),
            },
            Some(current) => Change::Update {
                desired,
                current: current.clone(),
            },
        };
        changes.push(change);
    }

    let domain = normalize_name(&registry.domain);
    let unmanaged = existing
        .iter()
        .filter(|record| {
            let Some(record_type) = record.managed_type() else {
                return false;
            };
            let name = normalize_name(&record.name);
            in_domain(&name, &domain) && !declared.contains(&(name, record_type))
        })
        .cloned()
        .collect();

    SyncPlan { changes, unmanaged }
}

/// Whether a provider record already holds the desired content and TTL
pub fn matches(desired: &DesiredRecord, current: &ProviderRecord) -> bool {
    desired.ttl == current.ttl && content_eq(desired.record_type, &desired.content, &current.content)
}

/// Compare record content the way the record type defines equality
pub fn content_eq(record_type: RecordType, desired: &str, current: &str) -> bool {
    match record_type {
        RecordType::A | RecordType::AAAA => {
            match (desired.parse::<IpAddr>(), current.parse::<IpAddr>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => desired == current,
            }
        }
        RecordType::CNAME => normalize_name(desired) == normalize_name(current),
        RecordType::TXT => desired == current,
    }
}

fn in_domain(name: &str, domain: &str) -> bool {
    name == domain
        || name
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
