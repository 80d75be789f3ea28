//! Registry sync engine
//!
//! The SyncEngine is responsible for:
//! - Refusing registries that have not passed validation
//! - Listing the provider's records once
//! - Planning creates and updates via [`crate::reconcile`]
//! - Applying the plan, or logging it in dry-run mode
//!
//! ## Architecture
//!
//! ```text
//! registry.json ── validate ──▶ ValidRegistry
//!                                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  SyncEngine  │──── SyncEvent ───▶ (monitoring)
//!                            └──────────────┘
//!                               │        ▲
//!                 list / create │        │ ProviderRecord
//!                 / update      ▼        │
//!                            ┌──────────────┐
//!                            │ DnsProvider  │
//!                            └──────────────┘
//! ```
//!
//! ## Failure Semantics
//!
//! There is no retry. The first provider error stops the run; records
//! already written stay written and a rerun converges the rest.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::reconcile::{self, Change, SyncPlan};
use crate::traits::DnsProvider;
use crate::validate::{self, ValidRegistry};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Sync started
    Started {
        records_count: usize,
        dry_run: bool,
    },

    /// Plan computed from the provider listing
    Planned {
        creates: usize,
        updates: usize,
        unchanged: usize,
        unmanaged: usize,
    },

    /// Record created at the provider
    RecordCreated {
        name: String,
        record_type: String,
    },

    /// Record updated at the provider
    RecordUpdated {
        name: String,
        record_type: String,
        previous_content: String,
    },

    /// Record already in the declared state
    RecordUnchanged {
        name: String,
        record_type: String,
    },

    /// Write skipped because the engine runs in dry-run mode
    RecordSkipped {
        name: String,
        record_type: String,
    },

    /// A provider call failed and the run stopped
    Failed {
        name: String,
        error: String,
    },

    /// Sync finished
    Completed {
        written: usize,
    },
}

/// Summary of one sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Whether writes were skipped
    pub dry_run: bool,
    /// Names of records created (or that would be, in dry-run mode)
    pub created: Vec<String>,
    /// Names of records updated (or that would be, in dry-run mode)
    pub updated: Vec<String>,
    /// Names of records already in the declared state
    pub unchanged: Vec<String>,
    /// Provider records in the domain that the registry does not declare
    pub unmanaged: Vec<String>,
}

impl SyncReport {
    /// Number of provider writes performed (or planned, in dry-run mode)
    pub fn written(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Registry sync engine
///
/// Owns one provider and applies validated registries to it. Each call to
/// [`SyncEngine::sync`] is one linear run: list, plan, apply.
pub struct SyncEngine {
    /// DNS provider holding the zone
    provider: Box<dyn DnsProvider>,

    /// Engine configuration
    config: SyncConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        provider: Box<dyn DnsProvider>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        if config.dry_run {
            warn!(
                "Sync engine running in DRY-RUN mode against {} - no changes will be made",
                provider.provider_name()
            );
        }

        let engine = Self {
            provider,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Validate the registry file at `path` and sync it
    ///
    /// Nothing is sent to the provider unless validation passes.
    pub async fn sync_file(&self, path: impl AsRef<Path>) -> Result<SyncReport> {
        let registry = validate::validate_file(path, &self.config.validation_options()).await?;
        self.sync(&registry).await
    }

    /// Validate a registry document and sync it
    pub async fn sync_document(&self, document: &serde_json::Value) -> Result<SyncReport> {
        let registry = validate::validate_document(document, &self.config.validation_options())?;
        self.sync(&registry).await
    }

    /// Compute the plan for a registry without applying it
    pub async fn plan(&self, registry: &ValidRegistry) -> Result<SyncPlan> {
        self.check_domain(registry)?;

        let existing = self
            .provider
            .list_records()
            .await
            .map_err(|e| Error::provider(self.provider.provider_name(), e.to_string()))?;
        debug!("Provider listed {} record(s)", existing.len());

        Ok(reconcile::plan(registry, &existing))
    }

    /// Sync a validated registry to the provider
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: every declared record is in place (or would be, in dry-run mode)
    /// - `Err(Error)`: the domain does not match, or a provider call failed
    pub async fn sync(&self, registry: &ValidRegistry) -> Result<SyncReport> {
        let started_at = Utc::now();
        let dry_run = self.config.dry_run;

        self.emit_event(SyncEvent::Started {
            records_count: registry.records.len(),
            dry_run,
        });

        let plan = self.plan(registry).await?;

        self.emit_event(SyncEvent::Planned {
            creates: plan.creates(),
            updates: plan.updates(),
            unchanged: plan.unchanged(),
            unmanaged: plan.unmanaged.len(),
        });

        for record in &plan.unmanaged {
            info!(
                "Provider record not declared in registry: {} {} -> {}",
                record.name, record.record_type, record.content
            );
        }

        let mut report = SyncReport {
            started_at,
            finished_at: started_at,
            dry_run,
            created: Vec::new(),
            updated: Vec::new(),
            unchanged: Vec::new(),
            unmanaged: plan.unmanaged.iter().map(|r| r.name.clone()).collect(),
        };

        for change in &plan.changes {
            let desired = change.desired();
            info!("Sync {}", desired);

            if let Err(e) = self.apply(change).await {
                error!("Failed to sync {}: {}", desired, e);
                self.emit_event(SyncEvent::Failed {
                    name: desired.name.clone(),
                    error: e.to_string(),
                });
                return Err(e);
            }

            match change {
                Change::Create { .. } => report.created.push(desired.name.clone()),
                Change::Update { .. } => report.updated.push(desired.name.clone()),
                Change::Unchanged { .. } => report.unchanged.push(desired.name.clone()),
            }
        }

        report.finished_at = Utc::now();
        self.emit_event(SyncEvent::Completed {
            written: report.written(),
        });
        info!("Sync complete");

        Ok(report)
    }

    /// Apply a single change
    async fn apply(&self, change: &Change) -> Result<()> {
        let desired = change.desired();
        let record_type = desired.record_type.to_string();

        if self.config.dry_run && change.is_write() {
            info!(
                "[DRY-RUN] Would {} {} with payload: {}",
                if matches!(change, Change::Create { .. }) { "create" } else { "update" },
                desired.name,
                serde_json::to_string(desired)?
            );
            self.emit_event(SyncEvent::RecordSkipped {
                name: desired.name.clone(),
                record_type,
            });
            return Ok(());
        }

        match change {
            Change::Create { desired } => {
                let created = self.do_write(self.provider.create_record(desired)).await?;
                info!("Created record {} (id: {})", desired, created.id);
                self.emit_event(SyncEvent::RecordCreated {
                    name: desired.name.clone(),
                    record_type,
                });
            }
            Change::Update { desired, current } => {
                self.do_write(self.provider.update_record(&current.id, desired))
                    .await?;
                info!("Updated record {} (was: {}, ttl {})", desired, current.content, current.ttl);
                self.emit_event(SyncEvent::RecordUpdated {
                    name: desired.name.clone(),
                    record_type,
                    previous_content: current.content.clone(),
                });
            }
            Change::Unchanged { desired, .. } => {
                debug!("Record {} unchanged", desired);
                self.emit_event(SyncEvent::RecordUnchanged {
                    name: desired.name.clone(),
                    record_type,
                });
            }
        }

        Ok(())
    }

    /// Await a provider write, tagging failures with the provider name
    async fn do_write<T>(
        &self,
        write: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        write
            .await
            .map_err(|e| Error::provider(self.provider.provider_name(), e.to_string()))
    }

    fn check_domain(&self, registry: &ValidRegistry) -> Result<()> {
        if registry.domain != self.config.domain {
            return Err(Error::config(format!(
                "registry domain must be {} (got {})",
                self.config.domain, registry.domain
            )));
        }
        Ok(())
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }
}
