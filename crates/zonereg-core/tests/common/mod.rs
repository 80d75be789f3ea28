//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the core
//! drives its provider and resolver, without any network access.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zonereg_core::error::{Error, Result};
use zonereg_core::traits::{DesiredRecord, DnsProvider, ProviderRecord, Resolver};

/// Shared call counters and zone contents of a [`MockDnsProvider`]
#[derive(Default)]
pub struct ProviderState {
    pub records: Mutex<Vec<ProviderRecord>>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    /// Names whose create/update fails
    pub failing: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl ProviderState {
    pub fn writes(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst) + self.update_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst) + self.writes()
    }

    pub fn record(&self, name: &str, record_type: &str) -> Option<ProviderRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name && r.record_type == record_type)
            .cloned()
    }

    pub fn fail_on(&self, name: &str) {
        self.failing.lock().unwrap().push(name.to_string());
    }

    fn check_failure(&self, name: &str) -> Result<()> {
        if self.failing.lock().unwrap().iter().any(|n| n == name) {
            return Err(Error::provider(
                "mock",
                "Cloudflare API error 500: internal error",
            ));
        }
        Ok(())
    }
}

/// An in-memory provider that records every call
pub struct MockDnsProvider {
    pub state: Arc<ProviderState>,
}

impl MockDnsProvider {
    pub fn new() -> (Self, Arc<ProviderState>) {
        let state = Arc::new(ProviderState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    /// Create a provider whose zone already holds `records`
    pub fn with_records(records: Vec<ProviderRecord>) -> (Self, Arc<ProviderState>) {
        let (provider, state) = Self::new();
        state.next_id.store(records.len(), Ordering::SeqCst);
        *state.records.lock().unwrap() = records;
        (provider, state)
    }

    /// A second handle onto the same zone, for simulating a rerun
    pub fn sharing_state_with(state: &Arc<ProviderState>) -> Self {
        Self {
            state: Arc::clone(state),
        }
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self) -> Result<Vec<ProviderRecord>> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.records.lock().unwrap().clone())
    }

    async fn create_record(&self, record: &DesiredRecord) -> Result<ProviderRecord> {
        self.state.create_calls.fetch_add(1, Ordering::SeqCst);
        self.state.check_failure(&record.name)?;

        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        let created = ProviderRecord {
            id: format!("rec-{}", id),
            name: record.name.clone(),
            record_type: record.record_type.to_string(),
            content: record.content.clone(),
            ttl: record.ttl,
        };
        self.state.records.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_record(&self, id: &str, record: &DesiredRecord) -> Result<ProviderRecord> {
        self.state.update_calls.fetch_add(1, Ordering::SeqCst);
        self.state.check_failure(&record.name)?;

        let mut records = self.state.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found(format!("DNS record not found: {}", id)))?;
        existing.name = record.name.clone();
        existing.record_type = record.record_type.to_string();
        existing.content = record.content.clone();
        existing.ttl = record.ttl;
        Ok(existing.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A resolver answering from a fixed table, with optional per-host delays
#[derive(Default)]
pub struct StaticResolver {
    v4: HashMap<String, Vec<Ipv4Addr>>,
    v6: HashMap<String, Vec<Ipv6Addr>>,
    delays: HashMap<String, Duration>,
    pub lookups: Arc<AtomicUsize>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_v4(mut self, host: &str, addrs: &[Ipv4Addr]) -> Self {
        self.v4.insert(host.to_string(), addrs.to_vec());
        self
    }

    pub fn with_v6(mut self, host: &str, addrs: &[Ipv6Addr]) -> Self {
        self.v6.insert(host.to_string(), addrs.to_vec());
        self
    }

    pub fn with_delay(mut self, host: &str, delay: Duration) -> Self {
        self.delays.insert(host.to_string(), delay);
        self
    }

    async fn pause(&self, host: &str) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(host) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        self.pause(host).await;
        self.v4
            .get(host)
            .cloned()
            .ok_or_else(|| Error::resolver(format!("no A records for {}", host)))
    }

    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<Ipv6Addr>> {
        self.pause(host).await;
        self.v6
            .get(host)
            .cloned()
            .ok_or_else(|| Error::resolver(format!("no AAAA records for {}", host)))
    }

    fn resolver_name(&self) -> &'static str {
        "static"
    }
}

/// A provider record as a zone listing would return it
pub fn provider_record(id: &str, name: &str, record_type: &str, content: &str, ttl: u32) -> ProviderRecord {
    ProviderRecord {
        id: id.to_string(),
        name: name.to_string(),
        record_type: record_type.to_string(),
        content: content.to_string(),
        ttl,
    }
}

/// A valid registry document for nicheweb.dev
pub fn sample_document() -> Value {
    json!({
        "domain": "nicheweb.dev",
        "records": [
            { "subdomain": "www", "type": "CNAME", "value": "host.example.net", "owner": "alice" },
            { "subdomain": "api", "type": "A", "value": "203.0.113.7", "ttl": 300, "owner": "bob" },
            { "subdomain": "@", "type": "TXT", "value": "v=spf1 -all", "owner": "carol" }
        ]
    })
}
