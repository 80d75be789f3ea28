//! Architectural Contract Test: Validation Gates Sync
//!
//! Constraints verified:
//! - A registry that fails validation never reaches the provider
//! - A registry for another domain never reaches the provider
//! - A missing registry file never reaches the provider
//!
//! If this test fails, malformed input can modify live DNS.

mod common;

use common::*;
use serde_json::json;
use zonereg_core::{Error, SyncConfig, SyncEngine, ValidationOptions};
use zonereg_core::validate::validate_document;

#[tokio::test]
async fn invalid_registry_makes_no_provider_calls() {
    let (provider, state) = MockDnsProvider::new();
    let (engine, _events) =
        SyncEngine::new(Box::new(provider), SyncConfig::new("nicheweb.dev")).expect("engine construction succeeds");

    let mut document = sample_document();
    document["records"][1]["ttl"] = json!(10);
    document["records"][2]["owner"] = json!("x");

    let err = engine.sync_document(&document).await.unwrap_err();
    let issues = err.validation_issues().expect("validation error");
    assert_eq!(issues.len(), 2);
    assert_eq!(state.total_calls(), 0, "provider must not be contacted");
}

#[tokio::test]
async fn wrong_domain_makes_no_provider_calls() {
    let (provider, state) = MockDnsProvider::new();
    let (engine, _events) =
        SyncEngine::new(Box::new(provider), SyncConfig::new("nicheweb.dev")).expect("engine construction succeeds");

    let mut document = sample_document();
    document["domain"] = json!("example.com");

    let err = engine.sync_document(&document).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(state.total_calls(), 0);
}

#[tokio::test]
async fn registry_validated_for_other_domain_is_refused() {
    let (provider, state) = MockDnsProvider::new();
    let (engine, _events) =
        SyncEngine::new(Box::new(provider), SyncConfig::new("nicheweb.dev")).expect("engine construction succeeds");

    let mut document = sample_document();
    document["domain"] = json!("example.com");
    let registry = validate_document(&document, &ValidationOptions::default()).expect("valid without domain pin");

    let err = engine.sync(&registry).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    assert_eq!(state.total_calls(), 0);
}

#[tokio::test]
async fn missing_registry_file_makes_no_provider_calls() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, state) = MockDnsProvider::new();
    let (engine, _events) =
        SyncEngine::new(Box::new(provider), SyncConfig::new("nicheweb.dev")).expect("engine construction succeeds");

    let err = engine
        .sync_file(dir.path().join("registry.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(state.total_calls(), 0);
}

#[tokio::test]
async fn valid_registry_file_is_synced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(&path, serde_json::to_string_pretty(&sample_document()).unwrap()).unwrap();

    let (provider, state) = MockDnsProvider::new();
    let (engine, _events) =
        SyncEngine::new(Box::new(provider), SyncConfig::new("nicheweb.dev")).expect("engine construction succeeds");

    let report = engine.sync_file(&path).await.expect("sync succeeds");
    assert_eq!(report.created.len(), 3);
    assert_eq!(state.list_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}
