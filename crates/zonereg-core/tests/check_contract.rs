//! Architectural Contract Test: Health Checks
//!
//! Constraints verified:
//! - CNAME targets are healthy when either A or AAAA resolves
//! - A lookup failure marks one record unhealthy and the run continues
//! - Results keep registry order even when lookups finish out of order
//! - Records are checked concurrently
//!
//! If this test fails, the check summary is wrong or the run is serialized.

mod common;

use common::*;
use serde_json::json;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use zonereg_core::validate::validate_document;
use zonereg_core::{CheckConfig, HealthChecker, ValidationOptions};

#[tokio::test]
async fn summary_matches_registry() {
    let resolver = StaticResolver::new()
        .with_v4("host.example.net", &[Ipv4Addr::new(192, 0, 2, 10)])
        .with_v6("host.example.net", &["2001:db8::10".parse::<Ipv6Addr>().unwrap()]);

    let document = json!({
        "domain": "nicheweb.dev",
        "records": [
            { "subdomain": "www", "type": "CNAME", "value": "host.example.net", "owner": "alice" },
            { "subdomain": "gone", "type": "CNAME", "value": "gone.example.net", "owner": "alice" },
            { "subdomain": "api", "type": "A", "value": "203.0.113.7", "owner": "bob" },
            { "subdomain": "v6", "type": "AAAA", "value": "not-an-address", "owner": "bob" },
            { "subdomain": "@", "type": "TXT", "value": "v=spf1 -all", "owner": "carol" }
        ]
    });
    let registry = validate_document(&document, &ValidationOptions::default()).unwrap();

    let checker = HealthChecker::new(Arc::new(resolver), CheckConfig::default()).unwrap();
    let report = checker.check(&registry).await;

    assert_eq!(report.failures(), 2);
    assert_eq!(
        report.to_markdown(),
        "DNS check summary for registry.json\n\
         \n\
         - www.nicheweb.dev CNAME -> host.example.net : OK (resolves to 192.0.2.10, 2001:db8::10)\n\
         - gone.nicheweb.dev CNAME -> gone.example.net : FAIL (target does not resolve (no A/AAAA))\n\
         - api.nicheweb.dev A -> 203.0.113.7 : OK (looks like a valid IP)\n\
         - v6.nicheweb.dev AAAA -> not-an-address : FAIL (invalid IP format)\n\
         - nicheweb.dev TXT -> v=spf1 -all : OK (ok)\n"
    );
}

#[tokio::test]
async fn ipv6_only_target_is_healthy() {
    let resolver = StaticResolver::new().with_v6("v6only.example.net", &[Ipv6Addr::LOCALHOST]);
    let document = json!({
        "domain": "nicheweb.dev",
        "records": [{ "subdomain": "www", "type": "CNAME", "value": "v6only.example.net", "owner": "alice" }]
    });
    let registry = validate_document(&document, &ValidationOptions::default()).unwrap();

    let report = HealthChecker::new(Arc::new(resolver), CheckConfig::default())
        .unwrap()
        .check(&registry)
        .await;

    assert!(report.all_ok());
    assert_eq!(report.results[0].message, "resolves to ::1");
}

#[tokio::test(start_paused = true)]
async fn records_checked_concurrently_in_registry_order() {
    let resolver = StaticResolver::new()
        .with_v4("slow.example.net", &[Ipv4Addr::new(192, 0, 2, 1)])
        .with_v4("fast.example.net", &[Ipv4Addr::new(192, 0, 2, 2)])
        .with_delay("slow.example.net", Duration::from_millis(250))
        .with_delay("fast.example.net", Duration::from_millis(10));
    let lookups = Arc::clone(&resolver.lookups);

    let mut records = vec![json!({ "subdomain": "slow", "type": "CNAME", "value": "slow.example.net", "owner": "alice" })];
    for i in 0..4 {
        records.push(json!({
            "subdomain": format!("fast{}", i),
            "type": "CNAME",
            "value": "fast.example.net",
            "owner": "alice"
        }));
    }
    records.push(json!({ "subdomain": "slow2", "type": "CNAME", "value": "slow.example.net", "owner": "alice" }));
    let document = json!({ "domain": "nicheweb.dev", "records": records });
    let registry = validate_document(&document, &ValidationOptions::default()).unwrap();

    let started = tokio::time::Instant::now();
    let report = HealthChecker::new(Arc::new(resolver), CheckConfig::default())
        .unwrap()
        .check(&registry)
        .await;
    let elapsed = started.elapsed();

    let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "slow.nicheweb.dev",
            "fast0.nicheweb.dev",
            "fast1.nicheweb.dev",
            "fast2.nicheweb.dev",
            "fast3.nicheweb.dev",
            "slow2.nicheweb.dev"
        ]
    );
    assert!(report.all_ok());
    assert_eq!(lookups.load(Ordering::SeqCst), 12, "A and AAAA per CNAME");
    assert!(
        elapsed < Duration::from_millis(300),
        "checks ran serially: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn report_serializes_to_json() {
    let document = json!({
        "domain": "nicheweb.dev",
        "records": [{ "subdomain": "api", "type": "A", "value": "203.0.113.7", "owner": "bob" }]
    });
    let registry = validate_document(&document, &ValidationOptions::default()).unwrap();

    let report = HealthChecker::new(Arc::new(StaticResolver::new()), CheckConfig::default())
        .unwrap()
        .check(&registry)
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["domain"], "nicheweb.dev");
    assert_eq!(json["results"][0]["type"], "A");
    assert_eq!(json["results"][0]["ok"], true);
}
