//! Registry schema validation
//!
//! Validation runs against the raw JSON document rather than the typed
//! [`Registry`], so unknown fields, wrong types and missing properties can
//! all be reported. Every violation is collected; nothing fails fast.
//!
//! A registry that passes validation is the only input the sync engine
//! accepts.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;
use tracing::debug;

use crate::config::ValidationOptions;
use crate::error::{Error, Result, ValidationIssue};
use crate::model::{APEX_MARKER, DEFAULT_TTL, MIN_TTL, RecordType, Registry};

/// Largest TTL accepted (RFC 2181 §8)
pub const MAX_TTL: u64 = 2_147_483_647;

/// Pattern a subdomain label must match, quoted in error messages
pub const SUBDOMAIN_PATTERN: &str = "^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$";

const ROOT_PROPERTIES: &[&str] = &["domain", "records"];
const RECORD_PROPERTIES: &[&str] = &["subdomain", "type", "value", "ttl", "owner"];
const RECORD_REQUIRED: &[&str] = &["subdomain", "type", "value", "owner"];

/// A registry that has passed validation
///
/// Only [`validate_document`] and [`validate_file`] construct one, so any
/// function taking a `ValidRegistry` cannot be handed malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistry(Registry);

impl ValidRegistry {
    /// Give up the validity guarantee and take the registry
    pub fn into_inner(self) -> Registry {
        self.0
    }
}

impl Deref for ValidRegistry {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.0
    }
}

impl AsRef<Registry> for ValidRegistry {
    fn as_ref(&self) -> &Registry {
        &self.0
    }
}

/// Read and validate a registry file
pub async fn validate_file(path: impl AsRef<Path>, options: &ValidationOptions) -> Result<ValidRegistry> {
    let path = path.as_ref();
    debug!("Validating registry file {}", path.display());
    let document = Registry::read_document(path).await?;
    validate_document(&document, options)
}

/// Validate a registry document and return it typed, with defaults applied
///
/// # Returns
///
/// - `Ok(ValidRegistry)`: the document is valid; records without a TTL carry
///   [`DEFAULT_TTL`]
/// - `Err(Error::Validation)`: every violation found
pub fn validate_document(document: &Value, options: &ValidationOptions) -> Result<ValidRegistry> {
    let issues = collect_issues(document, options);
    if !issues.is_empty() {
        debug!("Registry has {} validation issue(s)", issues.len());
        return Err(Error::Validation(issues));
    }

    let mut document = document.clone();
    normalize_ttls(&mut document);

    let mut registry: Registry = serde_json::from_value(document)?;
    for record in &mut registry.records {
        record.ttl.get_or_insert(DEFAULT_TTL);
    }

    Ok(ValidRegistry(registry))
}

/// Collect every schema violation in a registry document
pub fn collect_issues(document: &Value, options: &ValidationOptions) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let Some(root) = document.as_object() else {
        issues.push(ValidationIssue::new("", "must be object"));
        return issues;
    };

    check_properties(root, "", ROOT_PROPERTIES, ROOT_PROPERTIES, &mut issues);

    if let Some(domain) = root.get("domain") {
        check_domain(domain, options, &mut issues);
    }

    if let Some(records) = root.get("records") {
        match records.as_array() {
            Some(records) => {
                if records.is_empty() {
                    issues.push(ValidationIssue::new("/records", "must NOT have fewer than 1 items"));
                }
                for (index, record) in records.iter().enumerate() {
                    check_record(record, &format!("/records/{}", index), &mut issues);
                }
                check_duplicates(records, &mut issues);
            }
            None => issues.push(ValidationIssue::new("/records", "must be array")),
        }
    }

    issues
}

fn check_properties(
    object: &Map<String, Value>,
    path: &str,
    allowed: &[&str],
    required: &[&str],
    issues: &mut Vec<ValidationIssue>,
) {
    for name in required {
        if !object.contains_key(*name) {
            issues.push(ValidationIssue::new(
                path,
                format!("must have required property '{}'", name),
            ));
        }
    }

    for name in object.keys() {
        if !allowed.contains(&name.as_str()) {
            issues.push(ValidationIssue::new(
                path,
                format!("must NOT have additional properties ('{}')", name),
            ));
        }
    }
}

fn check_domain(domain: &Value, options: &ValidationOptions, issues: &mut Vec<ValidationIssue>) {
    let Some(domain) = domain.as_str() else {
        issues.push(ValidationIssue::new("/domain", "must be string"));
        return;
    };

    if let Some(expected) = &options.expected_domain {
        if domain != expected {
            issues.push(ValidationIssue::new(
                "/domain",
                format!("must be equal to constant ('{}')", expected),
            ));
            return;
        }
    }

    if let Some(reason) = domain_name_error(domain) {
        issues.push(ValidationIssue::new("/domain", reason));
    }
}

fn check_record(record: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    let Some(record) = record.as_object() else {
        issues.push(ValidationIssue::new(path, "must be object"));
        return;
    };

    check_properties(record, path, RECORD_PROPERTIES, RECORD_REQUIRED, issues);

    if let Some(subdomain) = record.get("subdomain") {
        let field = format!("{}/subdomain", path);
        match subdomain.as_str() {
            Some(s) if s == APEX_MARKER || is_valid_label(s) => {}
            Some(_) => issues.push(ValidationIssue::new(
                field,
                format!("must match pattern \"{}\"", SUBDOMAIN_PATTERN),
            )),
            None => issues.push(ValidationIssue::new(field, "must be string")),
        }
    }

    if let Some(record_type) = record.get("type") {
        let field = format!("{}/type", path);
        match record_type.as_str() {
            Some(s) if s.parse::<RecordType>().is_ok() => {}
            Some(_) => issues.push(ValidationIssue::new(
                field,
                "must be equal to one of the allowed values (A, AAAA, CNAME, TXT)",
            )),
            None => issues.push(ValidationIssue::new(field, "must be string")),
        }
    }

    if let Some(value) = record.get("value") {
        check_min_length(value, &format!("{}/value", path), 1, issues);
    }

    if let Some(owner) = record.get("owner") {
        check_min_length(owner, &format!("{}/owner", path), 3, issues);
    }

    if let Some(ttl) = record.get("ttl") {
        let field = format!("{}/ttl", path);
        match as_integer(ttl) {
            Some(ttl) if ttl < i128::from(MIN_TTL) => {
                issues.push(ValidationIssue::new(field, format!("must be >= {}", MIN_TTL)));
            }
            Some(ttl) if ttl > i128::from(MAX_TTL) => {
                issues.push(ValidationIssue::new(field, format!("must be <= {}", MAX_TTL)));
            }
            Some(_) => {}
            None => issues.push(ValidationIssue::new(field, "must be integer")),
        }
    }
}

/// Read a JSON number as an integer
///
/// Floats with a zero fractional part (`300.0`, `1e3`) count as integers.
fn as_integer(value: &Value) -> Option<i128> {
    if let Some(n) = value.as_i64() {
        return Some(i128::from(n));
    }
    if let Some(n) = value.as_u64() {
        return Some(i128::from(n));
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i128)
}

/// Rewrite integral float TTLs as integers so they deserialize into `u32`
fn normalize_ttls(document: &mut Value) {
    let Some(records) = document.get_mut("records").and_then(Value::as_array_mut) else {
        return;
    };
    for ttl in records.iter_mut().filter_map(|r| r.get_mut("ttl")) {
        if ttl.is_f64()
            && let Some(n) = as_integer(ttl).and_then(|n| u64::try_from(n).ok())
        {
            *ttl = Value::from(n);
        }
    }
}

fn check_min_length(value: &Value, path: &str, min: usize, issues: &mut Vec<ValidationIssue>) {
    match value.as_str() {
        Some(s) if s.chars().count() < min => issues.push(ValidationIssue::new(
            path,
            format!("must NOT have fewer than {} characters", min),
        )),
        Some(_) => {}
        None => issues.push(ValidationIssue::new(path, "must be string")),
    }
}

/// Report records that share a subdomain and type with an earlier record
///
/// Reconciliation keys provider records by name and type, so a duplicate
/// pair would make two declarations fight over one provider record.
fn check_duplicates(records: &[Value], issues: &mut Vec<ValidationIssue>) {
    let mut seen: HashMap<(String, String), usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        let (Some(subdomain), Some(record_type)) = (
            record.get("subdomain").and_then(Value::as_str),
            record.get("type").and_then(Value::as_str),
        ) else {
            continue;
        };

        let subdomain = if subdomain.is_empty() { APEX_MARKER } else { subdomain };
        let key = (subdomain.to_string(), record_type.to_string());
        if let Some(first) = seen.get(&key) {
            issues.push(ValidationIssue::new(
                format!("/records/{}", index),
                format!("duplicates subdomain and type of /records/{}", first),
            ));
        } else {
            seen.insert(key, index);
        }
    }
}

/// Whether `label` matches [`SUBDOMAIN_PATTERN`]
pub fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    if bytes.is_empty() || bytes.len() > 63 {
        return false;
    }

    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    edge_ok(bytes[0])
        && edge_ok(bytes[bytes.len() - 1])
        && bytes.iter().all(|&b| edge_ok(b) || b == b'-')
}

/// Describe why `domain` is not a valid domain name, if it is not
///
/// Basic RFC 1035 checks: total length, label length, characters and
/// hyphen placement. At least two labels are required.
pub fn domain_name_error(domain: &str) -> Option<String> {
    if domain.is_empty() {
        return Some("must NOT be empty".to_string());
    }

    if domain.len() > 253 {
        return Some(format!("must NOT be longer than 253 characters (got {})", domain.len()));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Some("must be a domain name with at least two labels".to_string());
    }

    for label in labels {
        if label.is_empty() {
            return Some("must NOT contain an empty label".to_string());
        }
        if label.len() > 63 {
            return Some(format!("label '{}' must NOT be longer than 63 characters", label));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Some(format!("label '{}' must contain only letters, digits and hyphens", label));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Some(format!("label '{}' must NOT start or end with a hyphen", label));
        }
    }

    None
}
