// # zonereg - DNS registry CLI
//
// This binary is a THIN integration layer over zonereg-core:
// - Reading configuration from environment variables and flags
// - Initializing logging and the runtime
// - Registering the provider and resolver plugins
// - Running one task (validate, check or sync) and mapping the outcome
//   to an exit code
//
// Validation rules, health checks and reconciliation all live in
// zonereg-core.
//
// ## Configuration
//
// ### Registry
// - `ZONEREG_REGISTRY`: Path to the registry file (default `registry.json`, `--registry` overrides)
// - `ZONEREG_DOMAIN`: Domain the registry must declare (default `nicheweb.dev`)
//
// ### Sync
// - `CLOUDFLARE_API_TOKEN`: API token with Zone:DNS:Edit permission
// - `CLOUDFLARE_ZONE_ID`: Zone holding the domain
// - `ZONEREG_MODE`: Set to `dry-run` to log changes without writing them (or pass `--dry-run`)
//
// ### Check
// - `ZONEREG_NAMESERVERS`: Comma-separated name servers (default: system configuration)
//
// ### Logging
// - `ZONEREG_LOG_LEVEL`: trace, debug, info, warn or error (default `info`)
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=...
// export CLOUDFLARE_ZONE_ID=...
//
// zonereg validate
// zonereg check --strict
// zonereg sync --dry-run
// ```

mod cli;

use anyhow::Context;
use clap::Parser;
use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use zonereg_core::config::{DEFAULT_DOMAIN, DEFAULT_REGISTRY_FILE};
use zonereg_core::validate;
use zonereg_core::{
    CheckConfig, Error, HealthChecker, ProviderConfig, ProviderRegistry, ResolverConfig,
    SyncConfig, SyncEngine, ValidationOptions,
};

use crate::cli::{Cli, Command, OutputFormat};

/// Exit codes for the outcome of a task
///
/// - 0: Task succeeded
/// - 1: Registry invalid, configuration missing, or strict check failed
/// - 2: Runtime error (provider, resolver or I/O failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoneregExitCode {
    /// Task succeeded
    Success = 0,
    /// Validation or configuration failure
    Failure = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ZoneregExitCode> for ExitCode {
    fn from(code: ZoneregExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Map a task error to its exit code
fn exit_code_for(error: &Error) -> ZoneregExitCode {
    match error {
        Error::Validation(_)
        | Error::Config(_)
        | Error::NotFound(_)
        | Error::Json(_)
        | Error::InvalidInput(_) => ZoneregExitCode::Failure,
        _ => ZoneregExitCode::RuntimeError,
    }
}

/// Application configuration
///
/// Debug is not derived so the API token cannot reach logs.
struct Config {
    registry_path: PathBuf,
    domain: String,
    dry_run: bool,
    api_token: String,
    zone_id: String,
    nameservers: Vec<IpAddr>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let nameservers = match lookup("ZONEREG_NAMESERVERS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<IpAddr>()
                        .with_context(|| format!("ZONEREG_NAMESERVERS contains an invalid address: '{}'", s))
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            registry_path: lookup("ZONEREG_REGISTRY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_FILE)),
            domain: lookup("ZONEREG_DOMAIN").unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            dry_run: lookup("ZONEREG_MODE").is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run")),
            api_token: lookup("CLOUDFLARE_API_TOKEN").unwrap_or_default(),
            zone_id: lookup("CLOUDFLARE_ZONE_ID").unwrap_or_default(),
            nameservers,
            log_level: lookup("ZONEREG_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Apply command-line overrides
    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.registry {
            self.registry_path = path.clone();
        }
        if let Command::Sync { dry_run: true } = cli.command {
            self.dry_run = true;
        }
    }

    /// Validate the configuration
    ///
    /// Provider credentials are checked when the provider is created, so
    /// `validate` and `check` run without them.
    fn validate(&self) -> anyhow::Result<()> {
        if self.registry_path.as_os_str().is_empty() {
            anyhow::bail!("ZONEREG_REGISTRY cannot be empty");
        }

        if let Some(reason) = validate::domain_name_error(&self.domain) {
            anyhow::bail!("ZONEREG_DOMAIN '{}' is not valid: {}", self.domain, reason);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ZONEREG_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn validation_options(&self) -> ValidationOptions {
        ValidationOptions::for_domain(self.domain.clone())
    }

    fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: self.api_token.clone(),
            zone_id: self.zone_id.clone(),
        }
    }

    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            nameservers: self.nameservers.clone(),
            ..ResolverConfig::default()
        }
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(self.domain.clone()).with_dry_run(self.dry_run)
    }

    fn check_config(&self) -> CheckConfig {
        CheckConfig {
            registry_path: self.registry_path.clone(),
            ..CheckConfig::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let mut config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ZoneregExitCode::Failure.into();
        }
    };
    config.apply_cli(&cli);

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ZoneregExitCode::Failure.into();
    }

    // Reports go to stdout, logs to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZoneregExitCode::Failure.into();
    }

    debug!("Registry: {}", config.registry_path.display());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZoneregExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(cli.command, config)).into()
}

/// Run one task and report its failure, if any
async fn run(command: Command, config: Config) -> ZoneregExitCode {
    let plugins = build_plugins();

    let outcome = match command {
        Command::Validate => run_validate(&config).await,
        Command::Check { strict, format } => run_check(&config, &plugins, strict, format).await,
        Command::Sync { .. } => run_sync(&config, &plugins).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            exit_code_for(&e)
        }
    }
}

/// Register the compiled-in provider and resolver plugins
fn build_plugins() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    zonereg_provider_cloudflare::register(&registry);

    #[cfg(feature = "hickory")]
    zonereg_resolver_hickory::register(&registry);

    debug!("Registered providers: {:?}", registry.list_providers());
    registry
}

fn report_error(error: &Error) {
    match error.validation_issues() {
        Some(issues) => {
            eprintln!("Validation failed:");
            for issue in issues {
                eprintln!("{}", issue);
            }
        }
        None => eprintln!("Error: {}", error),
    }
}

async fn run_validate(config: &Config) -> zonereg_core::Result<ZoneregExitCode> {
    validate::validate_file(&config.registry_path, &config.validation_options()).await?;

    println!("{} is valid", display_name(&config.registry_path));
    Ok(ZoneregExitCode::Success)
}

async fn run_check(
    config: &Config,
    plugins: &ProviderRegistry,
    strict: bool,
    format: OutputFormat,
) -> zonereg_core::Result<ZoneregExitCode> {
    let registry =
        validate::validate_file(&config.registry_path, &config.validation_options()).await?;

    let resolver = plugins.create_resolver(&config.resolver_config())?;
    let checker = HealthChecker::new(Arc::from(resolver), config.check_config())?;
    let report = checker.check(&registry).await;

    match format {
        OutputFormat::Text => print!("{}", report.to_markdown()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.all_ok() {
        return Ok(ZoneregExitCode::Success);
    }

    warn!("{} of {} record(s) failed", report.failures(), report.results.len());
    if strict {
        Ok(ZoneregExitCode::Failure)
    } else {
        Ok(ZoneregExitCode::Success)
    }
}

async fn run_sync(config: &Config, plugins: &ProviderRegistry) -> zonereg_core::Result<ZoneregExitCode> {
    // Nothing reaches the provider unless the registry is valid
    let registry =
        validate::validate_file(&config.registry_path, &config.validation_options()).await?;

    let provider = plugins.create_provider(&config.provider_config())?;
    let (engine, mut events) = SyncEngine::new(provider, config.sync_config())?;

    let monitor = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Sync event: {:?}", event);
        }
    });

    let outcome = engine.sync(&registry).await;

    // Dropping the engine closes the channel and ends the monitor
    drop(engine);
    if let Err(e) = monitor.await {
        warn!("Event monitor stopped abnormally: {}", e);
    }

    let report = outcome?;
    info!(
        "{} created, {} updated, {} unchanged{}",
        report.created.len(),
        report.updated.len(),
        report.unchanged.len(),
        if report.dry_run { " (dry-run)" } else { "" }
    );
    if !report.unmanaged.is_empty() {
        warn!(
            "{} record(s) at the provider are not in the registry: {}",
            report.unmanaged.len(),
            report.unmanaged.join(", ")
        );
    }

    Ok(ZoneregExitCode::Success)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn write_registry(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("registry.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.registry_path, PathBuf::from("registry.json"));
        assert_eq!(config.domain, "nicheweb.dev");
        assert!(!config.dry_run);
        assert!(config.nameservers.is_empty());
        assert_eq!(config.log_level(), Level::INFO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_dry_run_mode() {
        let config = config_from(&[("ZONEREG_MODE", "dry-run")]).unwrap();
        assert!(config.dry_run);

        let config = config_from(&[("ZONEREG_MODE", "live")]).unwrap();
        assert!(!config.dry_run);
    }

    #[test]
    fn test_config_nameservers() {
        let config = config_from(&[("ZONEREG_NAMESERVERS", "1.1.1.1, 2606:4700:4700::1111")]).unwrap();
        assert_eq!(config.nameservers.len(), 2);
        assert_eq!(config.resolver_config().nameservers, config.nameservers);

        assert!(config_from(&[("ZONEREG_NAMESERVERS", "1.1.1.1,resolver.local")]).is_err());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let config = config_from(&[("ZONEREG_LOG_LEVEL", "loud")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("ZONEREG_DOMAIN", "localhost")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = config_from(&[("ZONEREG_REGISTRY", "a.json")]).unwrap();
        let cli = Cli::parse_from(["zonereg", "--registry", "b.json", "sync", "--dry-run"]);
        config.apply_cli(&cli);

        assert_eq!(config.registry_path, PathBuf::from("b.json"));
        assert!(config.dry_run);
        assert!(config.sync_config().dry_run);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&Error::Validation(Vec::new())), ZoneregExitCode::Failure);
        assert_eq!(
            exit_code_for(&Error::config("CLOUDFLARE_API_TOKEN not set")),
            ZoneregExitCode::Failure
        );
        assert_eq!(
            exit_code_for(&Error::not_found("registry.json not found.")),
            ZoneregExitCode::Failure
        );
        assert_eq!(
            exit_code_for(&Error::provider("cloudflare", "Cloudflare API error 500: boom")),
            ZoneregExitCode::RuntimeError
        );
    }

    #[tokio::test]
    async fn test_validate_command() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_from(&[]).unwrap();

        config.registry_path = write_registry(
            &dir,
            r#"{ "domain": "nicheweb.dev", "records": [
                { "subdomain": "www", "type": "A", "value": "203.0.113.7", "owner": "alice" }
            ] }"#,
        );
        assert_eq!(run_validate(&config).await.unwrap(), ZoneregExitCode::Success);

        config.registry_path = write_registry(&dir, r#"{ "domain": "nicheweb.dev", "records": [] }"#);
        let err = run_validate(&config).await.unwrap_err();
        assert_eq!(exit_code_for(&err), ZoneregExitCode::Failure);
        assert!(err.validation_issues().is_some());
    }

    #[tokio::test]
    async fn test_sync_without_credentials_is_config_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_from(&[]).unwrap();
        config.registry_path = write_registry(
            &dir,
            r#"{ "domain": "nicheweb.dev", "records": [
                { "subdomain": "www", "type": "A", "value": "203.0.113.7", "owner": "alice" }
            ] }"#,
        );

        let err = run_sync(&config, &build_plugins()).await.unwrap_err();
        assert_eq!(exit_code_for(&err), ZoneregExitCode::Failure);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("zones/registry.json")), "registry.json");
    }
}
