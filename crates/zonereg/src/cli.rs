//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "zonereg")]
#[command(about = "Validate, check and sync a declarative DNS record registry", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Registry file (overrides ZONEREG_REGISTRY)
    #[arg(short, long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate the registry file
    Validate,
    /// Check that declared records are healthy
    Check {
        /// Exit with status 1 if any record fails
        #[arg(long)]
        strict: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Push declared records to Cloudflare
    Sync {
        /// Log intended changes without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown summary
    Text,
    /// JSON report
    Json,
}
