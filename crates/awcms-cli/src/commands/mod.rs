//! CLI command definitions and dispatch.

pub mod extension;
pub mod manifest;
pub mod migrate;
pub mod registry;

use clap::{Parser, Subcommand};

use awcms_core::config::AppConfig;
use awcms_core::error::AppError;
use awcms_database::DatabasePool;
use awcms_database::repositories::ExtensionRepository;
use awcms_entity::extension::Extension;

use crate::output::OutputFormat;

/// AWCMS extension administration
#[derive(Debug, Parser)]
#[command(name = "awcms", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Log more; repeat for debug (`-vv`) and trace (`-vvv`)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Installed extensions
    Extension(extension::ExtensionArgs),
    /// External extension manifests
    Manifest(manifest::ManifestArgs),
    /// Route, menu and permission registry
    Registry(registry::RegistryArgs),
}

impl Cli {
    /// Log directive for the `-v` count. `RUST_LOG` still wins when set.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info,sqlx=warn",
            2 => "debug,sqlx=warn",
            _ => "trace",
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Extension(args) => extension::execute(args, &self.config, self.format).await,
            Commands::Manifest(args) => manifest::execute(args, &self.config, self.format).await,
            Commands::Registry(args) => registry::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: look up an extension by slug or fail with not-found
pub async fn find_extension(repo: &ExtensionRepository, slug: &str) -> Result<Extension, AppError> {
    repo.find_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Extension '{slug}' not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_log_level() {
        let quiet = Cli::parse_from(["awcms", "manifest", "path", "extension.json"]);
        assert_eq!(quiet.log_directive(), "warn");

        let loud = Cli::parse_from(["awcms", "-vv", "manifest", "path", "extension.json"]);
        assert_eq!(loud.verbose, 2);
        assert_eq!(loud.log_directive(), "debug,sqlx=warn");
    }
}
