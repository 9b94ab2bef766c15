//! Route, menu and permission registry commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use awcms_core::error::AppError;
use awcms_database::repositories::{ExtensionRepository, RegistryRepository};
use awcms_entity::extension::ExtensionConfig;
use awcms_plugin::lifecycle::{LifecycleSync, MemoryRegistryStore, RegistryStore};

use crate::output::{self, OutputFormat};

/// Arguments for registry commands
#[derive(Debug, Args)]
pub struct RegistryArgs {
    /// Registry subcommand
    #[command(subcommand)]
    pub command: RegistryCommand,
}

/// Registry subcommands
#[derive(Debug, Subcommand)]
pub enum RegistryCommand {
    /// Project an extension's declared routes, menus and permissions
    Sync {
        /// Extension slug
        slug: String,
        /// Declared configuration JSON file
        #[arg(short, long)]
        file: PathBuf,
        /// Print the rows that would be written without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Show an extension's registry rows
    Show {
        /// Extension slug
        slug: String,
    },
}

/// Registry display row for table output
#[derive(Debug, Serialize, Tabled)]
struct RegistryRow {
    /// Route, menu or permission
    kind: String,
    /// Path or permission name
    target: String,
    /// Label, component or description
    detail: String,
    /// Sort order or auth requirement
    extra: String,
    /// Active flag
    active: String,
}

/// Execute registry commands
pub async fn execute(
    args: &RegistryArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        RegistryCommand::Sync {
            slug,
            file,
            dry_run: true,
        } => {
            let declared = read_config(file)?;
            let store = Arc::new(MemoryRegistryStore::new());
            let id = uuid::Uuid::nil();
            let report = LifecycleSync::new(store.clone())
                .sync_extension_to_registry(id, Some(&declared))
                .await?;

            println!("Dry run for '{slug}':");
            let mut rows = Vec::new();
            for route in store.routes(id).await {
                rows.push(RegistryRow {
                    kind: "route".into(),
                    target: route.path,
                    detail: route.component_key.unwrap_or_default(),
                    extra: format!("auth={}", route.requires_auth),
                    active: route.is_active.to_string(),
                });
            }
            for menu in store.menus(id).await {
                rows.push(RegistryRow {
                    kind: "menu".into(),
                    target: menu.path,
                    detail: menu.label,
                    extra: format!("order={}", menu.sort_order),
                    active: menu.is_active.to_string(),
                });
            }
            for permission in store.core_permissions().await {
                rows.push(RegistryRow {
                    kind: "permission".into(),
                    target: permission.name,
                    detail: format!("{}/{}", permission.resource, permission.action),
                    extra: "-".into(),
                    active: "-".into(),
                });
            }
            output::print_list(&rows, format);
            for failure in &report.failures {
                output::print_warning(&failure.to_string());
            }
        }
        RegistryCommand::Sync { slug, file, .. } => {
            let declared = read_config(file)?;
            let config = super::load_config(config_path)?;
            let pool = super::create_db_pool(&config).await?;
            let ext = super::find_extension(&ExtensionRepository::new(pool.pool().clone()), slug).await?;

            let store: Arc<dyn RegistryStore> = Arc::new(RegistryRepository::new(pool.pool().clone()));
            let report = LifecycleSync::new(store)
                .sync_extension_to_registry(ext.id, Some(&declared))
                .await?;

            output::print_kv("Routes", &count(report.routes));
            output::print_kv("Menus", &count(report.menus));
            output::print_kv("Permissions", &count(report.permissions));
            for failure in &report.failures {
                output::print_warning(&failure.to_string());
            }
            if report.is_clean() {
                output::print_success(&format!("Registry synced for '{slug}'"));
            }
        }
        RegistryCommand::Show { slug } => {
            let config = super::load_config(config_path)?;
            let pool = super::create_db_pool(&config).await?;
            let ext = super::find_extension(&ExtensionRepository::new(pool.pool().clone()), slug).await?;
            let repo = RegistryRepository::new(pool.pool().clone());

            let mut rows = Vec::new();
            for route in repo.find_routes(ext.id).await? {
                rows.push(RegistryRow {
                    kind: "route".into(),
                    target: route.path,
                    detail: route.component_key.unwrap_or_default(),
                    extra: format!("auth={}", route.requires_auth),
                    active: route.is_active.to_string(),
                });
            }
            for menu in repo.find_menus(ext.id).await? {
                rows.push(RegistryRow {
                    kind: "menu".into(),
                    target: menu.path,
                    detail: menu.label,
                    extra: format!("order={}", menu.sort_order),
                    active: menu.is_active.to_string(),
                });
            }
            for permission in repo.find_permissions(ext.id).await? {
                rows.push(RegistryRow {
                    kind: "permission".into(),
                    target: permission.permission_name,
                    detail: permission.description.unwrap_or_default(),
                    extra: "-".into(),
                    active: "-".into(),
                });
            }
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

fn read_config(file: &Path) -> Result<ExtensionConfig, AppError> {
    let source = std::fs::read_to_string(file)?;
    Ok(serde_json::from_str(&source)?)
}

fn count(value: Option<usize>) -> String {
    value.map(|n| n.to_string()).unwrap_or_else(|| "skipped".to_string())
}
