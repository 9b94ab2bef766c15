//! Installed extension commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use awcms_core::error::AppError;
use awcms_database::repositories::{ExtensionRepository, RegistryRepository};
use awcms_entity::extension::Extension;
use awcms_plugin::lifecycle::LifecycleSync;

use crate::output::{self, OutputFormat};

/// Arguments for extension commands
#[derive(Debug, Args)]
pub struct ExtensionArgs {
    /// Extension subcommand
    #[command(subcommand)]
    pub command: ExtensionCommand,
}

/// Extension subcommands
#[derive(Debug, Subcommand)]
pub enum ExtensionCommand {
    /// List extensions
    List {
        /// Include inactive and deleted extensions
        #[arg(short, long)]
        all: bool,
    },
    /// Show one extension
    Show {
        /// Extension slug
        slug: String,
    },
    /// Enable an extension and its registry rows
    Enable {
        /// Extension slug
        slug: String,
    },
    /// Disable an extension and its registry rows
    Disable {
        /// Extension slug
        slug: String,
    },
}

/// Extension display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ExtensionRow {
    /// Slug
    slug: String,
    /// Name
    name: String,
    /// Core or external
    #[tabled(rename = "type")]
    extension_type: String,
    /// Version
    version: String,
    /// Component key
    component: String,
    /// Status
    status: String,
}

impl From<&Extension> for ExtensionRow {
    fn from(ext: &Extension) -> Self {
        let status = if ext.deleted_at.is_some() {
            "deleted"
        } else if ext.is_active {
            "active"
        } else {
            "inactive"
        };
        Self {
            slug: ext.slug.clone(),
            name: ext.name.clone(),
            extension_type: ext.extension_type.to_string(),
            version: ext.version.clone().unwrap_or_else(|| "-".to_string()),
            component: ext.component_key.clone().unwrap_or_else(|| "-".to_string()),
            status: status.to_string(),
        }
    }
}

/// Execute extension commands
pub async fn execute(
    args: &ExtensionArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let repo = ExtensionRepository::new(pool.pool().clone());

    match &args.command {
        ExtensionCommand::List { all } => {
            let extensions = if *all {
                repo.find_all().await?
            } else {
                repo.find_active().await?
            };
            let rows: Vec<ExtensionRow> = extensions.iter().map(ExtensionRow::from).collect();
            output::print_list(&rows, format);
        }
        ExtensionCommand::Show { slug } => {
            let ext = super::find_extension(&repo, slug).await?;
            output::print_item(&ext, format);
        }
        ExtensionCommand::Enable { slug } | ExtensionCommand::Disable { slug } => {
            let enable = matches!(args.command, ExtensionCommand::Enable { .. });
            let ext = super::find_extension(&repo, slug).await?;

            repo.set_active(ext.id, enable).await?;
            tracing::debug!(extension_id = %ext.id, enable, "Extension flag updated");

            let sync = LifecycleSync::new(Arc::new(RegistryRepository::new(pool.pool().clone())));
            if enable {
                sync.activate_extension_registry(ext.id).await?;
                output::print_success(&format!("Extension '{slug}' enabled"));
            } else {
                sync.deactivate_extension_registry(ext.id).await?;
                output::print_success(&format!("Extension '{slug}' disabled"));
                output::print_warning("Registered permissions are kept");
            }
        }
    }

    Ok(())
}
