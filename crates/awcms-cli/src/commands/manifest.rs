//! External extension manifest commands. These work offline.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use serde::Serialize;

use awcms_core::error::AppError;
use awcms_plugin::external::{ExtensionManifest, extension_path, is_compatible, validate_manifest};

use crate::output::{self, OutputFormat};

/// Arguments for manifest commands
#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Manifest subcommand
    #[command(subcommand)]
    pub command: ManifestCommand,
}

/// Manifest subcommands
#[derive(Debug, Subcommand)]
pub enum ManifestCommand {
    /// Check required fields and version format
    Validate {
        /// Manifest JSON file
        file: PathBuf,
    },
    /// Print the path the loader would resolve
    Path {
        /// Manifest JSON file
        file: PathBuf,
        /// Override the configured extension base path
        #[arg(long)]
        base_path: Option<String>,
    },
    /// Check the manifest's host version requirement
    Compat {
        /// Manifest JSON file
        file: PathBuf,
        /// Override the configured host version
        #[arg(long)]
        host_version: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct CompatReport<'a> {
    extension: &'a str,
    requirement: Option<&'a str>,
    host_version: &'a str,
    compatible: bool,
}

/// Execute manifest commands
pub async fn execute(
    args: &ManifestArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;

    match &args.command {
        ManifestCommand::Validate { file } => {
            let manifest = read_manifest(file)?;
            let result = validate_manifest(&manifest);
            if format == OutputFormat::Json {
                output::print_item(&result, format);
            } else if result.valid {
                output::print_success(&format!("{} is a valid manifest", file.display()));
            } else {
                for error in &result.errors {
                    output::print_error(error);
                }
            }
            if !result.valid {
                return Err(AppError::validation(format!(
                    "{} error(s) in {}",
                    result.errors.len(),
                    file.display()
                )));
            }
        }
        ManifestCommand::Path { file, base_path } => {
            let manifest = read_manifest(file)?;
            let base = base_path.as_deref().unwrap_or(&config.extensions.base_path);
            let path = manifest
                .external_path
                .clone()
                .unwrap_or_else(|| extension_path(&manifest, base));
            println!("{path}");
        }
        ManifestCommand::Compat { file, host_version } => {
            let manifest = read_manifest(file)?;
            let host = host_version.as_deref().unwrap_or(&config.extensions.host_version);
            let report = CompatReport {
                extension: &manifest.slug,
                requirement: manifest.awcms_version.as_deref(),
                host_version: host,
                compatible: is_compatible(&manifest, host),
            };
            output::print_item(&report, format);
        }
    }

    Ok(())
}

fn read_manifest(file: &Path) -> Result<ExtensionManifest, AppError> {
    let source = std::fs::read_to_string(file)?;
    Ok(ExtensionManifest::from_json(&source)?)
}
