//! AWCMS extension host.
//!
//! Wires the bundled plugins, the external loader and the extension rows
//! into a booted plugin context, then waits for shutdown.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt};

use awcms_core::config::AppConfig;
use awcms_core::error::AppError;
use awcms_database::DatabasePool;
use awcms_database::repositories::ExtensionRepository;
use awcms_plugin::context::{PluginContext, PluginSlot};
use awcms_plugin::external::{ExternalExtensionLoader, ModuleResolver};
use awcms_plugin::hooks::names;
use awcms_plugin::{HostServices, PluginRegistry};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay and `AWCMS__*` variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("AWCMS_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting AWCMS host v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db_pool = DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    awcms_database::migration::run_migrations(db_pool.pool()).await?;

    // ── Step 2: Bundled plugin registry ──────────────────────────
    let registry = PluginRegistry::new()
        .with_plugin(plugin_backup::SLUG, plugin_backup::module()?)
        .with_plugin(plugin_helloworld::SLUG, plugin_helloworld::module());
    tracing::info!(plugins = ?registry.slugs(), "Bundled plugins registered");

    // ── Step 3: External extension loader ────────────────────────
    let loader = ExternalExtensionLoader::new(
        config.extensions.base_path.clone(),
        module_resolver(&config),
    );

    // ── Step 4: Plugin context ───────────────────────────────────
    let source = Arc::new(ExtensionRepository::new(db_pool.pool().clone()));
    let context = PluginContext::new(
        Arc::new(registry),
        Arc::new(loader),
        source,
        config.extensions.host_version.clone(),
    )
    .with_services(HostServices::new().with_database(db_pool.clone()));

    if config.extensions.auto_boot {
        let summary = context.boot().await;
        tracing::info!(
            core = summary.core,
            external = summary.external,
            total = summary.total,
            "Plugin context booted"
        );
        for failure in context.failures().await {
            tracing::warn!(
                slug = %failure.slug,
                stage = ?failure.stage,
                "Extension failed: {}",
                failure.message
            );
        }

        let menu = context.apply_filters(names::ADMIN_MENU_ITEMS, Value::Array(Vec::new()), &[]);
        let routes = context.apply_filters(names::ADMIN_ROUTES, Value::Array(Vec::new()), &[]);
        tracing::info!(menu = %menu, routes = %routes, "Admin surface assembled");

        let widgets = PluginSlot::new(names::DASHBOARD_WIDGETS)
            .with_props(json!({ "name": "AWCMS" }))
            .render(&context);
        tracing::debug!(html = %widgets, "Dashboard widgets rendered");
    } else {
        tracing::info!("Auto boot disabled");
    }

    tracing::info!("AWCMS host ready");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Signal handler failed: {e}")))?;

    tracing::info!("Shutting down...");
    db_pool.close().await;
    Ok(())
}

#[cfg(feature = "dynamic")]
fn module_resolver(config: &AppConfig) -> Arc<dyn ModuleResolver> {
    Arc::new(awcms_plugin::external::NativeModuleResolver::new(
        config.extensions.base_path.clone(),
        config.extensions.native_root.clone(),
    ))
}

#[cfg(not(feature = "dynamic"))]
fn module_resolver(_config: &AppConfig) -> Arc<dyn ModuleResolver> {
    Arc::new(awcms_plugin::external::StaticModuleResolver::new())
}
