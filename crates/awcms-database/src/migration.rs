//! Embedded schema migrations for the extension and registry tables.

use sqlx::PgPool;
use tracing::info;

use awcms_core::result::AppResult;

use crate::error::map_migrate_error;

/// Apply every pending migration under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let migrator = sqlx::migrate!("../../migrations");
    info!(available = migrator.iter().count(), "Applying extension registry migrations");

    migrator.run(pool).await.map_err(map_migrate_error)?;

    info!("Extension registry schema is up to date");
    Ok(())
}
