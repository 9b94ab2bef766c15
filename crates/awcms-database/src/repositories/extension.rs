//! Extension repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use awcms_core::result::AppResult;
use awcms_entity::extension::Extension;

use crate::error::map_sqlx_error;

/// Repository for the `extensions` table.
#[derive(Debug, Clone)]
pub struct ExtensionRepository {
    pool: PgPool,
}

impl ExtensionRepository {
    /// Create a new extension repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find all active, non-deleted extensions ordered by name.
    pub async fn find_active(&self) -> AppResult<Vec<Extension>> {
        sqlx::query_as::<_, Extension>(
            "SELECT * FROM extensions WHERE is_active = TRUE AND deleted_at IS NULL \
             ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to load active extensions", e))
    }

    /// Find all non-deleted extensions.
    pub async fn find_all(&self) -> AppResult<Vec<Extension>> {
        sqlx::query_as::<_, Extension>(
            "SELECT * FROM extensions WHERE deleted_at IS NULL ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list extensions", e))
    }

    /// Find an extension by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Extension>> {
        sqlx::query_as::<_, Extension>("SELECT * FROM extensions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find extension", e))
    }

    /// Find a non-deleted extension by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Extension>> {
        sqlx::query_as::<_, Extension>(
            "SELECT * FROM extensions WHERE slug = $1 AND deleted_at IS NULL",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find extension by slug", e))
    }

    /// Toggle the `is_active` flag. Returns `true` if a row was updated.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE extensions SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update extension", e))?;

        Ok(result.rows_affected() > 0)
    }
}
