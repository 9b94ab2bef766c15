//! Where the context reads the active extension rows from.

use async_trait::async_trait;

use awcms_core::error::AppError;
use awcms_core::result::AppResult;
use awcms_database::repositories::ExtensionRepository;
use awcms_entity::extension::Extension;

/// Source of active, non-deleted extension rows.
#[async_trait]
pub trait ExtensionSource: Send + Sync {
    /// Active rows not soft-deleted.
    async fn active_extensions(&self) -> AppResult<Vec<Extension>>;
}

#[async_trait]
impl ExtensionSource for ExtensionRepository {
    async fn active_extensions(&self) -> AppResult<Vec<Extension>> {
        self.find_active().await
    }
}

/// Fixed set of rows, for tests and database-less hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryExtensionSource {
    rows: Vec<Extension>,
    failure: Option<AppError>,
}

impl MemoryExtensionSource {
    /// Source returning the live subset of `rows`.
    pub fn new(rows: Vec<Extension>) -> Self {
        Self {
            rows,
            failure: None,
        }
    }

    /// Source whose fetch always fails with `error`.
    pub fn failing(error: AppError) -> Self {
        Self {
            rows: Vec::new(),
            failure: Some(error),
        }
    }
}

#[async_trait]
impl ExtensionSource for MemoryExtensionSource {
    async fn active_extensions(&self) -> AppResult<Vec<Extension>> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.rows.iter().filter(|r| r.is_live()).cloned().collect())
    }
}
