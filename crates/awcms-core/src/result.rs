//! Convenience result type alias for AWCMS.

use crate::error::AppError;

/// A specialized `Result` type for AWCMS operations.
pub type AppResult<T> = Result<T, AppError>;
