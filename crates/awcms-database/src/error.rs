//! Mapping of sqlx errors onto [`AppError`] kinds.

use awcms_core::error::{AppError, ErrorKind};
use sqlx::migrate::MigrateError;

/// Postgres SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Map a sqlx error into an [`AppError`] with a meaningful kind.
///
/// Unique violations become [`ErrorKind::Conflict`]; I/O failures and pool
/// exhaustion become [`ErrorKind::ServiceUnavailable`]; everything else is
/// [`ErrorKind::Database`].
pub fn map_sqlx_error(context: &str, err: sqlx::Error) -> AppError {
    let kind = classify(&err);
    AppError::with_source(kind, format!("{context}: {err}"), err)
}

/// Map a migration failure. Statement failures go through [`map_sqlx_error`];
/// history problems (missing, mismatched or dirty versions) are
/// [`ErrorKind::Database`].
pub fn map_migrate_error(err: MigrateError) -> AppError {
    match err {
        MigrateError::Execute(e) => map_sqlx_error("Failed to run migrations", e),
        MigrateError::ExecuteMigration(e, version) => {
            map_sqlx_error(&format!("Migration {version} failed"), e)
        }
        other => AppError::with_source(
            ErrorKind::Database,
            format!("Migration history is inconsistent: {other}"),
            other,
        ),
    }
}

fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            ErrorKind::Conflict
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ErrorKind::ServiceUnavailable,
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        _ => ErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err = map_sqlx_error("Failed to sync routes", sqlx::Error::PoolTimedOut);
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_row_not_found() {
        let err = map_sqlx_error("Failed to find extension", sqlx::Error::RowNotFound);
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_io_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = map_sqlx_error("Failed to connect", sqlx::Error::Io(io));
        assert!(err.is_unavailable());
        assert!(err.message.starts_with("Failed to connect"));
    }

    #[test]
    fn test_migration_statement_failure_keeps_kind() {
        let err = map_migrate_error(MigrateError::ExecuteMigration(sqlx::Error::PoolTimedOut, 20250101000000));
        assert!(err.is_unavailable());
        assert!(err.message.starts_with("Migration 20250101000000 failed"));

        let err = map_migrate_error(MigrateError::VersionMissing(7));
        assert_eq!(err.kind, ErrorKind::Database);
    }
}
