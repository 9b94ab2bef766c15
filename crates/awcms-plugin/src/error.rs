//! Extension framework errors.

use awcms_core::error::{AppError, ErrorKind};
use thiserror::Error;

use crate::lifecycle::SyncStep;

/// Errors raised while loading, registering or syncing extensions.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// The manifest failed validation.
    #[error("Invalid manifest: {}", errors.join(", "))]
    InvalidManifest {
        /// Every validation message.
        errors: Vec<String>,
    },

    /// The computed load path escapes the extension root.
    #[error("Extension path '{path}' is outside the extension root")]
    PathRejected {
        /// The offending path.
        path: String,
    },

    /// No module is available at the load path.
    #[error("No extension module found at '{path}'")]
    ModuleNotFound {
        /// The load path.
        path: String,
    },

    /// The module exposes neither a default component nor a register function.
    #[error("Extension '{name}' must export a default component or register function")]
    MissingCapability {
        /// Extension name.
        name: String,
    },

    /// The extension requires a newer host.
    #[error("Extension '{name}' requires AWCMS {required}, host is {host}")]
    Incompatible {
        /// Extension name.
        name: String,
        /// Declared requirement.
        required: String,
        /// Running host version.
        host: String,
    },

    /// Loading the module failed.
    #[error("Failed to load extension '{name}': {message}")]
    Load {
        /// Extension name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// A plugin's register function failed.
    #[error("Plugin '{slug}' failed to register: {message}")]
    Register {
        /// Plugin slug.
        slug: String,
        /// Failure description.
        message: String,
    },

    /// A hook callback failed or panicked.
    #[error("Callback '{namespace}' on hook '{hook}' failed: {message}")]
    Callback {
        /// Hook name.
        hook: String,
        /// Callback namespace.
        namespace: String,
        /// Failure description.
        message: String,
    },

    /// A registry sync step failed.
    #[error("Registry sync step '{step}' failed: {source}")]
    Sync {
        /// The step that failed.
        step: SyncStep,
        /// Underlying store error.
        #[source]
        source: AppError,
    },

    /// A store or source operation failed.
    #[error(transparent)]
    Store(#[from] AppError),

    /// Free-form failure raised by plugin code.
    #[error("{0}")]
    Other(String),
}

impl ExtensionError {
    /// Free-form error for plugin callbacks.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether the error means the backend is unreachable.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Sync { source, .. } | Self::Store(source) => source.is_unavailable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ExtensionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(AppError::from(err))
    }
}

impl From<ExtensionError> for AppError {
    fn from(err: ExtensionError) -> Self {
        match err {
            ExtensionError::Store(inner) => inner,
            ExtensionError::Sync { step, source } => AppError::with_source(
                source.kind,
                format!("Registry sync step '{step}' failed"),
                source,
            ),
            ExtensionError::InvalidManifest { .. } | ExtensionError::Incompatible { .. } => {
                AppError::validation(err.to_string())
            }
            ExtensionError::ModuleNotFound { .. } => AppError::not_found(err.to_string()),
            other => AppError::new(ErrorKind::Plugin, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_manifest_lists_all_errors() {
        let err = ExtensionError::InvalidManifest {
            errors: vec!["Missing required field: name".into(), "Missing required field: slug".into()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid manifest: Missing required field: name, Missing required field: slug"
        );
    }

    #[test]
    fn test_into_app_error_keeps_kind() {
        let err = ExtensionError::Sync {
            step: SyncStep::Routes,
            source: AppError::service_unavailable("connection refused"),
        };
        assert!(err.is_unavailable());
        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::ServiceUnavailable);

        let app: AppError = ExtensionError::msg("boom").into();
        assert_eq!(app.kind, ErrorKind::Plugin);
    }
}
