//! External extension manifests.

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::warn;

use awcms_entity::extension::Extension;

use crate::error::ExtensionError;

/// Entry file used when a manifest names none.
pub const DEFAULT_ENTRY: &str = "dist/index.js";

/// Entry recorded for rows without a stored manifest.
pub const ROW_FALLBACK_ENTRY: &str = "src/index.js";

/// Directory prefix of every external extension package.
pub const PACKAGE_PREFIX: &str = "awcms-ext-";

/// Metadata describing an external extension package.
///
/// Required fields default to empty so partial manifests can still be
/// parsed and reported on by [`validate_manifest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Package slug.
    #[serde(default)]
    pub slug: String,
    /// Publisher.
    #[serde(default)]
    pub vendor: String,
    /// Semantic version `x.y.z`.
    #[serde(default)]
    pub version: String,
    /// Entry file inside the package.
    #[serde(default)]
    pub entry: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Host version requirement, `>=x.y.z` or an exact version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awcms_version: Option<String>,
    /// Absolute override of the computed load path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_path: Option<String>,
}

impl ExtensionManifest {
    /// Creates a manifest from the required fields.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        vendor: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            vendor: vendor.into(),
            version: version.into(),
            entry: DEFAULT_ENTRY.to_string(),
            ..Self::default()
        }
    }

    /// Set the entry file.
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Set the host version requirement.
    pub fn with_awcms_version(mut self, requirement: impl Into<String>) -> Self {
        self.awcms_version = Some(requirement.into());
        self
    }

    /// Parses a manifest from JSON text.
    pub fn from_json(source: &str) -> Result<Self, ExtensionError> {
        serde_json::from_str(source).map_err(|e| ExtensionError::InvalidManifest {
            errors: vec![e.to_string()],
        })
    }

    /// Builds the manifest for an external extension row.
    ///
    /// A stored manifest wins. Otherwise the manifest is derived from the
    /// row: the vendor is the slug up to its first `-`, the version falls
    /// back to `1.0.0` and `external_path` is carried as the load path
    /// override.
    pub fn for_row(row: &Extension) -> Result<Self, ExtensionError> {
        if let Some(stored) = &row.manifest {
            let mut manifest: Self = serde_json::from_value(stored.clone()).map_err(|e| {
                ExtensionError::InvalidManifest {
                    errors: vec![e.to_string()],
                }
            })?;
            if manifest.external_path.is_none() {
                manifest.external_path = row.external_path.clone();
            }
            return Ok(manifest);
        }

        let vendor = row
            .slug
            .split('-')
            .next()
            .filter(|v| !v.is_empty())
            .unwrap_or("unknown");

        Ok(Self {
            name: row.name.clone(),
            slug: row.slug.clone(),
            vendor: vendor.to_string(),
            version: row.version.clone().unwrap_or_else(|| "1.0.0".to_string()),
            entry: ROW_FALLBACK_ENTRY.to_string(),
            description: row.description.clone(),
            awcms_version: None,
            external_path: row.external_path.clone(),
        })
    }
}

/// Outcome of [`validate_manifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestValidation {
    /// Whether no error was found.
    pub valid: bool,
    /// Every problem found, in field order.
    pub errors: Vec<String>,
}

impl ManifestValidation {
    /// Converts a failed validation into an error.
    pub fn into_result(self) -> Result<(), ExtensionError> {
        if self.valid {
            Ok(())
        } else {
            Err(ExtensionError::InvalidManifest {
                errors: self.errors,
            })
        }
    }
}

/// Checks the required fields and the version format. Reports every problem.
pub fn validate_manifest(manifest: &ExtensionManifest) -> ManifestValidation {
    let mut errors = Vec::new();

    let required = [
        ("name", &manifest.name),
        ("slug", &manifest.slug),
        ("vendor", &manifest.vendor),
        ("version", &manifest.version),
        ("entry", &manifest.entry),
    ];
    for (field, value) in required {
        if value.is_empty() {
            errors.push(format!("Missing required field: {field}"));
        }
    }

    if !manifest.version.is_empty() && !version_shaped(&manifest.version) {
        errors.push("Invalid version format (expected semver: x.y.z)".to_string());
    }

    ManifestValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Whether `version` starts with `major.minor.patch` digits. Anything after
/// the patch digits (pre-release, build metadata) is accepted.
fn version_shaped(version: &str) -> bool {
    let mut parts = version.splitn(3, '.');
    let numeric = |part: Option<&str>| {
        part.is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    };
    numeric(parts.next())
        && numeric(parts.next())
        && parts.next().is_some_and(|patch| patch.starts_with(|c: char| c.is_ascii_digit()))
}

/// Cache key of an extension: `vendor-slug`.
pub fn cache_key(vendor: &str, slug: &str) -> String {
    format!("{vendor}-{slug}")
}

/// Computes the load path `<base>/awcms-ext-<vendor>-<slug>/<entry>`.
///
/// An empty entry falls back to `dist/index.js`.
pub fn extension_path(manifest: &ExtensionManifest, base_path: &str) -> String {
    let entry = if manifest.entry.is_empty() {
        DEFAULT_ENTRY
    } else {
        manifest.entry.trim_start_matches('/')
    };
    format!(
        "{}/{PACKAGE_PREFIX}{}-{}/{entry}",
        base_path.trim_end_matches('/'),
        manifest.vendor,
        manifest.slug
    )
}

/// Whether the extension accepts the running host version.
///
/// No requirement means compatible. `>=x.y.z` compares major, minor and
/// patch numerically. Any other requirement must equal the host version
/// exactly. Unparseable versions under `>=` are treated as incompatible.
pub fn is_compatible(manifest: &ExtensionManifest, host_version: &str) -> bool {
    let Some(requirement) = manifest
        .awcms_version
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
    else {
        return true;
    };

    match requirement.strip_prefix(">=") {
        Some(minimum) => match (parse_triple(minimum), parse_triple(host_version)) {
            (Some(minimum), Some(host)) => host >= minimum,
            _ => {
                warn!(
                    extension = %manifest.slug,
                    requirement,
                    host_version,
                    "Unparseable version in compatibility check"
                );
                false
            }
        },
        None => requirement == host_version.trim(),
    }
}

fn parse_triple(version: &str) -> Option<(u64, u64, u64)> {
    Version::parse(version.trim())
        .ok()
        .map(|v| (v.major, v.minor, v.patch))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_manifest_reports_every_field() {
        let result = validate_manifest(&ExtensionManifest::default());
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                "Missing required field: name",
                "Missing required field: slug",
                "Missing required field: vendor",
                "Missing required field: version",
                "Missing required field: entry",
            ]
        );
    }

    #[test]
    fn test_bad_version_format() {
        let manifest = ExtensionManifest::new("A", "a", "acme", "1.0");
        let result = validate_manifest(&manifest);
        assert_eq!(result.errors, vec!["Invalid version format (expected semver: x.y.z)"]);

        let manifest = ExtensionManifest::new("A", "a", "acme", "1.2.3-beta.1");
        assert!(validate_manifest(&manifest).valid);
    }

    #[test]
    fn test_version_prefix_shapes() {
        assert!(version_shaped("10.20.30"));
        assert!(version_shaped("0.0.1+build.7"));
        assert!(!version_shaped("1.2.x"));
        assert!(!version_shaped("v1.2.3"));
        assert!(!version_shaped("1..3"));
        assert!(!version_shaped("1.2."));
    }

    #[test]
    fn test_extension_path() {
        let manifest = ExtensionManifest::new("Hello", "hello", "acme", "1.0.0");
        assert_eq!(extension_path(&manifest, "/ext"), "/ext/awcms-ext-acme-hello/dist/index.js");

        let manifest = manifest.with_entry("lib/main.js");
        assert_eq!(extension_path(&manifest, "/ext/"), "/ext/awcms-ext-acme-hello/lib/main.js");

        let mut manifest = ExtensionManifest::new("Hello", "hello", "acme", "1.0.0");
        manifest.entry.clear();
        assert_eq!(extension_path(&manifest, "/ext"), "/ext/awcms-ext-acme-hello/dist/index.js");
    }

    #[test]
    fn test_compatibility() {
        let base = ExtensionManifest::new("A", "a", "acme", "1.0.0");
        assert!(is_compatible(&base, "2.4.2"));

        let min = base.clone().with_awcms_version(">=2.0.0");
        assert!(is_compatible(&min, "2.0.0"));
        assert!(is_compatible(&min, "2.4.2"));
        assert!(!is_compatible(&min, "1.9.9"));
        assert!(is_compatible(&base.clone().with_awcms_version(">=2.10.0"), "2.10.1"));
        assert!(!is_compatible(&base.clone().with_awcms_version(">=2.10.0"), "2.9.99"));

        let exact = base.clone().with_awcms_version("2.4.2");
        assert!(is_compatible(&exact, "2.4.2"));
        assert!(!is_compatible(&exact, "2.4.3"));

        assert!(!is_compatible(&base.with_awcms_version(">=two"), "2.4.2"));
    }

    #[test]
    fn test_for_row_derives_manifest() {
        let mut row = Extension::new_external("Gallery", "acme-gallery");
        row.external_path = Some("/cdn/gallery.js".into());
        let manifest = ExtensionManifest::for_row(&row).unwrap();
        assert_eq!(manifest.vendor, "acme");
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.entry, ROW_FALLBACK_ENTRY);
        assert_eq!(manifest.external_path.as_deref(), Some("/cdn/gallery.js"));

        let row = Extension::new_external("Gallery", "gallery").with_manifest(json!({
            "name": "Gallery", "slug": "gallery", "vendor": "acme",
            "version": "3.1.0", "entry": "index.js", "awcms_version": ">=2.0.0"
        }));
        let manifest = ExtensionManifest::for_row(&row).unwrap();
        assert_eq!(manifest.version, "3.1.0");
        assert_eq!(manifest.awcms_version.as_deref(), Some(">=2.0.0"));
    }
}
