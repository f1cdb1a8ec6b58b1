//! App manifests and their dependency records.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{AppId, Version};

/// Errors that can occur when parsing or validating a [`Manifest`].
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The descriptor is not valid JSON or does not match the schema.
    #[error("Invalid manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field (pid or version) is empty.
    #[error("Empty field: {0}")]
    EmptyField(&'static str),
}

/// The three namespaces a dependency can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// A native OS package.
    System,
    /// A language-runtime package.
    Runtime,
    /// Another hostapp application.
    App,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::Runtime => "runtime",
            Self::App => "app",
        })
    }
}

/// A single dependency declared by an app.
///
/// Each variant only carries the fields meaningful for its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Dependency {
    /// Native package, installed through the system package manager.
    System {
        /// Package name in the native package namespace.
        package: String,
        /// Executable whose presence on `PATH` proves the package is usable.
        #[serde(
            default,
            deserialize_with = "empty_as_none",
            skip_serializing_if = "Option::is_none"
        )]
        binary: Option<String>,
        /// Service to stop and disable when the package is removed.
        #[serde(
            default,
            deserialize_with = "empty_as_none",
            skip_serializing_if = "Option::is_none"
        )]
        daemon: Option<String>,
        /// Installing this package only takes effect after a host restart.
        #[serde(default, deserialize_with = "null_as_false", skip_serializing_if = "is_false")]
        internal: bool,
    },
    /// Runtime package, installed through the runtime package manager.
    #[serde(alias = "python")]
    Runtime {
        /// Package name in the runtime package namespace.
        package: String,
        /// Importable module name used to probe the package.
        #[serde(
            default,
            deserialize_with = "empty_as_none",
            skip_serializing_if = "Option::is_none"
        )]
        module: Option<String>,
        /// Installing this package only takes effect after a host restart.
        #[serde(default, deserialize_with = "null_as_false", skip_serializing_if = "is_false")]
        internal: bool,
    },
    /// Sibling application, referenced by pid.
    App {
        /// The pid of the required app.
        package: AppId,
    },
}

impl Dependency {
    /// Namespace of this dependency.
    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::System { .. } => DependencyKind::System,
            Self::Runtime { .. } => DependencyKind::Runtime,
            Self::App { .. } => DependencyKind::App,
        }
    }

    /// Package name (or app pid) this dependency points at.
    pub fn package(&self) -> &str {
        match self {
            Self::System { package, .. } | Self::Runtime { package, .. } => package,
            Self::App { package } => package.as_str(),
        }
    }

    /// Whether satisfying this dependency requires a host restart.
    pub fn is_internal(&self) -> bool {
        match self {
            Self::System { internal, .. } | Self::Runtime { internal, .. } => *internal,
            Self::App { .. } => false,
        }
    }
}

/// Descriptor of an installable app, loaded from a bundle's `manifest.json`
/// or from the remote catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Unique, stable identifier.
    pub pid: AppId,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Version string, compared only for equality.
    pub version: Version,
    /// Declared dependencies, in manifest order.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Any other descriptor fields, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    /// Create a manifest with no dependencies and no extra fields.
    pub fn new(pid: impl Into<AppId>, version: impl Into<Version>) -> Self {
        let pid = pid.into();
        Self {
            name: pid.to_string(),
            pid,
            version: version.into(),
            dependencies: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Builder-style helper appending a dependency.
    pub fn with_dependency(mut self, dep: Dependency) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// Parses and validates a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] for malformed descriptors and
    /// [`ManifestError::EmptyField`] when `pid` or `version` is blank.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Converts a JSON value (as held by storage) back into a manifest.
    ///
    /// # Errors
    ///
    /// Same as [`Manifest::from_json`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_value(value)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serializes the manifest into a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        // Serializing plain data with string keys cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Checks the required identity fields.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EmptyField`] when `pid` or `version` is blank.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.pid.trim().is_empty() {
            return Err(ManifestError::EmptyField("pid"));
        }
        if self.version.trim().is_empty() {
            return Err(ManifestError::EmptyField("version"));
        }
        Ok(())
    }

    /// Pids of the apps this manifest depends on.
    pub fn app_dependencies(&self) -> impl Iterator<Item = &AppId> {
        self.dependencies.iter().filter_map(|d| match d {
            Dependency::App { package } => Some(package),
            _ => None,
        })
    }

    /// Whether this manifest declares an app-type dependency on `id`.
    pub fn depends_on_app(&self, id: &str) -> bool {
        self.app_dependencies().any(|p| p == id)
    }

    /// Whether this manifest declares `package` as a system dependency.
    pub fn needs_system_package(&self, package: &str) -> bool {
        self.dependencies
            .iter()
            .any(|d| matches!(d, Dependency::System { package: p, .. } if p == package))
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn null_as_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or(false))
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if passes a reference
fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEXTCLOUD: &str = r#"{
        "pid": "nextcloud",
        "name": "Nextcloud",
        "version": "9.0.1-1",
        "type": "website",
        "categories": ["files", "sync"],
        "dependencies": [
            {"type": "system", "package": "php", "binary": "php", "daemon": null},
            {"type": "system", "package": "mariadb", "binary": "", "daemon": "mysqld", "internal": true},
            {"type": "python", "package": "pymysql", "module": "pymysql"},
            {"type": "app", "package": "databases"}
        ]
    }"#;

    #[test]
    fn test_parse_all_dependency_kinds() {
        let m = Manifest::from_json(NEXTCLOUD).unwrap();
        assert_eq!(m.pid, "nextcloud");
        assert_eq!(m.dependencies.len(), 4);

        assert_eq!(
            m.dependencies[0],
            Dependency::System {
                package: "php".into(),
                binary: Some("php".into()),
                daemon: None,
                internal: false,
            }
        );
        // Empty strings count as absent
        assert_eq!(
            m.dependencies[1],
            Dependency::System {
                package: "mariadb".into(),
                binary: None,
                daemon: Some("mysqld".into()),
                internal: true,
            }
        );
        assert_eq!(m.dependencies[2].kind(), DependencyKind::Runtime);
        assert_eq!(m.dependencies[3].package(), "databases");
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let m = Manifest::from_json(NEXTCLOUD).unwrap();
        assert_eq!(m.extra["type"], "website");

        let back = Manifest::from_value(m.to_value()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_stale_verify_annotations_are_ignored() {
        let json = r#"{"pid": "a", "version": "1", "dependencies": [
            {"type": "app", "package": "b", "verify": {"status": "pass"}}
        ]}"#;
        let m = Manifest::from_json(json).unwrap();
        assert!(m.depends_on_app("b"));
    }

    #[test]
    fn test_empty_pid_rejected() {
        let err = Manifest::from_json(r#"{"pid": " ", "version": "1"}"#).unwrap_err();
        assert!(matches!(err, ManifestError::EmptyField("pid")));
    }

    #[test]
    fn test_system_package_lookup() {
        let m = Manifest::from_json(NEXTCLOUD).unwrap();
        assert!(m.needs_system_package("php"));
        assert!(!m.needs_system_package("pymysql"));
    }
}
