//! Verification results.
//!
//! The verifier never writes into a [`Manifest`](crate::Manifest). Each stage
//! produces [`DependencyCheck`] values which are collected per app into an
//! [`AppVerification`], and per run into a [`VerificationReport`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::manifest::DependencyKind;
use crate::types::AppId;

/// Why a dependency did not verify.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailReason {
    /// An app dependency names an app that is not installed.
    #[error("not_installed")]
    NotInstalled,
    /// The dependency was installed but only takes effect after a restart.
    #[error("internal_restart")]
    InternalRestart,
    /// The package manager failed to install the dependency.
    #[error("{0}")]
    InstallFailed(String),
    /// An app dependency is installed but did not verify itself.
    #[error("dependency_failed")]
    DependencyFailed,
}

/// Marks install error text that would otherwise read as another reason.
const INSTALL_FAILED_PREFIX: &str = "install_failed: ";

const RESERVED: [&str; 3] = ["not_installed", "internal_restart", "dependency_failed"];

impl FailReason {
    /// Wire form of the reason. Install error text is carried verbatim unless
    /// it collides with a reserved token, in which case it is prefixed.
    fn to_info(&self) -> String {
        match self {
            Self::InstallFailed(msg)
                if RESERVED.contains(&msg.as_str()) || msg.starts_with(INSTALL_FAILED_PREFIX) =>
            {
                format!("{INSTALL_FAILED_PREFIX}{msg}")
            }
            other => other.to_string(),
        }
    }

    fn from_info(info: Option<String>) -> Self {
        match info.as_deref() {
            Some("not_installed") => Self::NotInstalled,
            Some("internal_restart") => Self::InternalRestart,
            Some("dependency_failed") | None => Self::DependencyFailed,
            Some(other) => Self::InstallFailed(
                other
                    .strip_prefix(INSTALL_FAILED_PREFIX)
                    .unwrap_or(other)
                    .to_string(),
            ),
        }
    }
}

/// Result of checking one dependency.
///
/// Serialized as `{"status": "pass"}` or `{"status": "fail", "info": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "VerifyRecord", from = "VerifyRecord")]
pub enum Outcome {
    /// The dependency is satisfied.
    Pass,
    /// The dependency is not satisfied.
    Fail(FailReason),
}

impl Outcome {
    /// Whether this outcome is a pass.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => f.write_str("pass"),
            Self::Fail(reason) => write!(f, "fail ({reason})"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Pass,
    Fail,
}

#[derive(Serialize, Deserialize)]
struct VerifyRecord {
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<String>,
}

impl From<Outcome> for VerifyRecord {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => Self {
                status: Status::Pass,
                info: None,
            },
            Outcome::Fail(reason) => Self {
                status: Status::Fail,
                info: Some(reason.to_info()),
            },
        }
    }
}

impl From<VerifyRecord> for Outcome {
    fn from(record: VerifyRecord) -> Self {
        match record.status {
            Status::Pass => Self::Pass,
            Status::Fail => Self::Fail(FailReason::from_info(record.info)),
        }
    }
}

/// Outcome of checking a single declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCheck {
    /// Namespace of the dependency.
    pub kind: DependencyKind,
    /// Package name or app pid.
    pub package: String,
    /// What the check concluded.
    pub verify: Outcome,
}

impl DependencyCheck {
    /// Create a check result.
    pub fn new(kind: DependencyKind, package: impl Into<String>, verify: Outcome) -> Self {
        Self {
            kind,
            package: package.into(),
            verify,
        }
    }
}

/// All dependency checks for one app, across every stage that ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppVerification {
    /// The verified app.
    pub app: AppId,
    /// Checks in stage order, manifest order within a stage.
    pub checks: Vec<DependencyCheck>,
}

impl AppVerification {
    /// Create an empty verification record for `app`.
    pub fn new(app: AppId) -> Self {
        Self {
            app,
            checks: Vec::new(),
        }
    }

    /// Aggregate status: every check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.verify.is_pass())
    }

    /// Whether any check asks for a host restart.
    pub fn needs_restart(&self) -> bool {
        self.failures()
            .any(|c| c.verify == Outcome::Fail(FailReason::InternalRestart))
    }

    /// Checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &DependencyCheck> {
        self.checks.iter().filter(|c| !c.verify.is_pass())
    }
}

/// Verification results keyed by app id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationReport {
    apps: BTreeMap<AppId, AppVerification>,
}

impl VerificationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the result for one app.
    pub fn insert(&mut self, verification: AppVerification) {
        self.apps.insert(verification.app.clone(), verification);
    }

    /// Look up the result for one app.
    pub fn get(&self, id: &str) -> Option<&AppVerification> {
        self.apps.get(id)
    }

    /// Aggregate status of one app, if it was verified.
    pub fn status(&self, id: &str) -> Option<bool> {
        self.get(id).map(AppVerification::passed)
    }

    /// Whether every app in the report passed.
    pub fn all_passed(&self) -> bool {
        self.apps.values().all(AppVerification::passed)
    }

    /// Iterate results in app id order.
    pub fn iter(&self) -> impl Iterator<Item = &AppVerification> {
        self.apps.values()
    }

    /// Number of apps in the report.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
