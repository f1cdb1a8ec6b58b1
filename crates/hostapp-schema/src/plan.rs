//! Cascade plans produced by the conflict planner.

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;
use crate::types::AppId;

/// The operation a cascade is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Installing an app pulls in its missing app dependencies.
    Install,
    /// Removing an app takes its dependents with it.
    Remove,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Install => "install",
            Self::Remove => "remove",
        })
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "install" => Ok(Self::Install),
            "remove" => Ok(Self::Remove),
            other => Err(format!("unknown operation '{other}' (expected install or remove)")),
        }
    }
}

/// One additional action implied by the requested operation.
///
/// Removals carry the full manifest since the app is known locally; installs
/// only carry the id because the bundle has not been fetched yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target")]
pub enum PlanItem {
    /// Install the app with this id.
    Install(AppId),
    /// Remove this installed app.
    Remove(Manifest),
}

impl PlanItem {
    /// The app this item acts on.
    pub fn app_id(&self) -> &AppId {
        match self {
            Self::Install(id) => id,
            Self::Remove(manifest) => &manifest.pid,
        }
    }

    /// The operation this item performs.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Install(_) => Operation::Install,
            Self::Remove(_) => Operation::Remove,
        }
    }
}
