//! Shared data model for hostapp.
//!
//! Everything here is plain data: app manifests and their dependency records,
//! the immutable verification values produced by the dependency verifier, and
//! the cascade plan items produced by the conflict planner.

pub mod manifest;
pub mod plan;
pub mod types;
pub mod verify;

// Re-exports
pub use manifest::{Dependency, DependencyKind, Manifest, ManifestError};
pub use plan::{Operation, PlanItem};
pub use types::*;
pub use verify::{AppVerification, DependencyCheck, FailReason, Outcome, VerificationReport};

/// File name of the descriptor inside every bundle directory.
pub const MANIFEST_FILE: &str = "manifest.json";
