//! Version resolution errors.

use thiserror::Error;

/// Error resolving a toolchain version constraint against the manifest.
///
/// Unsatisfiable and malformed constraints are deliberately the same error:
/// the user-facing diagnostic is always `no match found for <constraint>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionResolutionError {
    #[error("no match found for {constraint}")]
    NoMatch { constraint: String },
}

impl VersionResolutionError {
    pub fn no_match(constraint: impl Into<String>) -> Self {
        VersionResolutionError::NoMatch {
            constraint: constraint.into(),
        }
    }

    /// The constraint text exactly as the user supplied it.
    pub fn constraint(&self) -> &str {
        match self {
            VersionResolutionError::NoMatch { constraint } => constraint,
        }
    }
}
