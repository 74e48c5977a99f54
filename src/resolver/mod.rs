//! Toolchain version resolution.

pub mod errors;
pub mod version;

pub use errors::VersionResolutionError;
pub use version::{resolve, VersionConstraint};
