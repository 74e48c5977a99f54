//! Artifact sources.
//!
//! Toolchains and vendor tools are resolved to local files through the
//! [`ArtifactCache`] gateway, which delegates the actual transfer to a
//! pluggable [`Transport`].

pub mod archive;
pub mod cache;
pub mod transport;

pub use archive::extract_tarball;
pub use cache::{ArtifactCache, ArtifactRef, CacheMode};
pub use transport::{HttpTransport, Transport};
