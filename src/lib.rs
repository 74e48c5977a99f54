//! gostage - staging decisions for Go applications
//!
//! This crate provides the core library functionality for gostage,
//! including dependency strategy detection, toolchain version resolution,
//! artifact caching, and the compile pipeline.

pub mod builder;
pub mod core;
pub mod detect;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for gostage unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for process execution
/// and artifact transport, plus application and buildpack fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    app_tree::AppTree, error::StagingError, manifest::ToolchainManifest, plan::BuildPlan,
    plan::StagingResult, strategy::Detection, strategy::Strategy,
};

pub use resolver::VersionResolutionError;
pub use util::context::StagingContext;
