//! Core data structures for gostage.
//!
//! This module contains the types every stage of a staging run shares:
//! - The application tree view and the detected strategy
//! - The buildpack dependency manifest
//! - The build plan and staging result
//! - The staging error taxonomy

pub mod app_tree;
pub mod error;
pub mod manifest;
pub mod plan;
pub mod strategy;

pub use app_tree::AppTree;
pub use error::{
    BuildError, DependencyFetchError, DetectionError, FetchError, HookError, StagingError,
};
pub use manifest::{ManifestEntry, ToolchainManifest};
pub use plan::{BuildPlan, Layout, StagingResult};
pub use strategy::{Detection, Strategy, StrategyMetadata};
