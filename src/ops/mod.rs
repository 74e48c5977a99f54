//! High-level operations.
//!
//! This module contains the implementation of gostage commands.

pub mod environment;
pub mod stage;

pub use environment::{configure, write_profile_scripts, EnvToggles};
pub use stage::{
    artifact_cache, load_staging_config, report_failure, stage, version_constraint, StageOptions,
    Stager,
};
