//! Dependency strategy detection.
//!
//! Maps an application tree to exactly one [`Strategy`] or a
//! [`DetectionError`]. Detection only reads the tree, so running it twice on
//! an unchanged tree gives the same answer.

pub mod markers;
pub mod rules;

use crate::core::app_tree::AppTree;
use crate::core::error::DetectionError;
use crate::core::strategy::Detection;

pub use rules::{Rule, RULES};

/// Detect the dependency strategy of an application tree.
pub fn detect(tree: &AppTree) -> Result<Detection, DetectionError> {
    for rule in RULES {
        if !(rule.matches)(tree) {
            continue;
        }

        tracing::debug!("detection rule `{}` matched", rule.name);
        let detection = (rule.classify)(tree)?;
        tracing::info!(
            strategy = %detection.strategy,
            import_path = ?detection.metadata.import_path,
            "detected dependency strategy"
        );
        return Ok(detection);
    }

    Err(DetectionError::Undetermined)
}
