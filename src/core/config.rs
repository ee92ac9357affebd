//! Runtime configuration
//!
//! Loaded from RON (Rusty Object Notation) or JSON. Missing fields fall back
//! to their defaults, so a config file only names what it overrides:
//!
//! ```ron
//! (
//!     tolerance: (gimbal: 1e-5),
//!     orphan_policy: PromoteToRoots,
//! )
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::{OrphanPolicy, ReparentMode};
use crate::math::Tolerance;

/// Hierarchy configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Numerical thresholds for decomposition and Euler extraction
    pub tolerance: Tolerance,
    /// What happens to the children of a despawned entity
    pub orphan_policy: OrphanPolicy,
    /// Pose kept by `World::set_parent`
    pub reparent_mode: ReparentMode,
}

impl Config {
    /// Set the numerical tolerances
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the orphan policy
    #[must_use]
    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    /// Set the default reparent mode
    #[must_use]
    pub fn with_reparent_mode(mut self, mode: ReparentMode) -> Self {
        self.reparent_mode = mode;
        self
    }

    /// Parse from a RON string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid config
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Load from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Load from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Errors that can occur while loading a config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// RON deserialization error
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tolerance, Tolerance::DEFAULT);
        assert_eq!(config.orphan_policy, OrphanPolicy::ReparentToGrandparent);
        assert_eq!(config.reparent_mode, ReparentMode::KeepLocal);
    }

    #[test]
    fn test_partial_ron() {
        let config = Config::from_ron_str(
            "(tolerance: (gimbal: 1e-5), orphan_policy: PromoteToRoots)",
        )
        .unwrap();

        assert_eq!(config.tolerance.gimbal, 1e-5);
        assert_eq!(config.tolerance.normalize, Tolerance::DEFAULT.normalize);
        assert_eq!(config.orphan_policy, OrphanPolicy::PromoteToRoots);
        assert_eq!(config.reparent_mode, ReparentMode::KeepLocal);
    }

    #[test]
    fn test_invalid_ron() {
        let err = Config::from_ron_str("(orphan_policy: Nowhere)").unwrap_err();
        assert!(matches!(err, ConfigError::Ron(_)));
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_reparent_mode(ReparentMode::KeepWorld)
            .with_orphan_policy(OrphanPolicy::PromoteToRoots);
        assert_eq!(config.reparent_mode, ReparentMode::KeepWorld);
        assert_eq!(config.orphan_policy, OrphanPolicy::PromoteToRoots);
    }

    #[test]
    fn test_load_files() {
        let dir = std::env::temp_dir();
        let ron_path = dir.join(format!("spatial-config-{}.ron", std::process::id()));
        let json_path = dir.join(format!("spatial-config-{}.json", std::process::id()));

        fs::write(&ron_path, "(reparent_mode: KeepWorld)").unwrap();
        fs::write(&json_path, r#"{ "orphan_policy": "PromoteToRoots" }"#).unwrap();

        let from_ron = Config::load_ron(&ron_path).unwrap();
        let from_json = Config::load_json(&json_path).unwrap();
        let _ = fs::remove_file(&ron_path);
        let _ = fs::remove_file(&json_path);

        assert_eq!(from_ron.reparent_mode, ReparentMode::KeepWorld);
        assert_eq!(from_json.orphan_policy, OrphanPolicy::PromoteToRoots);
        assert_eq!(from_json.reparent_mode, ReparentMode::KeepLocal);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_json("/nonexistent/spatial.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
