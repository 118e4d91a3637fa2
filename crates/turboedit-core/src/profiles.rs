//! Pre-configured profiles for common agent setups
//!
//! - Default: exact match first, strict fuzzy fallback, 1000 records
//! - Strict: exact matching only
//! - Lenient: looser fuzzy threshold for noisy models
//! - Ephemeral: short history for scratch sessions

use crate::config::EditorConfig;
use crate::error::Error;
use crate::models::StrategyKind;
use std::path::PathBuf;
use std::str::FromStr;

/// Profile selector for pre-configured engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProfile {
    /// Balanced defaults
    Default,
    /// String strategy only, never fuzzy
    Strict,
    /// Accepts looser fuzzy matches
    Lenient,
    /// Small retention ceiling, no checksum verification
    Ephemeral,
}

impl ConfigProfile {
    /// Create an EditorConfig from this profile, rooted at `project_root`
    pub fn create_config(self, project_root: impl Into<PathBuf>) -> EditorConfig {
        let project_root = project_root.into();
        let mut config = EditorConfig {
            storage_root: project_root.join(".turboedit").join("history"),
            project_root,
            ..EditorConfig::default()
        };

        match self {
            Self::Default => {}

            Self::Strict => {
                config.enabled_strategies = vec![StrategyKind::String];
                config.fallback_order = vec![StrategyKind::String];
            }

            Self::Lenient => {
                config.manager_similarity_threshold = 0.8;
            }

            Self::Ephemeral => {
                config.max_change_records = 50;
                config.verify_backups = false;
            }
        }

        config
    }

    /// Get profile name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Strict => "strict",
            Self::Lenient => "lenient",
            Self::Ephemeral => "ephemeral",
        }
    }

    /// Get all available profiles
    pub fn all() -> Vec<Self> {
        vec![Self::Default, Self::Strict, Self::Lenient, Self::Ephemeral]
    }
}

impl FromStr for ConfigProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::config_error(format!("unknown profile: {}", s)))
    }
}
