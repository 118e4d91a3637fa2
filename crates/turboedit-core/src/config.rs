//! Configuration for the editing engine.
//!
//! Follows a builder pattern with validation; configs persist as YAML.

use crate::error::{Error, Result};
use crate::models::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How an apply call over several files decides overall success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplySuccessPolicy {
    /// Every file in the batch must be written
    #[default]
    AllFiles,
    /// At least one file in the batch must be written
    AnyFile,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Relative file paths resolve against this directory
    pub project_root: PathBuf,
    /// Change records and backups live under this directory
    pub storage_root: PathBuf,
    /// Checkpoints directory; defaults to a sibling of `storage_root`
    pub checkpoint_dir: Option<PathBuf>,

    // History settings
    pub max_change_records: usize,
    pub verify_backups: bool,
    pub apply_success_policy: ApplySuccessPolicy,

    // Replacement settings
    /// Threshold of the similarity strategy the manager registers
    pub manager_similarity_threshold: f64,
    pub default_strategy: StrategyKind,
    pub fallback_order: Vec<StrategyKind>,
    pub enabled_strategies: Vec<StrategyKind>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            storage_root: PathBuf::from(".turboedit/history"),
            checkpoint_dir: None,
            max_change_records: 1000,
            verify_backups: true,
            apply_success_policy: ApplySuccessPolicy::AllFiles,
            manager_similarity_threshold: 0.99,
            default_strategy: StrategyKind::String,
            fallback_order: StrategyKind::default_order(),
            enabled_strategies: StrategyKind::default_order(),
        }
    }
}

impl EditorConfig {
    /// Create new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder rooted at `project_root`, storing history under
    /// `<project_root>/.turboedit/history`.
    pub fn builder(project_root: impl Into<PathBuf>) -> EditorConfigBuilder {
        EditorConfigBuilder::new(project_root)
    }

    /// Effective checkpoint directory
    pub fn checkpoint_dir(&self) -> PathBuf {
        if let Some(dir) = &self.checkpoint_dir {
            return dir.clone();
        }
        let name = self
            .storage_root
            .file_name()
            .map(|n| format!("{}-checkpoints", n.to_string_lossy()))
            .unwrap_or_else(|| "checkpoints".to_string());
        match self.storage_root.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_change_records == 0 {
            return Err(Error::config_error("max_change_records must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.manager_similarity_threshold) {
            return Err(Error::config_error(format!(
                "manager_similarity_threshold must be within [0, 1], got {}",
                self.manager_similarity_threshold
            )));
        }

        if self.enabled_strategies.is_empty() {
            return Err(Error::config_error("At least one strategy must be enabled"));
        }

        if !self.enabled_strategies.contains(&self.default_strategy) {
            return Err(Error::config_error(format!(
                "Default strategy '{}' is not enabled",
                self.default_strategy
            )));
        }

        if self.fallback_order.is_empty() {
            return Err(Error::config_error("Fallback order cannot be empty"));
        }

        if self.storage_root.as_os_str().is_empty() {
            return Err(Error::config_error("storage_root cannot be empty"));
        }

        if self.checkpoint_dir() == self.storage_root {
            return Err(Error::config_error(
                "checkpoint_dir must differ from storage_root",
            ));
        }

        Ok(())
    }

    /// Save configuration to a YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, yaml).map_err(|e| {
            Error::config_error(format!(
                "Failed to save config to {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load configuration from a YAML file, validating it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config_error(format!(
                "Failed to load config from {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: EditorConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::config_error(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Builder for EditorConfig
pub struct EditorConfigBuilder {
    config: EditorConfig,
}

impl EditorConfigBuilder {
    /// Create a new builder
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let storage_root = project_root.join(".turboedit").join("history");
        Self {
            config: EditorConfig {
                project_root,
                storage_root,
                ..EditorConfig::default()
            },
        }
    }

    pub fn storage_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_root = dir.into();
        self
    }

    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn max_change_records(mut self, max: usize) -> Self {
        self.config.max_change_records = max;
        self
    }

    pub fn verify_backups(mut self, verify: bool) -> Self {
        self.config.verify_backups = verify;
        self
    }

    pub fn apply_success_policy(mut self, policy: ApplySuccessPolicy) -> Self {
        self.config.apply_success_policy = policy;
        self
    }

    pub fn manager_similarity_threshold(mut self, threshold: f64) -> Self {
        self.config.manager_similarity_threshold = threshold;
        self
    }

    pub fn default_strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.default_strategy = strategy;
        self
    }

    pub fn fallback_order(mut self, order: Vec<StrategyKind>) -> Self {
        self.config.fallback_order = order;
        self
    }

    pub fn enabled_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.config.enabled_strategies = strategies;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<EditorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
