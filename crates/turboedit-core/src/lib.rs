//! # TurboEdit Core
//!
//! Core data models, error types, and configuration for the editing engine.
//! This crate defines the canonical types that all other crates depend on.
//!
//! ## Core Modules
//!
//! - [`models`] - Edit blocks, results, change records, backups, checkpoints
//! - [`error`] - Error enum and Result alias
//! - [`config`] - Engine configuration with builder and YAML persistence
//! - [`profiles`] - Configuration presets
//! - [`utils`] - Hashing, id generation and path resolution
//!
//! ## Usage Examples
//!
//! ```
//! use turboedit_core::prelude::*;
//!
//! let block = EditBlock::new("fn old()", "fn new()");
//! assert!(block.validate().is_ok());
//!
//! let config = EditorConfig::builder("/tmp/project").build().unwrap();
//! assert_eq!(config.fallback_order, StrategyKind::default_order());
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod profiles;
pub mod utils;

pub use config::{ApplySuccessPolicy, EditorConfig, EditorConfigBuilder};
pub use error::{Error, Result};
pub use models::*;
pub use profiles::ConfigProfile;
pub use utils::{checkpoint_id_for_group, compute_hash, generate_id, resolve_path};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ApplySuccessPolicy, EditorConfig};
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        ApplyResult, BackupEntry, ChangeGroupSummary, ChangeRecord, ConversationCheckpoint,
        ConversationLink, EditBlock, FileChange, Metadata, ReplaceResult, StrategyKind,
        UndoResult, validate_blocks,
    };
    pub use crate::profiles::ConfigProfile;
}
