//! # TurboEdit History
//!
//! Versioned, reversible file writes.
//!
//! - [`FileBackupManager`] snapshots a file's bytes before they are replaced
//! - [`FileChangeStore`] keeps one [`ChangeRecord`](turboedit_core::ChangeRecord)
//!   per applied file change, with a retention ceiling
//! - [`ConversationCheckpointStore`] links change groups to conversation
//!   message ids
//! - [`FileChangeManager`] composes them: apply, undo a change or a group,
//!   undo to a version, undo the last change, roll back to a message
//!
//! ## Storage layout
//!
//! ```text
//! <storage_root>/
//!   backups/<backup_id>.bak|.json
//!   changes/<change_id>.json
//! <storage_root>-checkpoints/
//!   <sha256(group_id)>.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use turboedit_core::prelude::*;
//! use turboedit_history::FileChangeManager;
//!
//! # fn main() -> Result<()> {
//! let config = EditorConfig::builder("/path/to/project").build()?;
//! let manager = FileChangeManager::new(config)?;
//!
//! let applied = manager.apply_changes(&[FileChange::write("src/lib.rs", "pub fn f() {}\n")], None);
//! assert!(applied.success);
//!
//! let undone = manager.undo_last_change();
//! assert!(undone.success);
//! # Ok(())
//! # }
//! ```
//!
//! Everything here is synchronous and assumes a single writer per project.

pub mod atomic;
pub mod backup;
pub mod change_store;
pub mod checkpoint_store;
pub mod manager;

pub use backup::FileBackupManager;
pub use change_store::FileChangeStore;
pub use checkpoint_store::ConversationCheckpointStore;
pub use manager::{CHECKPOINT_ERROR_KEY, FileChangeManager};

pub mod prelude {
    pub use crate::backup::FileBackupManager;
    pub use crate::change_store::FileChangeStore;
    pub use crate::checkpoint_store::ConversationCheckpointStore;
    pub use crate::manager::FileChangeManager;
    pub use turboedit_core::prelude::*;
}
