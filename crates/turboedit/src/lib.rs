//! # TurboEdit
//!
//! Transactional text editing for coding agents.
//!
//! Proposed edits arrive as search/replace [`EditBlock`]s. They are resolved
//! against the current file with an exact match first, then fuzzy line-window
//! matching, then a synthetic unified-diff patch. The resolved content is
//! written as a tracked change that can be undone on its own, with its
//! group, back to a version, or back to a conversation message.
//!
//! ## Quick Start
//!
//! ```no_run
//! use turboedit::prelude::*;
//!
//! # fn main() -> Result<()> {
//! turboedit::init_logging_from_env();
//!
//! let session = EditSession::with_profile(ConfigProfile::Default, "/path/to/project")?;
//! let link = ConversationLink::new("conv-42").with_last_message("msg-7");
//!
//! let outcome = session.apply_blocks(
//!     "src/main.rs",
//!     &[EditBlock::new("    println!(\"hi\");", "    println!(\"hello\");")],
//!     &ReplaceMode::default(),
//!     Some(&link),
//! );
//! if !outcome.success {
//!     eprintln!("{}", outcome.feedback());
//! }
//!
//! // later: drop everything applied after msg-7
//! let (undo, _checkpoint) = session.history().rollback_to_message("msg-7", Some("conv-42"));
//! assert!(undo.success);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - [`turboedit_core`] - data model, errors, configuration
//! - [`turboedit_replace`] - similarity, strategies, fallback manager
//! - [`turboedit_history`] - backups, change records, checkpoints, undo

pub mod logging;
pub mod session;

pub use logging::{init_logging, init_logging_from_env, level_from_verbosity};
pub use session::{EditOutcome, EditSession, FileEdit, ReplaceMode, ResolvedEdit};

pub use turboedit_core::prelude::*;
pub use turboedit_history::{
    ConversationCheckpointStore, FileBackupManager, FileChangeManager, FileChangeStore,
};
pub use turboedit_replace::{
    PatchBackend, PatchReplacer, ReplaceStrategy, SearchReplaceManager, SimilarityReplacer,
    StringReplacer, TextSimilarity, generate_unified_diff,
};

pub mod prelude {
    pub use crate::session::{EditOutcome, EditSession, FileEdit, ReplaceMode};
    pub use turboedit_core::prelude::*;
    pub use turboedit_history::FileChangeManager;
    pub use turboedit_replace::{SearchReplaceManager, TextSimilarity};
}
