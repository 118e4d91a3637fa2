//! # TurboEdit Replace
//!
//! Resolves LLM-proposed edit blocks into final file content.
//!
//! Proposed edits rarely match the file byte-for-byte, so three strategies
//! are layered behind one [`ReplaceStrategy`] capability:
//!
//! - [`StringReplacer`] - exact, whole-line match (the fast path)
//! - [`SimilarityReplacer`] - best line window above a similarity threshold
//! - [`PatchReplacer`] - one synthetic unified diff through a [`PatchBackend`]
//!
//! [`SearchReplaceManager`] dispatches to one of them or walks an ordered
//! fallback list, tagging the result with the strategy that produced it.
//!
//! ## Example
//!
//! ```
//! use turboedit_replace::prelude::*;
//!
//! let manager = SearchReplaceManager::new();
//! let result = manager.replace_with_fallback(
//!     "fn main() {\n    old();\n}\n",
//!     &[EditBlock::new("    old();", "    new();")],
//!     None,
//! );
//! assert!(result.success);
//! assert_eq!(result.new_content.as_deref(), Some("fn main() {\n    new();\n}\n"));
//! assert_eq!(result.metadata["used_strategy"], "string");
//! ```
//!
//! Every outcome is a [`ReplaceResult`](turboedit_core::ReplaceResult);
//! strategies never return errors or panic on unmatched input.

pub mod diff;
pub mod fuzzy;
pub mod lines;
pub mod manager;
pub mod patch;
pub mod similarity;
pub mod strategy;
pub mod string;

pub use diff::generate_unified_diff;
pub use fuzzy::{DEFAULT_SIMILARITY_THRESHOLD, SimilarityReplacer};
pub use manager::{MANAGER_SIMILARITY_THRESHOLD, SearchReplaceManager};
pub use patch::{DiffyBackend, PatchBackend, PatchReplacer};
pub use similarity::{ExhaustiveMatch, TextSimilarity, WindowCandidate, WindowMatch, ratio};
pub use strategy::ReplaceStrategy;
pub use string::{LineSpan, StringReplacer};

pub mod prelude {
    pub use crate::fuzzy::SimilarityReplacer;
    pub use crate::manager::SearchReplaceManager;
    pub use crate::patch::{PatchBackend, PatchReplacer};
    pub use crate::similarity::TextSimilarity;
    pub use crate::strategy::ReplaceStrategy;
    pub use crate::string::StringReplacer;
    pub use turboedit_core::prelude::*;
}
