//! Core data models shared by the replacement strategies and the change history.
//!
//! These types are the only things that cross component boundaries: callers hand in
//! [`EditBlock`]s and [`FileChange`]s, and always get back a structured
//! [`ReplaceResult`], [`ApplyResult`] or [`UndoResult`].

use crate::error::{Error, Result};
use crate::utils::{checkpoint_id_for_group, generate_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form, ordered diagnostic map attached to results.
pub type Metadata = serde_json::Map<String, Value>;

// ==================== Edit blocks ====================

/// A single proposed change: replace `search_text` with `replace_text`.
///
/// An empty `search_text` means "insert `replace_text` at the head of the file".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditBlock {
    /// Text to locate in the current content
    pub search_text: String,
    /// Replacement text
    pub replace_text: String,
}

impl EditBlock {
    /// Create a search/replace block
    pub fn new(search_text: impl Into<String>, replace_text: impl Into<String>) -> Self {
        Self {
            search_text: search_text.into(),
            replace_text: replace_text.into(),
        }
    }

    /// Create a block that inserts `replace_text` at the start of the file
    pub fn insert(replace_text: impl Into<String>) -> Self {
        Self::new(String::new(), replace_text)
    }

    /// Whether this block inserts at file head instead of replacing
    pub fn is_insert(&self) -> bool {
        self.search_text.is_empty()
    }

    /// Reject non-empty search text that is only whitespace.
    pub fn validate(&self) -> Result<()> {
        if !self.search_text.is_empty() && self.search_text.trim().is_empty() {
            return Err(Error::validation_error(
                "search text must not consist only of whitespace",
            ));
        }
        Ok(())
    }
}

/// Validation shared by every strategy: the list must be non-empty and every
/// block individually valid. Runs before any content is touched.
pub fn validate_blocks(blocks: &[EditBlock]) -> Result<()> {
    if blocks.is_empty() {
        return Err(Error::validation_error("no edit blocks supplied"));
    }
    for (idx, block) in blocks.iter().enumerate() {
        block.validate().map_err(|e| match e {
            Error::ValidationError { reason } => {
                Error::validation_error(format!("block {}: {}", idx + 1, reason))
            }
            other => other,
        })?;
    }
    Ok(())
}

// ==================== Strategy selection ====================

/// The interchangeable edit-application strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Exact whole-line match
    String,
    /// Fuzzy line-window match above a threshold
    Similarity,
    /// Synthetic unified diff applied by a patch backend
    Patch,
}

impl StrategyKind {
    /// Stable name used in result metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Similarity => "similarity",
            Self::Patch => "patch",
        }
    }

    /// Default fallback order
    pub fn default_order() -> Vec<StrategyKind> {
        vec![Self::String, Self::Similarity, Self::Patch]
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "exact" => Ok(Self::String),
            "similarity" | "fuzzy" => Ok(Self::Similarity),
            "patch" | "diff" => Ok(Self::Patch),
            other => Err(Error::config_error(format!("unknown strategy: {}", other))),
        }
    }
}

// ==================== Replace results ====================

/// Structured outcome of applying edit blocks to a piece of content.
///
/// `new_content` is present iff `applied_count > 0`. `success` means every
/// block applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplaceResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    pub applied_count: usize,
    pub total_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ReplaceResult {
    /// Build a result from the outcome of a block loop.
    pub fn from_outcome(
        content: String,
        applied_count: usize,
        total_count: usize,
        errors: Vec<String>,
    ) -> Self {
        let success = total_count > 0 && applied_count == total_count;
        let message = if success {
            format!("Applied {}/{} blocks", applied_count, total_count)
        } else if applied_count > 0 {
            format!(
                "Partially applied {}/{} blocks",
                applied_count, total_count
            )
        } else {
            format!("Applied 0/{} blocks", total_count)
        };
        Self {
            success,
            message,
            new_content: (applied_count > 0).then_some(content),
            applied_count,
            total_count,
            errors,
            metadata: Metadata::new(),
        }
    }

    /// A failure that applied nothing.
    pub fn failure(message: impl Into<String>, total_count: usize) -> Self {
        let message = message.into();
        Self {
            success: false,
            errors: vec![message.clone()],
            message,
            new_content: None,
            applied_count: 0,
            total_count,
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Set a metadata entry in place
    pub fn set_metadata(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Strategy tag recorded by whichever replacer produced this result
    pub fn strategy(&self) -> Option<&str> {
        self.metadata.get("strategy").and_then(Value::as_str)
    }

    /// Render the failure detail for replay into a follow-up prompt.
    pub fn to_prompt_feedback(&self) -> String {
        let mut out = format!("{}\n", self.message);
        if let Some(strategy) = self.strategy() {
            out.push_str(&format!("Strategy: {}\n", strategy));
        }
        if let Some(Value::Array(tried)) = self.metadata.get("tried_strategies") {
            let names: Vec<&str> = tried.iter().filter_map(Value::as_str).collect();
            out.push_str(&format!("Tried strategies: {}\n", names.join(", ")));
        }
        for err in &self.errors {
            out.push_str("- ");
            out.push_str(err);
            out.push('\n');
        }
        out
    }
}

// ==================== File changes and history ====================

/// A requested write or deletion. Transient: consumed by one apply call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    pub file_path: String,
    pub content: String,
    /// Caller's hint; the manager re-checks the filesystem
    pub is_new: bool,
    pub is_deletion: bool,
}

impl FileChange {
    /// Overwrite (or create) a file with `content`
    pub fn write(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            content: content.into(),
            is_new: false,
            is_deletion: false,
        }
    }

    /// Create a file that is not expected to exist yet
    pub fn create(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_new: true,
            ..Self::write(file_path, content)
        }
    }

    /// Delete a file
    pub fn delete(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            content: String::new(),
            is_new: false,
            is_deletion: true,
        }
    }
}

/// Immutable record of one applied file change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    pub change_id: String,
    pub file_path: String,
    #[serde(default)]
    pub backup_id: Option<String>,
    pub is_new: bool,
    pub is_deletion: bool,
    #[serde(default)]
    pub group_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Assigned by the change store; breaks timestamp ties
    #[serde(default)]
    pub sequence: u64,
}

impl ChangeRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        file_path: impl Into<String>,
        backup_id: Option<String>,
        is_new: bool,
        is_deletion: bool,
        group_id: Option<String>,
    ) -> Self {
        Self {
            change_id: generate_id(),
            file_path: file_path.into(),
            backup_id,
            is_new,
            is_deletion,
            group_id,
            timestamp: Utc::now(),
            sequence: 0,
        }
    }

    /// Total order over records: timestamp, then store sequence.
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.sequence)
    }

    /// Whether this record was applied after `other`
    pub fn is_after(&self, other: &ChangeRecord) -> bool {
        self.order_key() > other.order_key()
    }
}

/// Metadata describing a stored snapshot of a file's prior bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupEntry {
    pub backup_id: String,
    pub original_path: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    /// SHA-256 of the snapshot bytes
    pub checksum: String,
}

/// Conversation identifiers a caller attaches to an apply call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationLink {
    pub conversation_id: String,
    pub first_message_id: Option<String>,
    pub last_message_id: Option<String>,
    pub metadata: Option<Value>,
}

impl ConversationLink {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Default::default()
        }
    }

    pub fn with_first_message(mut self, message_id: impl Into<String>) -> Self {
        self.first_message_id = Some(message_id.into());
        self
    }

    pub fn with_last_message(mut self, message_id: impl Into<String>) -> Self {
        self.last_message_id = Some(message_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Link between a change group and a conversation's message range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationCheckpoint {
    /// SHA-256 of `group_id`
    pub checkpoint_id: String,
    pub group_id: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
    #[serde(default)]
    pub first_message_id: Option<String>,
    #[serde(default)]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl ConversationCheckpoint {
    /// Create the checkpoint for `group_id`, stamped now.
    pub fn new(group_id: impl Into<String>, link: &ConversationLink) -> Self {
        let group_id = group_id.into();
        Self {
            checkpoint_id: checkpoint_id_for_group(&group_id),
            group_id,
            timestamp: Utc::now(),
            conversation_id: link.conversation_id.clone(),
            first_message_id: link.first_message_id.clone(),
            last_message_id: link.last_message_id.clone(),
            metadata: link.metadata.clone(),
        }
    }

    /// Whether `message_id` bounds this checkpoint's message range, optionally
    /// restricted to one conversation.
    pub fn matches_message(&self, message_id: &str, conversation_id: Option<&str>) -> bool {
        if let Some(conversation_id) = conversation_id
            && conversation_id != self.conversation_id
        {
            return false;
        }
        self.first_message_id.as_deref() == Some(message_id)
            || self.last_message_id.as_deref() == Some(message_id)
    }
}

/// Outcome of one apply call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApplyResult {
    pub success: bool,
    pub message: String,
    pub group_id: Option<String>,
    /// Ids of the records persisted by this call, in caller order
    pub change_ids: Vec<String>,
    pub changed_files: Vec<String>,
    /// Per-file failures, keyed by the caller-supplied path
    pub errors: BTreeMap<String, String>,
    pub checkpoint_id: Option<String>,
}

impl ApplyResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Outcome of an undo or rollback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UndoResult {
    pub success: bool,
    pub message: String,
    /// Files restored from backup or removed, in processing order
    pub restored_files: Vec<String>,
    pub undone_change_ids: Vec<String>,
    /// Per-file failures
    pub errors: BTreeMap<String, String>,
}

impl UndoResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Fold another undo outcome into this one.
    pub fn absorb(&mut self, other: UndoResult) {
        self.restored_files.extend(other.restored_files);
        self.undone_change_ids.extend(other.undone_change_ids);
        self.errors.extend(other.errors);
    }
}

/// One row of the change-group overview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeGroupSummary {
    pub group_id: String,
    /// Timestamp of the group's most recent record
    pub timestamp: DateTime<Utc>,
    pub change_count: usize,
    pub files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_validation() {
        assert!(EditBlock::new("fn main()", "fn start()").validate().is_ok());
        assert!(EditBlock::insert("// header").validate().is_ok());
        assert!(EditBlock::new("  \n\t", "x").validate().is_err());
    }

    #[test]
    fn test_validate_blocks_rejects_empty_list() {
        let err = validate_blocks(&[]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_blocks_names_offending_block() {
        let blocks = vec![EditBlock::new("a", "b"), EditBlock::new("   ", "c")];
        let err = validate_blocks(&blocks).unwrap_err();
        assert!(err.to_string().contains("block 2"));
    }

    #[test]
    fn test_strategy_kind_round_trip_names() {
        for kind in StrategyKind::default_order() {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        assert!("levenshtein".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_replace_result_content_presence() {
        let none = ReplaceResult::from_outcome("x".into(), 0, 2, vec!["miss".into()]);
        assert!(none.new_content.is_none());
        assert!(!none.success);

        let partial = ReplaceResult::from_outcome("y".into(), 1, 2, vec!["miss".into()]);
        assert_eq!(partial.new_content.as_deref(), Some("y"));
        assert!(!partial.success);

        let full = ReplaceResult::from_outcome("z".into(), 2, 2, vec![]);
        assert!(full.success);
    }

    #[test]
    fn test_prompt_feedback_lists_errors() {
        let result = ReplaceResult::failure("Block 1: no exact line match", 1)
            .with_metadata("strategy", "string");
        let feedback = result.to_prompt_feedback();
        assert!(feedback.contains("Strategy: string"));
        assert!(feedback.contains("- Block 1: no exact line match"));
    }

    #[test]
    fn test_record_ordering_uses_sequence_on_ties() {
        let mut a = ChangeRecord::new("a.txt", None, true, false, None);
        let mut b = a.clone();
        b.change_id = "other".into();
        a.sequence = 1;
        b.sequence = 2;
        assert!(b.is_after(&a));
        assert!(!a.is_after(&b));
    }

    #[test]
    fn test_checkpoint_message_matching() {
        let link = ConversationLink::new("conv-1")
            .with_first_message("m1")
            .with_last_message("m3");
        let checkpoint = ConversationCheckpoint::new("group-1", &link);

        assert_eq!(checkpoint.checkpoint_id, checkpoint_id_for_group("group-1"));
        assert!(checkpoint.matches_message("m1", None));
        assert!(checkpoint.matches_message("m3", Some("conv-1")));
        assert!(!checkpoint.matches_message("m2", None));
        assert!(!checkpoint.matches_message("m1", Some("conv-2")));
    }
}
