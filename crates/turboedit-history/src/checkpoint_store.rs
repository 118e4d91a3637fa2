//! Conversation checkpoints, one JSON file per checkpoint keyed by the
//! hashed checkpoint id.

use crate::atomic::{check_record_id, read_json, read_json_dir, remove_if_exists, write_json};
use std::fs;
use std::path::{Path, PathBuf};
use turboedit_core::{ConversationCheckpoint, Error, Result, checkpoint_id_for_group};

/// File-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct ConversationCheckpointStore {
    checkpoint_dir: PathBuf,
}

impl ConversationCheckpointStore {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Result<Self> {
        let checkpoint_dir = checkpoint_dir.into();
        fs::create_dir_all(&checkpoint_dir).map_err(Error::io)?;
        Ok(Self { checkpoint_dir })
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    fn checkpoint_path(&self, checkpoint_id: &str) -> PathBuf {
        self.checkpoint_dir.join(format!("{}.json", checkpoint_id))
    }

    /// Persist a checkpoint, replacing any earlier one with the same id.
    pub fn save_checkpoint(&self, checkpoint: &ConversationCheckpoint) -> Result<()> {
        check_record_id(&checkpoint.checkpoint_id)?;
        write_json(&self.checkpoint_path(&checkpoint.checkpoint_id), checkpoint)?;
        log::debug!(
            "Saved checkpoint {} for group {} (conversation {})",
            checkpoint.checkpoint_id,
            checkpoint.group_id,
            checkpoint.conversation_id
        );
        Ok(())
    }

    /// Look a checkpoint up; unknown ids and unreadable entries are `None`.
    pub fn get_checkpoint(&self, checkpoint_id: &str) -> Option<ConversationCheckpoint> {
        if check_record_id(checkpoint_id).is_err() {
            return None;
        }
        match read_json(&self.checkpoint_path(checkpoint_id)) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                log::warn!("Failed to read checkpoint {}: {}", checkpoint_id, e);
                None
            }
        }
    }

    /// Checkpoint recorded for a change group
    pub fn get_checkpoint_for_group(&self, group_id: &str) -> Option<ConversationCheckpoint> {
        self.get_checkpoint(&checkpoint_id_for_group(group_id))
    }

    /// Checkpoints, newest first, optionally for one conversation.
    pub fn list_checkpoints(
        &self,
        conversation_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationCheckpoint>> {
        let mut checkpoints: Vec<ConversationCheckpoint> = read_json_dir(&self.checkpoint_dir)?;
        if let Some(conversation_id) = conversation_id {
            checkpoints.retain(|c| c.conversation_id == conversation_id);
        }
        checkpoints.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            checkpoints.truncate(limit);
        }
        Ok(checkpoints)
    }

    /// Most recent checkpoint whose first or last message id is
    /// `message_id`.
    pub fn find_by_message(
        &self,
        message_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Option<ConversationCheckpoint>> {
        Ok(self
            .list_checkpoints(conversation_id, None)?
            .into_iter()
            .find(|c| c.matches_message(message_id, conversation_id)))
    }

    /// Remove a checkpoint. Returns whether it existed.
    pub fn delete_checkpoint(&self, checkpoint_id: &str) -> Result<bool> {
        check_record_id(checkpoint_id)?;
        remove_if_exists(&self.checkpoint_path(checkpoint_id))
    }
}
