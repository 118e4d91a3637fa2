//! Tracked file writes and every flavour of undo.
//!
//! Apply: backup, then write, then record, then (optionally) checkpoint.
//! Undo: restore from backup (or remove a file the change created), then
//! delete the record. Group, version and message rollbacks all reduce to
//! undoing single records newest first.

use crate::atomic::{remove_if_exists, write_atomic};
use crate::backup::FileBackupManager;
use crate::change_store::FileChangeStore;
use crate::checkpoint_store::ConversationCheckpointStore;
use std::fs;
use std::path::{Path, PathBuf};
use turboedit_core::{
    ApplyResult, ApplySuccessPolicy, ChangeGroupSummary, ChangeRecord, ConversationCheckpoint,
    ConversationLink, EditorConfig, Error, FileChange, Result, UndoResult,
    checkpoint_id_for_group, generate_id, resolve_path,
};

/// Key used in [`ApplyResult::errors`] when the checkpoint could not be saved.
pub const CHECKPOINT_ERROR_KEY: &str = "<checkpoint>";

/// Orchestrates backups, change records and conversation checkpoints for
/// one project. Assumes it is the only writer of its storage directories.
#[derive(Debug)]
pub struct FileChangeManager {
    config: EditorConfig,
    backups: FileBackupManager,
    changes: FileChangeStore,
    checkpoints: ConversationCheckpointStore,
}

impl FileChangeManager {
    /// Open the stores described by `config`, creating directories as needed.
    pub fn new(config: EditorConfig) -> Result<Self> {
        config.validate()?;
        let backups =
            FileBackupManager::new(config.storage_root.join("backups"), config.verify_backups)?;
        let changes =
            FileChangeStore::new(config.storage_root.join("changes"), config.max_change_records)?;
        let checkpoints = ConversationCheckpointStore::new(config.checkpoint_dir())?;

        log::info!(
            "Change history at {} (checkpoints at {})",
            config.storage_root.display(),
            checkpoints.checkpoint_dir().display()
        );

        Ok(Self {
            config,
            backups,
            changes,
            checkpoints,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn backups(&self) -> &FileBackupManager {
        &self.backups
    }

    pub fn change_store(&self) -> &FileChangeStore {
        &self.changes
    }

    pub fn checkpoint_store(&self) -> &ConversationCheckpointStore {
        &self.checkpoints
    }

    /// Absolute path a caller-supplied file path refers to.
    pub fn resolve(&self, file_path: &str) -> Result<PathBuf> {
        resolve_path(&self.config.project_root, file_path)
    }

    fn record_key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    // ==================== Apply ====================

    /// Apply a batch of file changes as one change group.
    pub fn apply_changes(&self, changes: &[FileChange], group_id: Option<&str>) -> ApplyResult {
        self.apply(changes, group_id, None)
    }

    /// Apply a batch and, when it succeeds, link the group to a
    /// conversation checkpoint.
    pub fn apply_changes_with_conversation(
        &self,
        changes: &[FileChange],
        link: &ConversationLink,
        group_id: Option<&str>,
    ) -> ApplyResult {
        self.apply(changes, group_id, Some(link))
    }

    fn apply(
        &self,
        changes: &[FileChange],
        group_id: Option<&str>,
        link: Option<&ConversationLink>,
    ) -> ApplyResult {
        if changes.is_empty() {
            return ApplyResult::failure("No file changes supplied");
        }

        let group_id = group_id
            .filter(|g| !g.trim().is_empty())
            .map(String::from)
            .unwrap_or_else(generate_id);
        let mut result = ApplyResult {
            group_id: Some(group_id.clone()),
            ..Default::default()
        };

        for change in changes {
            match self.apply_one(change, &group_id) {
                Ok(record) => {
                    result.change_ids.push(record.change_id);
                    result.changed_files.push(record.file_path);
                }
                Err(e) => {
                    log::warn!("Failed to apply change to {}: {}", change.file_path, e);
                    result.errors.insert(change.file_path.clone(), e.to_string());
                }
            }
        }

        result.success = match self.config.apply_success_policy {
            ApplySuccessPolicy::AllFiles => result.errors.is_empty(),
            ApplySuccessPolicy::AnyFile => !result.change_ids.is_empty(),
        };

        if result.success
            && let Some(link) = link
        {
            let checkpoint = ConversationCheckpoint::new(group_id.as_str(), link);
            match self.checkpoints.save_checkpoint(&checkpoint) {
                Ok(()) => result.checkpoint_id = Some(checkpoint.checkpoint_id),
                Err(e) => {
                    log::warn!("Failed to save checkpoint for group {}: {}", group_id, e);
                    result
                        .errors
                        .insert(CHECKPOINT_ERROR_KEY.to_string(), e.to_string());
                }
            }
        }

        result.message = format!(
            "Applied {}/{} file changes in group {}",
            result.change_ids.len(),
            changes.len(),
            group_id
        );
        log::info!("{}", result.message);
        result
    }

    /// Back up, write, then record one file. On a failed record the write is
    /// reverted so no untracked change is left behind.
    fn apply_one(&self, change: &FileChange, group_id: &str) -> Result<ChangeRecord> {
        let path = self.resolve(&change.file_path)?;
        let exists = path.is_file();
        if path.is_dir() {
            return Err(Error::invalid_path(format!("{} is a directory", path.display())));
        }
        if change.is_new && exists {
            log::debug!("{} marked new but exists; backing it up", path.display());
        }

        let backup_id = if exists {
            Some(self.backups.backup_file(&path)?)
        } else {
            None
        };

        let written = if change.is_deletion {
            if !exists {
                return Err(Error::file_not_found(&path));
            }
            fs::remove_file(&path).map_err(Error::io)
        } else {
            write_atomic(&path, change.content.as_bytes())
        };
        if let Err(e) = written {
            self.discard_backup(backup_id.as_deref());
            return Err(e);
        }

        let mut record = ChangeRecord::new(
            Self::record_key(&path),
            backup_id.clone(),
            !exists,
            change.is_deletion,
            Some(group_id.to_string()),
        );
        match self.changes.save_change(&mut record) {
            Ok(evicted) => {
                for old in evicted {
                    self.discard_backup(old.backup_id.as_deref());
                }
            }
            Err(e) => {
                self.revert_write(&path, backup_id.as_deref());
                return Err(e);
            }
        }

        log::debug!(
            "{} {} (change {})",
            if change.is_deletion { "Deleted" } else { "Wrote" },
            path.display(),
            record.change_id
        );
        Ok(record)
    }

    fn revert_write(&self, path: &Path, backup_id: Option<&str>) {
        let reverted = match backup_id {
            Some(id) => self.backups.restore_file(path, id),
            None => remove_if_exists(path).is_ok(),
        };
        if !reverted {
            log::warn!("Could not revert untracked write to {}", path.display());
        }
        self.discard_backup(backup_id);
    }

    fn discard_backup(&self, backup_id: Option<&str>) {
        if let Some(id) = backup_id
            && let Err(e) = self.backups.delete_backup(id)
        {
            log::warn!("Failed to delete backup {}: {}", id, e);
        }
    }

    // ==================== Undo ====================

    /// Undo one change: restore the prior bytes (or remove a file the change
    /// created), then delete the record.
    pub fn undo_change(&self, change_id: &str) -> UndoResult {
        match self.changes.get_change(change_id) {
            Ok(Some(record)) => self.undo_records(vec![record]),
            Ok(None) => {
                UndoResult::failure(Error::not_found(format!("change {}", change_id)).to_string())
            }
            Err(e) => UndoResult::failure(format!("Failed to load change {}: {}", change_id, e)),
        }
    }

    /// Undo every change of a group, newest first.
    pub fn undo_change_group(&self, group_id: &str) -> UndoResult {
        match self.changes.get_changes_by_group(group_id) {
            Ok(mut records) if !records.is_empty() => {
                records.sort_by_key(|r| std::cmp::Reverse(r.order_key()));
                self.undo_records(records)
            }
            Ok(_) => UndoResult::failure(format!("No changes found for group {}", group_id)),
            Err(e) => UndoResult::failure(format!("Failed to load group {}: {}", group_id, e)),
        }
    }

    /// Return to the state right after change `version_id`: every later
    /// change is undone, newest first. The target itself is kept.
    pub fn undo_to_version(&self, version_id: &str) -> UndoResult {
        let target = match self.changes.get_change(version_id) {
            Ok(Some(target)) => target,
            Ok(None) => {
                return UndoResult::failure(
                    Error::not_found(format!("version {}", version_id)).to_string(),
                );
            }
            Err(e) => {
                return UndoResult::failure(format!("Failed to load version {}: {}", version_id, e));
            }
        };

        match self.changes.get_changes_after(&target) {
            Ok(records) if records.is_empty() => UndoResult {
                success: true,
                message: format!("Already at version {}", version_id),
                ..Default::default()
            },
            Ok(records) => self.undo_records(records),
            Err(e) => UndoResult::failure(format!("Failed to list changes: {}", e)),
        }
    }

    /// Undo the most recent change's whole group, or just that change when
    /// it has no group.
    pub fn undo_last_change(&self) -> UndoResult {
        let latest = match self.changes.get_latest_changes(1) {
            Ok(mut latest) => latest.pop(),
            Err(e) => return UndoResult::failure(format!("Failed to list changes: {}", e)),
        };

        match latest {
            None => UndoResult::failure("No changes to undo"),
            Some(record) => match &record.group_id {
                Some(group_id) => self.undo_change_group(group_id),
                None => self.undo_records(vec![record]),
            },
        }
    }

    /// Roll back to the end of the turn that produced `message_id`.
    ///
    /// Finds the newest checkpoint whose first or last message id matches
    /// (restricted to `conversation_id` when given) and undoes every change
    /// stamped after it, newest first. The checkpoint's own group is kept.
    pub fn rollback_to_message(
        &self,
        message_id: &str,
        conversation_id: Option<&str>,
    ) -> (UndoResult, Option<ConversationCheckpoint>) {
        let checkpoint = match self.checkpoints.find_by_message(message_id, conversation_id) {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) => {
                return (
                    UndoResult::failure(format!(
                        "No checkpoint found for message {}",
                        message_id
                    )),
                    None,
                );
            }
            Err(e) => {
                return (
                    UndoResult::failure(format!("Failed to search checkpoints: {}", e)),
                    None,
                );
            }
        };

        let records = match self.changes.get_changes_since(checkpoint.timestamp) {
            Ok(records) => records,
            Err(e) => {
                return (
                    UndoResult::failure(format!("Failed to list changes: {}", e)),
                    Some(checkpoint),
                );
            }
        };

        if records.is_empty() {
            let result = UndoResult {
                success: true,
                message: format!("Nothing to roll back after message {}", message_id),
                ..Default::default()
            };
            return (result, Some(checkpoint));
        }

        log::info!(
            "Rolling back {} change(s) to message {} (group {})",
            records.len(),
            message_id,
            checkpoint.group_id
        );
        (self.undo_records(records), Some(checkpoint))
    }

    /// Undo `records` in the given order, collecting per-file failures.
    fn undo_records(&self, records: Vec<ChangeRecord>) -> UndoResult {
        let total = records.len();
        let mut result = UndoResult::default();

        for record in records {
            match self.undo_record(&record) {
                Ok(()) => {
                    result.restored_files.push(record.file_path.clone());
                    result.undone_change_ids.push(record.change_id.clone());
                }
                Err(e) => {
                    log::warn!("Failed to undo change {}: {}", record.change_id, e);
                    result.errors.insert(record.file_path.clone(), e.to_string());
                }
            }
        }

        result.success = result.errors.is_empty();
        result.message = format!(
            "Undid {}/{} change(s)",
            result.undone_change_ids.len(),
            total
        );
        log::info!("{}", result.message);
        result
    }

    fn undo_record(&self, record: &ChangeRecord) -> Result<()> {
        let path = PathBuf::from(&record.file_path);

        if record.is_new {
            remove_if_exists(&path)?;
        } else {
            let backup_id = record
                .backup_id
                .as_deref()
                .ok_or_else(|| Error::backup_missing("<none>", &path))?;
            if !self.backups.restore_file(&path, backup_id) {
                return Err(Error::backup_missing(backup_id, &path));
            }
        }

        self.changes.delete_change(&record.change_id)?;
        self.discard_backup(record.backup_id.as_deref());

        if let Some(group_id) = &record.group_id {
            self.drop_checkpoint_if_group_empty(group_id);
        }
        log::debug!("Undid change {} on {}", record.change_id, record.file_path);
        Ok(())
    }

    fn drop_checkpoint_if_group_empty(&self, group_id: &str) {
        match self.changes.get_changes_by_group(group_id) {
            Ok(remaining) if remaining.is_empty() => {
                let checkpoint_id = checkpoint_id_for_group(group_id);
                if let Err(e) = self.checkpoints.delete_checkpoint(&checkpoint_id) {
                    log::warn!("Failed to delete checkpoint {}: {}", checkpoint_id, e);
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("Failed to inspect group {}: {}", group_id, e),
        }
    }

    // ==================== History ====================

    /// Change history of one file, newest first.
    pub fn get_change_history(
        &self,
        file_path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChangeRecord>> {
        let path = self.resolve(file_path)?;
        self.changes
            .get_changes_by_file(&Self::record_key(&path), limit)
    }

    /// Change groups, most recent first.
    pub fn get_change_groups(&self, limit: Option<usize>) -> Result<Vec<ChangeGroupSummary>> {
        self.changes.get_change_groups(limit)
    }

    /// Versions that [`undo_to_version`](Self::undo_to_version) accepts,
    /// newest first.
    pub fn get_available_versions(&self, limit: usize) -> Result<Vec<ChangeRecord>> {
        self.changes.get_latest_changes(limit)
    }
}
