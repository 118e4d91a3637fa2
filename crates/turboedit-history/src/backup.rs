//! Snapshots of file bytes taken before a destructive write.
//!
//! Layout under the backup directory:
//!
//! ```text
//! backups/
//!   <backup_id>.bak    raw bytes of the file at backup time
//!   <backup_id>.json   BackupEntry (original path, size, checksum)
//! ```

use crate::atomic::{check_record_id, read_json, read_json_dir, remove_if_exists, write_atomic, write_json};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use turboedit_core::{BackupEntry, Error, Result, compute_hash, generate_id};

/// Stores and restores file snapshots.
#[derive(Debug, Clone)]
pub struct FileBackupManager {
    backup_dir: PathBuf,
    verify_checksums: bool,
}

impl FileBackupManager {
    /// Open (creating if needed) a backup directory.
    pub fn new(backup_dir: impl Into<PathBuf>, verify_checksums: bool) -> Result<Self> {
        let backup_dir = backup_dir.into();
        fs::create_dir_all(&backup_dir).map_err(Error::io)?;
        Ok(Self {
            backup_dir,
            verify_checksums,
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn data_path(&self, backup_id: &str) -> PathBuf {
        self.backup_dir.join(format!("{}.bak", backup_id))
    }

    fn entry_path(&self, backup_id: &str) -> PathBuf {
        self.backup_dir.join(format!("{}.json", backup_id))
    }

    /// Snapshot an existing file and return the new backup id.
    pub fn backup_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(Error::file_not_found(path));
        }
        let bytes = fs::read(path).map_err(Error::io)?;
        let backup_id = generate_id();

        write_atomic(&self.data_path(&backup_id), &bytes)?;
        let entry = BackupEntry {
            backup_id: backup_id.clone(),
            original_path: path.to_string_lossy().into_owned(),
            created_at: Utc::now(),
            size: bytes.len() as u64,
            checksum: compute_hash(&bytes),
        };
        if let Err(e) = write_json(&self.entry_path(&backup_id), &entry) {
            let _ = remove_if_exists(&self.data_path(&backup_id));
            return Err(e);
        }

        log::debug!("Backed up {} as {}", path.display(), backup_id);
        Ok(backup_id)
    }

    /// Write backup `backup_id` back to `path`. Never fails outright: any
    /// problem is logged and reported as `false`.
    pub fn restore_file(&self, path: &Path, backup_id: &str) -> bool {
        match self.try_restore(path, backup_id) {
            Ok(()) => {
                log::debug!("Restored {} from {}", path.display(), backup_id);
                true
            }
            Err(e) => {
                log::warn!("Failed to restore {} from {}: {}", path.display(), backup_id, e);
                false
            }
        }
    }

    /// Restore a batch; one failure does not stop the rest.
    pub fn restore_files(&self, batch: &[(PathBuf, String)]) -> BTreeMap<PathBuf, bool> {
        batch
            .iter()
            .map(|(path, backup_id)| (path.clone(), self.restore_file(path, backup_id)))
            .collect()
    }

    fn try_restore(&self, path: &Path, backup_id: &str) -> Result<()> {
        let entry = self
            .get_backup(backup_id)?
            .ok_or_else(|| Error::backup_missing(backup_id, path))?;

        let bytes = match fs::read(self.data_path(backup_id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::backup_missing(backup_id, path));
            }
            Err(e) => return Err(Error::io(e)),
        };

        if self.verify_checksums && compute_hash(&bytes) != entry.checksum {
            return Err(Error::validation_error(format!(
                "checksum mismatch for backup {}",
                backup_id
            )));
        }

        write_atomic(path, &bytes)
    }

    /// Metadata of one backup
    pub fn get_backup(&self, backup_id: &str) -> Result<Option<BackupEntry>> {
        check_record_id(backup_id)?;
        read_json(&self.entry_path(backup_id))
    }

    /// Remove a backup's bytes and metadata. Returns whether anything existed.
    pub fn delete_backup(&self, backup_id: &str) -> Result<bool> {
        check_record_id(backup_id)?;
        let data = remove_if_exists(&self.data_path(backup_id))?;
        let entry = remove_if_exists(&self.entry_path(backup_id))?;
        Ok(data || entry)
    }

    /// All backups, oldest first
    pub fn list_backups(&self) -> Result<Vec<BackupEntry>> {
        let mut entries: Vec<BackupEntry> = read_json_dir(&self.backup_dir)?;
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_backups() -> (FileBackupManager, TempDir, TempDir) {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let manager = FileBackupManager::new(store.path().join("backups"), true).unwrap();
        (manager, store, work)
    }

    #[test]
    fn test_backup_and_restore() {
        let (manager, _store, work) = create_test_backups();
        let file = work.path().join("main.rs");
        fs::write(&file, "fn main() {}\n").unwrap();

        let id = manager.backup_file(&file).unwrap();
        fs::write(&file, "changed").unwrap();

        assert!(manager.restore_file(&file, &id));
        assert_eq!(fs::read_to_string(&file).unwrap(), "fn main() {}\n");

        let entry = manager.get_backup(&id).unwrap().unwrap();
        assert_eq!(entry.size, 13);
        assert_eq!(entry.checksum, compute_hash(b"fn main() {}\n"));
    }

    #[test]
    fn test_backup_missing_file_is_error() {
        let (manager, _store, work) = create_test_backups();
        let err = manager.backup_file(&work.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_restore_recreates_deleted_file() {
        let (manager, _store, work) = create_test_backups();
        let file = work.path().join("dir/lib.rs");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "pub mod a;").unwrap();
        let id = manager.backup_file(&file).unwrap();
        fs::remove_dir_all(work.path().join("dir")).unwrap();

        assert!(manager.restore_file(&file, &id));
        assert_eq!(fs::read_to_string(&file).unwrap(), "pub mod a;");
    }

    #[test]
    fn test_restore_unknown_backup_returns_false() {
        let (manager, _store, work) = create_test_backups();
        assert!(!manager.restore_file(&work.path().join("a"), "deadbeef"));
        assert!(!manager.restore_file(&work.path().join("a"), "../escape"));
    }

    #[test]
    fn test_checksum_mismatch_refuses_restore() {
        let (manager, _store, work) = create_test_backups();
        let file = work.path().join("a.txt");
        fs::write(&file, "original").unwrap();
        let id = manager.backup_file(&file).unwrap();
        fs::write(manager.data_path(&id), "tampered").unwrap();
        fs::write(&file, "current").unwrap();

        assert!(!manager.restore_file(&file, &id));
        assert_eq!(fs::read_to_string(&file).unwrap(), "current");

        let lenient = FileBackupManager::new(manager.backup_dir(), false).unwrap();
        assert!(lenient.restore_file(&file, &id));
        assert_eq!(fs::read_to_string(&file).unwrap(), "tampered");
    }

    #[test]
    fn test_restore_files_batch_aggregates() {
        let (manager, _store, work) = create_test_backups();
        let good = work.path().join("good.txt");
        fs::write(&good, "good").unwrap();
        let id = manager.backup_file(&good).unwrap();
        fs::write(&good, "bad").unwrap();
        let other = work.path().join("other.txt");

        let results = manager.restore_files(&[
            (good.clone(), id),
            (other.clone(), "missing".to_string()),
        ]);
        assert!(results[&good]);
        assert!(!results[&other]);
        assert_eq!(fs::read_to_string(&good).unwrap(), "good");
    }

    #[test]
    fn test_list_and_delete() {
        let (manager, _store, work) = create_test_backups();
        let file = work.path().join("x.txt");
        fs::write(&file, "1").unwrap();
        let first = manager.backup_file(&file).unwrap();
        fs::write(&file, "2").unwrap();
        let second = manager.backup_file(&file).unwrap();

        let listed: Vec<String> = manager
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|e| e.backup_id)
            .collect();
        assert_eq!(listed, vec![first.clone(), second.clone()]);

        assert!(manager.delete_backup(&first).unwrap());
        assert!(!manager.delete_backup(&first).unwrap());
        assert!(manager.get_backup(&first).unwrap().is_none());
        assert_eq!(manager.list_backups().unwrap().len(), 1);
    }
}
