//! Append-only store of [`ChangeRecord`]s, one JSON file per record.
//!
//! Records are ordered by `(timestamp, sequence)`. The store assigns
//! `sequence` on save, so two records stamped in the same instant still have
//! a strict order. A retention ceiling is enforced on every save by evicting
//! the oldest records; eviction does not care whether a record could still
//! be undone.

use crate::atomic::{check_record_id, read_json, read_json_dir, remove_if_exists, write_json};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use turboedit_core::{ChangeGroupSummary, ChangeRecord, Error, Result};

/// File-backed change record store.
#[derive(Debug)]
pub struct FileChangeStore {
    changes_dir: PathBuf,
    max_records: usize,
    next_sequence: AtomicU64,
}

impl FileChangeStore {
    /// Open (creating if needed) the store. `max_records` is clamped to at
    /// least one.
    pub fn new(changes_dir: impl Into<PathBuf>, max_records: usize) -> Result<Self> {
        let changes_dir = changes_dir.into();
        fs::create_dir_all(&changes_dir).map_err(Error::io)?;

        let records: Vec<ChangeRecord> = read_json_dir(&changes_dir)?;
        let next = records.iter().map(|r| r.sequence).max().map_or(1, |s| s + 1);

        Ok(Self {
            changes_dir,
            max_records: max_records.max(1),
            next_sequence: AtomicU64::new(next),
        })
    }

    pub fn changes_dir(&self) -> &Path {
        &self.changes_dir
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    fn record_path(&self, change_id: &str) -> PathBuf {
        self.changes_dir.join(format!("{}.json", change_id))
    }

    /// Persist `record`, assigning its sequence number, then enforce the
    /// retention ceiling. Returns the records evicted to make room.
    ///
    /// An `Err` means the record was not stored. Eviction runs after the
    /// write and never fails the save; a record that cannot be evicted is
    /// logged and left in place.
    pub fn save_change(&self, record: &mut ChangeRecord) -> Result<Vec<ChangeRecord>> {
        check_record_id(&record.change_id)?;
        record.sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        write_json(&self.record_path(&record.change_id), record)?;
        log::debug!(
            "Saved change {} for {} (seq {})",
            record.change_id,
            record.file_path,
            record.sequence
        );
        Ok(self.enforce_retention())
    }

    fn enforce_retention(&self) -> Vec<ChangeRecord> {
        let records = match self.list_changes() {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Skipping retention check: {}", e);
                return Vec::new();
            }
        };
        if records.len() <= self.max_records {
            return Vec::new();
        }

        let excess = records.len() - self.max_records;
        let mut evicted = Vec::with_capacity(excess);
        for record in records.into_iter().take(excess) {
            if let Err(e) = remove_if_exists(&self.record_path(&record.change_id)) {
                log::warn!("Could not evict change {}: {}", record.change_id, e);
                continue;
            }
            log::warn!(
                "Retention limit {} reached, evicted change {} ({})",
                self.max_records,
                record.change_id,
                record.file_path
            );
            evicted.push(record);
        }
        evicted
    }

    pub fn get_change(&self, change_id: &str) -> Result<Option<ChangeRecord>> {
        check_record_id(change_id)?;
        read_json(&self.record_path(change_id))
    }

    /// All records, oldest first.
    pub fn list_changes(&self) -> Result<Vec<ChangeRecord>> {
        let mut records: Vec<ChangeRecord> = read_json_dir(&self.changes_dir)?;
        records.sort_by_key(ChangeRecord::order_key);
        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.list_changes()?.len())
    }

    /// Records for one file, newest first, at most `limit`.
    pub fn get_changes_by_file(
        &self,
        file_path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChangeRecord>> {
        let mut records: Vec<ChangeRecord> = self
            .list_changes()?
            .into_iter()
            .filter(|r| r.file_path == file_path)
            .collect();
        records.reverse();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Records of one change group. Callers that need an order sort the
    /// result themselves.
    pub fn get_changes_by_group(&self, group_id: &str) -> Result<Vec<ChangeRecord>> {
        Ok(self
            .list_changes()?
            .into_iter()
            .filter(|r| r.group_id.as_deref() == Some(group_id))
            .collect())
    }

    /// The `n` most recent records, newest first.
    pub fn get_latest_changes(&self, n: usize) -> Result<Vec<ChangeRecord>> {
        let mut records = self.list_changes()?;
        records.reverse();
        records.truncate(n);
        Ok(records)
    }

    /// Records ordered strictly after `target`, newest first.
    pub fn get_changes_after(&self, target: &ChangeRecord) -> Result<Vec<ChangeRecord>> {
        let mut records: Vec<ChangeRecord> = self
            .list_changes()?
            .into_iter()
            .filter(|r| r.is_after(target))
            .collect();
        records.reverse();
        Ok(records)
    }

    /// Records stamped strictly after `timestamp`, newest first.
    pub fn get_changes_since(&self, timestamp: DateTime<Utc>) -> Result<Vec<ChangeRecord>> {
        let mut records: Vec<ChangeRecord> = self
            .list_changes()?
            .into_iter()
            .filter(|r| r.timestamp > timestamp)
            .collect();
        records.reverse();
        Ok(records)
    }

    /// Remove a record. Returns whether it existed.
    pub fn delete_change(&self, change_id: &str) -> Result<bool> {
        check_record_id(change_id)?;
        remove_if_exists(&self.record_path(change_id))
    }

    /// One summary per change group, most recently touched first.
    pub fn get_change_groups(&self, limit: Option<usize>) -> Result<Vec<ChangeGroupSummary>> {
        let mut groups: HashMap<String, ChangeGroupSummary> = HashMap::new();
        let mut latest: HashMap<String, (DateTime<Utc>, u64)> = HashMap::new();

        for record in self.list_changes()? {
            let Some(group_id) = record.group_id.clone() else {
                continue;
            };
            let summary = groups
                .entry(group_id.clone())
                .or_insert_with(|| ChangeGroupSummary {
                    group_id: group_id.clone(),
                    timestamp: record.timestamp,
                    change_count: 0,
                    files: Vec::new(),
                });
            summary.change_count += 1;
            summary.timestamp = record.timestamp;
            if !summary.files.contains(&record.file_path) {
                summary.files.push(record.file_path.clone());
            }
            latest.insert(group_id, record.order_key());
        }

        let mut summaries: Vec<ChangeGroupSummary> = groups.into_values().collect();
        summaries.sort_by(|a, b| latest[&b.group_id].cmp(&latest[&a.group_id]));
        if let Some(limit) = limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }
}
