//! History behaviour across manager instances and stores

use std::fs;
use tempfile::TempDir;
use turboedit_history::prelude::*;

fn config_for(temp: &TempDir) -> EditorConfig {
    EditorConfig::builder(temp.path()).build().unwrap()
}

#[test]
fn test_two_file_group_undo() {
    let temp = TempDir::new().unwrap();
    let manager = FileChangeManager::new(config_for(&temp)).unwrap();
    fs::write(temp.path().join("existing.rs"), "old\n").unwrap();

    let result = manager.apply_changes(
        &[
            FileChange::write("existing.rs", "new\n"),
            FileChange::create("nested/created.rs", "fresh\n"),
        ],
        Some("g1"),
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.group_id.as_deref(), Some("g1"));

    let undo = manager.undo_change_group("g1");
    assert!(undo.success, "{:?}", undo.errors);
    assert_eq!(undo.restored_files.len(), 2);
    assert_eq!(fs::read_to_string(temp.path().join("existing.rs")).unwrap(), "old\n");
    assert!(!temp.path().join("nested/created.rs").exists());
    assert!(manager.change_store().get_changes_by_group("g1").unwrap().is_empty());

    let again = manager.undo_change_group("g1");
    assert!(!again.success);
}

#[test]
fn test_history_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let manager = FileChangeManager::new(config_for(&temp)).unwrap();
        manager.apply_changes(&[FileChange::create("a.txt", "v1")], None);
        manager.apply_changes(&[FileChange::write("a.txt", "v2")], None);
    }

    let reopened = FileChangeManager::new(config_for(&temp)).unwrap();
    assert_eq!(reopened.get_change_history("a.txt", None).unwrap().len(), 2);

    assert!(reopened.undo_last_change().success);
    assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "v1");

    // sequence numbering continues where the previous instance stopped
    reopened.apply_changes(&[FileChange::write("a.txt", "v3")], None);
    let history = reopened.get_change_history("a.txt", None).unwrap();
    assert!(history[0].sequence > history[1].sequence);
}

#[test]
fn test_custom_storage_and_checkpoint_dirs() {
    let project = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let config = EditorConfig::builder(project.path())
        .storage_root(storage.path().join("store"))
        .checkpoint_dir(storage.path().join("cps"))
        .build()
        .unwrap();
    let manager = FileChangeManager::new(config).unwrap();

    let link = ConversationLink::new("conv").with_first_message("m1");
    let result = manager.apply_changes_with_conversation(
        &[FileChange::create("x.txt", "x")],
        &link,
        None,
    );
    assert!(result.success);

    let checkpoint_file = storage
        .path()
        .join("cps")
        .join(format!("{}.json", result.checkpoint_id.unwrap()));
    assert!(checkpoint_file.exists());
    assert!(storage.path().join("store/changes").is_dir());
    assert!(!project.path().join(".turboedit").exists());
}

#[test]
fn test_rollback_keeps_matched_turn_and_earlier() {
    let temp = TempDir::new().unwrap();
    let manager = FileChangeManager::new(config_for(&temp)).unwrap();
    let path = temp.path().join("notes.md");

    for (i, msg) in ["m1", "m2", "m3"].iter().enumerate() {
        let link = ConversationLink::new("conv").with_last_message(*msg);
        let change = if i == 0 {
            FileChange::create("notes.md", format!("turn {}", i + 1))
        } else {
            FileChange::write("notes.md", format!("turn {}", i + 1))
        };
        assert!(manager.apply_changes_with_conversation(&[change], &link, None).success);
    }

    let (undo, checkpoint) = manager.rollback_to_message("m2", Some("conv"));
    assert!(undo.success);
    assert_eq!(undo.undone_change_ids.len(), 1);
    assert_eq!(checkpoint.unwrap().last_message_id.as_deref(), Some("m2"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "turn 2");

    let remaining = manager.checkpoint_store().list_checkpoints(Some("conv"), None).unwrap();
    assert_eq!(remaining.len(), 2);
}
