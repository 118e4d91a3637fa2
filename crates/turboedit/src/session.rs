//! Edit sessions: resolve edit blocks against files on disk and write the
//! result as a tracked, undoable change.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use turboedit_core::{
    ApplyResult, ConfigProfile, ConversationLink, EditBlock, EditorConfig, FileChange,
    ReplaceResult, Result, StrategyKind,
};
use turboedit_history::FileChangeManager;
use turboedit_replace::{SearchReplaceManager, generate_unified_diff};

/// How blocks are resolved into content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// Walk the configured fallback order
    #[default]
    Fallback,
    /// Walk a caller-supplied order
    FallbackWith(Vec<StrategyKind>),
    /// Use exactly one strategy
    Strategy(StrategyKind),
}

/// Edit blocks aimed at one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    pub file_path: String,
    pub blocks: Vec<EditBlock>,
}

impl FileEdit {
    pub fn new(file_path: impl Into<String>, blocks: Vec<EditBlock>) -> Self {
        Self {
            file_path: file_path.into(),
            blocks,
        }
    }
}

/// Resolution of one [`FileEdit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEdit {
    pub file_path: String,
    /// The file did not exist; content was resolved against ""
    pub is_new: bool,
    pub original: String,
    pub replace: ReplaceResult,
}

impl ResolvedEdit {
    /// Unified diff of what this edit would write; empty when nothing
    /// resolved.
    pub fn diff(&self) -> String {
        match &self.replace.new_content {
            Some(new) => generate_unified_diff(&self.original, new),
            None => String::new(),
        }
    }
}

/// Outcome of [`EditSession::apply_edits`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditOutcome {
    pub success: bool,
    pub edits: Vec<ResolvedEdit>,
    /// Present only when every edit resolved and a write was attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply: Option<ApplyResult>,
}

impl EditOutcome {
    /// Text to feed back to the proposing model for every edit that failed
    /// to resolve.
    pub fn feedback(&self) -> String {
        self.edits
            .iter()
            .filter(|e| !e.replace.success)
            .map(|e| format!("{}:\n{}", e.file_path, e.replace.to_prompt_feedback()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A search/replace manager and a change manager sharing one configuration.
#[derive(Debug)]
pub struct EditSession {
    replacer: SearchReplaceManager,
    history: FileChangeManager,
}

impl EditSession {
    pub fn new(config: EditorConfig) -> Result<Self> {
        let replacer = SearchReplaceManager::from_config(&config);
        let history = FileChangeManager::new(config)?;
        Ok(Self { replacer, history })
    }

    /// Session rooted at `project_root` with the given profile.
    pub fn with_profile(profile: ConfigProfile, project_root: impl Into<PathBuf>) -> Result<Self> {
        Self::new(profile.create_config(project_root))
    }

    pub fn replacer(&self) -> &SearchReplaceManager {
        &self.replacer
    }

    pub fn history(&self) -> &FileChangeManager {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        self.history.config()
    }

    /// Resolve `edit` against the current file content without writing.
    /// A missing file resolves against empty content.
    pub fn resolve(&self, edit: &FileEdit, mode: &ReplaceMode) -> ResolvedEdit {
        let (original, is_new) = match self.read_current(&edit.file_path) {
            Ok(found) => found,
            Err(e) => {
                return ResolvedEdit {
                    file_path: edit.file_path.clone(),
                    is_new: false,
                    original: String::new(),
                    replace: ReplaceResult::failure(
                        format!("Failed to read {}: {}", edit.file_path, e),
                        edit.blocks.len(),
                    ),
                };
            }
        };

        let replace = match mode {
            ReplaceMode::Fallback => {
                self.replacer.replace_with_fallback(&original, &edit.blocks, None)
            }
            ReplaceMode::FallbackWith(order) => {
                self.replacer
                    .replace_with_fallback(&original, &edit.blocks, Some(order.as_slice()))
            }
            ReplaceMode::Strategy(kind) => {
                self.replacer.replace(&original, &edit.blocks, Some(*kind))
            }
        };

        ResolvedEdit {
            file_path: edit.file_path.clone(),
            is_new,
            original,
            replace,
        }
    }

    fn read_current(&self, file_path: &str) -> Result<(String, bool)> {
        let path = self.history.resolve(file_path)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok((content, false)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok((String::new(), true)),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve blocks for one file and write the result as its own change
    /// group.
    pub fn apply_blocks(
        &self,
        file_path: &str,
        blocks: &[EditBlock],
        mode: &ReplaceMode,
        link: Option<&ConversationLink>,
    ) -> EditOutcome {
        self.apply_edits(&[FileEdit::new(file_path, blocks.to_vec())], mode, link)
    }

    /// Resolve every edit, then write all of them as one change group.
    ///
    /// Nothing is written unless every edit resolves fully, so a group
    /// never contains half of a multi-file edit.
    pub fn apply_edits(
        &self,
        edits: &[FileEdit],
        mode: &ReplaceMode,
        link: Option<&ConversationLink>,
    ) -> EditOutcome {
        let resolved: Vec<ResolvedEdit> = edits.iter().map(|e| self.resolve(e, mode)).collect();

        if resolved.is_empty() || resolved.iter().any(|r| !r.replace.success) {
            let failed = resolved.iter().filter(|r| !r.replace.success).count();
            log::info!("{} of {} edit(s) did not resolve; nothing written", failed, resolved.len());
            return EditOutcome {
                success: false,
                edits: resolved,
                apply: None,
            };
        }

        let changes: Vec<FileChange> = resolved
            .iter()
            .filter_map(|r| {
                let content = r.replace.new_content.clone()?;
                Some(if r.is_new {
                    FileChange::create(&r.file_path, content)
                } else {
                    FileChange::write(&r.file_path, content)
                })
            })
            .collect();

        let apply = match link {
            Some(link) => self.history.apply_changes_with_conversation(&changes, link, None),
            None => self.history.apply_changes(&changes, None),
        };

        EditOutcome {
            success: apply.success,
            edits: resolved,
            apply: Some(apply),
        }
    }

    /// Replace a file's whole content as a tracked change.
    pub fn write_file(
        &self,
        file_path: &str,
        content: &str,
        link: Option<&ConversationLink>,
    ) -> ApplyResult {
        let change = [FileChange::write(file_path, content)];
        match link {
            Some(link) => self.history.apply_changes_with_conversation(&change, link, None),
            None => self.history.apply_changes(&change, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_session() -> (EditSession, TempDir) {
        let temp = TempDir::new().unwrap();
        let session = EditSession::with_profile(ConfigProfile::Default, temp.path()).unwrap();
        (session, temp)
    }

    #[test]
    fn test_apply_blocks_writes_and_records() {
        let (session, temp) = create_test_session();
        fs::write(temp.path().join("a.txt"), "Hello world\n").unwrap();

        let outcome = session.apply_blocks(
            "a.txt",
            &[EditBlock::new("Hello world", "Hello AutoCoder")],
            &ReplaceMode::default(),
            None,
        );
        assert!(outcome.success);
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "Hello AutoCoder\n");
        assert_eq!(outcome.apply.unwrap().change_ids.len(), 1);
    }

    #[test]
    fn test_missing_file_resolves_as_new() {
        let (session, temp) = create_test_session();
        let outcome = session.apply_blocks(
            "src/new.rs",
            &[EditBlock::insert("fn main() {}")],
            &ReplaceMode::Strategy(StrategyKind::String),
            None,
        );
        assert!(outcome.success);
        assert!(outcome.edits[0].is_new);
        assert_eq!(
            fs::read_to_string(temp.path().join("src/new.rs")).unwrap(),
            "fn main() {}\n"
        );

        assert!(session.history().undo_last_change().success);
        assert!(!temp.path().join("src/new.rs").exists());
    }

    #[test]
    fn test_unresolved_edit_writes_nothing() {
        let (session, temp) = create_test_session();
        fs::write(temp.path().join("a.txt"), "one\n").unwrap();
        fs::write(temp.path().join("b.txt"), "two\n").unwrap();

        let outcome = session.apply_edits(
            &[
                FileEdit::new("a.txt", vec![EditBlock::new("one", "1")]),
                FileEdit::new("b.txt", vec![EditBlock::new("absent line", "2")]),
            ],
            &ReplaceMode::default(),
            None,
        );
        assert!(!outcome.success);
        assert!(outcome.apply.is_none());
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "one\n");
        assert!(outcome.feedback().starts_with("b.txt:"));
        assert_eq!(session.history().change_store().count().unwrap(), 0);
    }

    #[test]
    fn test_multi_file_edit_is_one_group() {
        let (session, temp) = create_test_session();
        fs::write(temp.path().join("a.txt"), "one\n").unwrap();
        fs::write(temp.path().join("b.txt"), "two\n").unwrap();

        let outcome = session.apply_edits(
            &[
                FileEdit::new("a.txt", vec![EditBlock::new("one", "1")]),
                FileEdit::new("b.txt", vec![EditBlock::new("two", "2")]),
            ],
            &ReplaceMode::default(),
            None,
        );
        assert!(outcome.success);
        assert_eq!(outcome.edits[0].diff().lines().filter(|l| l.starts_with('+')).count(), 2);

        let undo = session.history().undo_last_change();
        assert_eq!(undo.undone_change_ids.len(), 2);
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(temp.path().join("b.txt")).unwrap(), "two\n");
    }

    #[test]
    fn test_write_file_with_conversation() {
        let (session, _temp) = create_test_session();
        let link = ConversationLink::new("conv").with_last_message("m1");
        let result = session.write_file("notes.md", "# Notes\n", Some(&link));
        assert!(result.success);
        assert!(result.checkpoint_id.is_some());

        let (undo, checkpoint) = session.history().rollback_to_message("m1", None);
        assert!(undo.success);
        assert!(checkpoint.is_some());
    }

    #[test]
    fn test_lenient_profile_accepts_near_match() {
        let content = "def greet():\n    print('hello world')\n";
        // ~0.98 similar: below the default 0.99, above lenient's 0.8
        let blocks = [EditBlock::new("    print('hello wrld')", "    print('hi')")];

        let (default_session, default_temp) = create_test_session();
        fs::write(default_temp.path().join("g.py"), content).unwrap();
        let outcome =
            default_session.apply_blocks("g.py", &blocks, &ReplaceMode::default(), None);
        assert!(!outcome.success);

        let temp = TempDir::new().unwrap();
        let session = EditSession::with_profile(ConfigProfile::Lenient, temp.path()).unwrap();
        fs::write(temp.path().join("g.py"), content).unwrap();
        let outcome = session.apply_blocks("g.py", &blocks, &ReplaceMode::default(), None);
        assert!(outcome.success);
        assert_eq!(outcome.edits[0].replace.metadata["used_strategy"], "similarity");
        assert_eq!(
            fs::read_to_string(temp.path().join("g.py")).unwrap(),
            "def greet():\n    print('hi')\n"
        );
    }

    #[test]
    fn test_strict_profile_never_fuzzy() {
        let temp = TempDir::new().unwrap();
        let session = EditSession::with_profile(ConfigProfile::Strict, temp.path()).unwrap();
        fs::write(temp.path().join("a.txt"), "let value = 1;\n").unwrap();

        let outcome = session.apply_blocks(
            "a.txt",
            &[EditBlock::new("let value = 1; ", "let value = 2;")],
            &ReplaceMode::default(),
            None,
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.edits[0].replace.metadata["tried_strategies"],
            serde_json::json!(["string"])
        );
    }
}
