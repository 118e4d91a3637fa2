//! Patch strategy: edit blocks rendered as one synthetic unified diff.
//!
//! Insert blocks are applied first, one by one. The remaining blocks become
//! one hunk each in a single diff, handed to a [`PatchBackend`]. The backend
//! applies the whole hunk set or nothing; on failure every non-insert block
//! is reported as failed while the inserts already applied are kept.

use crate::lines::{find_line_match, prepend, split_lines, split_lines_inclusive};
use crate::strategy::ReplaceStrategy;
use serde_json::json;
use std::sync::Arc;
use turboedit_core::{EditBlock, Error, ReplaceResult, Result, StrategyKind};

/// A unified-diff application library.
pub trait PatchBackend: Send + Sync {
    /// Backend name reported in result metadata
    fn name(&self) -> &'static str;

    /// Apply `unified_diff` to `base`, all hunks or none.
    fn apply(&self, base: &str, unified_diff: &str) -> Result<String>;
}

/// [`PatchBackend`] backed by the `diffy` crate.
#[derive(Debug, Clone, Default)]
pub struct DiffyBackend;

impl PatchBackend for DiffyBackend {
    fn name(&self) -> &'static str {
        "diffy"
    }

    fn apply(&self, base: &str, unified_diff: &str) -> Result<String> {
        let patch = diffy::Patch::from_str(unified_diff)
            .map_err(|e| Error::other(format!("invalid unified diff: {}", e)))?;

        // Hunk lines are newline-terminated, so match against a terminated
        // base and drop the terminator again afterwards.
        let terminated = !base.is_empty() && !base.ends_with('\n');
        let image = if terminated {
            format!("{}\n", base)
        } else {
            base.to_string()
        };

        let patched = diffy::apply(&image, &patch)
            .map_err(|e| Error::other(format!("patch did not apply: {}", e)))?;

        if terminated && let Some(stripped) = patched.strip_suffix('\n') {
            return Ok(stripped.to_string());
        }
        Ok(patched)
    }
}

/// Applies edit blocks through a synthetic unified diff.
#[derive(Clone)]
pub struct PatchReplacer {
    backend: Option<Arc<dyn PatchBackend>>,
}

impl Default for PatchReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatchReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchReplacer")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl PatchReplacer {
    /// Replacer using the diffy backend
    pub fn new() -> Self {
        Self::with_backend(Arc::new(DiffyBackend))
    }

    /// Replacer using a custom backend
    pub fn with_backend(backend: Arc<dyn PatchBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Replacer with no patch library; it reports itself unavailable
    pub fn without_backend() -> Self {
        Self { backend: None }
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Render the non-insert blocks as one unified diff against `content`,
    /// one hunk per block, hunks in file order. Hunk positions come from an
    /// exact line search; a block that is not found is placed after every
    /// located hunk so it cannot collide with one, and the backend is left
    /// to search for it.
    pub fn build_unified_diff(content: &str, blocks: &[&EditBlock]) -> String {
        let lines = split_lines_inclusive(content);
        let mut hunks: Vec<(usize, Vec<&str>, Vec<&str>)> = blocks
            .iter()
            .map(|block| {
                let old_lines = split_lines(&block.search_text);
                let new_lines = split_lines(&block.replace_text);
                let start = find_line_match(&lines, &old_lines).map_or(usize::MAX, |idx| idx + 1);
                (start, old_lines, new_lines)
            })
            .collect();
        hunks.sort_by_key(|(start, _, _)| *start);

        let mut diff = String::from("--- a/content\n+++ b/content\n");
        let mut next_free = 1;
        let mut offset: isize = 0;

        for (start, old_lines, new_lines) in &hunks {
            let old_start = if *start == usize::MAX { next_free } else { *start };
            next_free = next_free.max(old_start + old_lines.len());
            let new_start = (old_start as isize + offset).max(1);
            offset += new_lines.len() as isize - old_lines.len() as isize;

            diff.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                old_start,
                old_lines.len(),
                new_start,
                new_lines.len()
            ));
            for line in old_lines {
                diff.push_str(&format!("-{}\n", line));
            }
            for line in new_lines {
                diff.push_str(&format!("+{}\n", line));
            }
        }

        diff
    }
}

impl ReplaceStrategy for PatchReplacer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Patch
    }

    fn can_handle(&self, _content: &str, _blocks: &[EditBlock]) -> bool {
        self.backend.is_some()
    }

    fn replace(&self, content: &str, blocks: &[EditBlock]) -> ReplaceResult {
        let mut current = content.to_string();
        let mut applied = 0;
        let mut errors = Vec::new();

        for (idx, block) in blocks.iter().enumerate() {
            if let Err(e) = block.validate() {
                errors.push(format!("Block {}: {}", idx + 1, e));
            }
        }
        if !errors.is_empty() {
            return ReplaceResult::from_outcome(current, 0, blocks.len(), errors)
                .with_metadata("strategy", StrategyKind::Patch.as_str());
        }

        for block in blocks.iter().filter(|b| b.is_insert()) {
            current = prepend(&current, &block.replace_text);
            applied += 1;
        }

        let hunk_blocks: Vec<(usize, &EditBlock)> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_insert())
            .map(|(idx, b)| (idx + 1, b))
            .collect();
        let block_numbers: Vec<usize> = hunk_blocks.iter().map(|(n, _)| *n).collect();

        let mut result = if hunk_blocks.is_empty() {
            ReplaceResult::from_outcome(current, applied, blocks.len(), errors)
        } else {
            let hunks: Vec<&EditBlock> = hunk_blocks.iter().map(|(_, b)| *b).collect();
            let diff = Self::build_unified_diff(&current, &hunks);

            let outcome = match &self.backend {
                Some(backend) => backend.apply(&current, &diff),
                None => Err(Error::strategy_unavailable("patch (no patch backend)")),
            };

            let mut result = match outcome {
                Ok(patched) => {
                    log::debug!("patch: applied {} hunks", hunks.len());
                    applied += hunks.len();
                    ReplaceResult::from_outcome(patched, applied, blocks.len(), errors)
                }
                Err(e) => {
                    log::debug!("patch: hunk set rejected: {}", e);
                    let numbers: Vec<String> =
                        block_numbers.iter().map(|n| n.to_string()).collect();
                    errors.push(format!("Blocks {}: {}", numbers.join(", "), e));
                    ReplaceResult::from_outcome(current, applied, blocks.len(), errors)
                }
            };
            result.set_metadata("hunks", hunks.len());
            result.set_metadata("diff", diff);
            result
        };

        result.set_metadata("strategy", StrategyKind::Patch.as_str());
        result.set_metadata("inserts_applied", blocks.iter().filter(|b| b.is_insert()).count());
        result.set_metadata("hunk_blocks", json!(block_numbers));
        if let Some(name) = self.backend_name() {
            result.set_metadata("backend", name);
        }
        result
    }
}
