//! Exact, whole-line search/replace.

use crate::lines::{find_line_match, prepend, preview, split_lines, split_lines_inclusive};
use crate::strategy::{ReplaceStrategy, block_error};
use serde_json::{Value, json};
use turboedit_core::{EditBlock, Error, ReplaceResult, Result, StrategyKind};

/// Replaces blocks whose search text matches whole lines of the content
/// exactly, whitespace included. A match inside a line never counts.
#[derive(Debug, Clone, Default)]
pub struct StringReplacer;

/// Where a block landed, as 1-based inclusive line numbers in the content
/// it was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl StringReplacer {
    pub fn new() -> Self {
        Self
    }

    /// Apply one block to `content`, returning the new content and the
    /// replaced line span. `index` is the 1-based block number used in
    /// diagnostics.
    pub fn apply_block(
        &self,
        content: &str,
        block: &EditBlock,
        index: usize,
    ) -> Result<(String, LineSpan)> {
        if block.is_insert() {
            return Ok((prepend(content, &block.replace_text), LineSpan { start: 1, end: 1 }));
        }

        let lines = split_lines_inclusive(content);
        let needle = split_lines(&block.search_text);
        let start = find_line_match(&lines, &needle)
            .ok_or_else(|| Error::match_not_found(index, Self::miss_reason(content, block)))?;
        let end = start + needle.len();

        let mut replacement = block.replace_text.clone();
        let last_terminated = lines[end - 1].ends_with('\n');
        if last_terminated && !replacement.is_empty() && !replacement.ends_with('\n') {
            replacement.push('\n');
        }

        let prefix_len: usize = lines[..start].iter().map(|l| l.len()).sum();
        let matched_len: usize = lines[start..end].iter().map(|l| l.len()).sum();

        let mut out = String::with_capacity(content.len() + replacement.len());
        out.push_str(&content[..prefix_len]);
        out.push_str(&replacement);
        out.push_str(&content[prefix_len + matched_len..]);

        Ok((
            out,
            LineSpan {
                start: start + 1,
                end,
            },
        ))
    }

    fn miss_reason(content: &str, block: &EditBlock) -> String {
        let head = preview(&block.search_text, 80);
        if content.contains(block.search_text.trim_end_matches('\n')) {
            format!(
                "no exact line match (text occurs inside a line, not on whole-line boundaries): {:?}",
                head
            )
        } else {
            format!("no exact line match for search text starting with {:?}", head)
        }
    }
}

impl ReplaceStrategy for StringReplacer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::String
    }

    fn can_handle(&self, _content: &str, _blocks: &[EditBlock]) -> bool {
        true
    }

    fn replace(&self, content: &str, blocks: &[EditBlock]) -> ReplaceResult {
        let mut current = content.to_string();
        let mut applied = 0;
        let mut errors = Vec::new();
        let mut reports: Vec<Value> = Vec::with_capacity(blocks.len());

        for (idx, block) in blocks.iter().enumerate() {
            let index = idx + 1;
            if let Err(e) = block.validate() {
                errors.push(block_error(index, &e));
                reports.push(json!({ "block": index, "applied": false }));
                continue;
            }
            match self.apply_block(&current, block, index) {
                Ok((next, span)) => {
                    log::debug!(
                        "string: block {} applied at lines {}-{}",
                        index,
                        span.start,
                        span.end
                    );
                    current = next;
                    applied += 1;
                    reports.push(json!({
                        "block": index,
                        "applied": true,
                        "insert": block.is_insert(),
                        "start_line": span.start,
                        "end_line": span.end,
                    }));
                }
                Err(e) => {
                    log::debug!("string: block {} failed: {}", index, e);
                    errors.push(block_error(index, &e));
                    reports.push(json!({ "block": index, "applied": false }));
                }
            }
        }

        ReplaceResult::from_outcome(current, applied, blocks.len(), errors)
            .with_metadata("strategy", StrategyKind::String.as_str())
            .with_metadata("blocks", reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(content: &str, blocks: &[EditBlock]) -> ReplaceResult {
        StringReplacer::new().replace(content, blocks)
    }

    #[test]
    fn test_single_line_keeps_trailing_newline() {
        let result = replace(
            "Hello world\n",
            &[EditBlock::new("Hello world", "Hello AutoCoder")],
        );
        assert!(result.success);
        assert_eq!(result.applied_count, 1);
        assert_eq!(result.new_content.as_deref(), Some("Hello AutoCoder\n"));
        assert_eq!(result.strategy(), Some("string"));
    }

    #[test]
    fn test_insert_at_head() {
        let result = replace("a\nb\nc\n", &[EditBlock::insert("HEADER")]);
        assert_eq!(result.new_content.as_deref(), Some("HEADER\na\nb\nc\n"));
    }

    #[test]
    fn test_multi_line_block() {
        let content = "fn a() {\n    1\n}\n\nfn b() {\n    2\n}\n";
        let result = replace(
            content,
            &[EditBlock::new("fn b() {\n    2\n}", "fn b() {\n    3\n}")],
        );
        assert_eq!(
            result.new_content.as_deref(),
            Some("fn a() {\n    1\n}\n\nfn b() {\n    3\n}\n")
        );
    }

    #[test]
    fn test_never_matches_inside_line() {
        let result = replace("let value = 1;\n", &[EditBlock::new("value", "other")]);
        assert!(!result.success);
        assert!(result.new_content.is_none());
        assert!(result.errors[0].contains("inside a line"));
    }

    #[test]
    fn test_whitespace_exact() {
        let result = replace("    indented\n", &[EditBlock::new("indented", "x")]);
        assert!(!result.success);
    }

    #[test]
    fn test_only_first_match_replaced() {
        let result = replace("dup\nmid\ndup\n", &[EditBlock::new("dup", "one")]);
        assert_eq!(result.new_content.as_deref(), Some("one\nmid\ndup\n"));
    }

    #[test]
    fn test_empty_replacement_deletes_lines() {
        let result = replace("a\nb\nc\n", &[EditBlock::new("b", "")]);
        assert_eq!(result.new_content.as_deref(), Some("a\nc\n"));
    }

    #[test]
    fn test_last_line_without_newline() {
        let result = replace("a\nb", &[EditBlock::new("b", "c")]);
        assert_eq!(result.new_content.as_deref(), Some("a\nc"));
    }

    #[test]
    fn test_best_effort_continues_after_failure() {
        let result = replace(
            "one\ntwo\nthree\n",
            &[
                EditBlock::new("missing", "x"),
                EditBlock::new("three", "3"),
            ],
        );
        assert!(!result.success);
        assert_eq!(result.applied_count, 1);
        assert_eq!(result.total_count, 2);
        assert_eq!(result.new_content.as_deref(), Some("one\ntwo\n3\n"));
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Block 1"));
    }

    #[test]
    fn test_blocks_apply_to_running_content() {
        let result = replace(
            "a\n",
            &[EditBlock::new("a", "b"), EditBlock::new("b", "c")],
        );
        assert_eq!(result.new_content.as_deref(), Some("c\n"));
    }

    #[test]
    fn test_changes_stay_inside_matched_range() {
        let content = "keep1\nkeep2\ntarget\nkeep3\n";
        let result = replace(content, &[EditBlock::new("target", "changed\nlines")]);
        let new = result.new_content.unwrap();
        assert!(new.starts_with("keep1\nkeep2\n"));
        assert!(new.ends_with("keep3\n"));
        assert_eq!(new, "keep1\nkeep2\nchanged\nlines\nkeep3\n");
    }

    #[test]
    fn test_metadata_reports_line_span() {
        let result = replace("a\nb\nc\n", &[EditBlock::new("b\nc", "x")]);
        let blocks = result.metadata["blocks"].as_array().unwrap();
        assert_eq!(blocks[0]["start_line"], 2);
        assert_eq!(blocks[0]["end_line"], 3);
    }
}
