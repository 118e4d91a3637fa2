//! Fuzzy search/replace over line windows.
//!
//! Each block is located with [`TextSimilarity::best_matching_window`]. When
//! the ratio clears the threshold, the window text is located again in the
//! content with a first-occurrence substring search and replaced there. If
//! the same text also appears earlier in the file, that earlier copy is the
//! one edited (or the block is rejected when the copy sits inside a line).
//! This is a known limitation and is kept as is.

use crate::lines::{is_line_boundary, line_of_offset, prepend};
use crate::similarity::{TextSimilarity, WindowMatch};
use crate::strategy::{ReplaceStrategy, block_error};
use serde_json::{Value, json};
use turboedit_core::{EditBlock, Error, ReplaceResult, StrategyKind};

/// Default ratio a window must reach to be replaced.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Replaces the best-matching line window of each block when its similarity
/// is at least `threshold`.
#[derive(Debug, Clone)]
pub struct SimilarityReplacer {
    threshold: f64,
}

impl Default for SimilarityReplacer {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

/// Why a block was not applied, with the diagnostic that goes back to the
/// proposing model.
struct BlockMiss {
    error: Error,
    detail: Value,
}

impl SimilarityReplacer {
    /// Create a replacer; the threshold is clamped into `[0, 1]`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn apply_block(
        &self,
        content: &str,
        block: &EditBlock,
        index: usize,
    ) -> std::result::Result<(String, Value), BlockMiss> {
        if block.is_insert() {
            return Ok((
                prepend(content, &block.replace_text),
                json!({ "block": index, "applied": true, "insert": true }),
            ));
        }

        let best = TextSimilarity::new(&block.search_text, content).best_matching_window();
        if best.text.is_empty() {
            return Err(BlockMiss {
                error: Error::match_not_found(index, "content has no lines to match against"),
                detail: json!({ "block": index, "applied": false, "similarity": 0.0 }),
            });
        }

        if best.ratio < self.threshold {
            return Err(self.below_threshold(&best, index));
        }

        let Some(start) = content.find(&best.text) else {
            return Err(BlockMiss {
                error: Error::match_not_found(index, "matched window could not be located"),
                detail: Self::detail(&best, index, false),
            });
        };
        let mut end = start + best.text.len();
        if !is_line_boundary(content, start, end) {
            return Err(BlockMiss {
                error: Error::match_not_found(
                    index,
                    format!(
                        "best match ({:.1}%) does not fall on whole-line boundaries",
                        best.ratio * 100.0
                    ),
                ),
                detail: Self::detail(&best, index, false),
            });
        }

        let followed_by_newline = content.as_bytes().get(end) == Some(&b'\n');
        let mut replacement = block.replace_text.as_str();
        if replacement.is_empty() {
            // Drop the whole lines, terminator included.
            if followed_by_newline {
                end += 1;
            }
        } else if followed_by_newline {
            replacement = replacement.strip_suffix('\n').unwrap_or(replacement);
        }

        let mut out = String::with_capacity(content.len() + replacement.len());
        out.push_str(&content[..start]);
        out.push_str(replacement);
        out.push_str(&content[end..]);

        if out == content {
            return Err(BlockMiss {
                error: Error::match_not_found(index, "no-op: replacement leaves content unchanged"),
                detail: Self::detail(&best, index, false),
            });
        }

        let mut detail = Self::detail(&best, index, true);
        detail["located_line"] = json!(line_of_offset(content, start));
        Ok((out, detail))
    }

    fn below_threshold(&self, best: &WindowMatch, index: usize) -> BlockMiss {
        let reason = format!(
            "best match similarity {:.1}% is below threshold {:.1}% (lines {}-{}):\n{}",
            best.ratio * 100.0,
            self.threshold * 100.0,
            best.start_line + 1,
            best.end_line,
            best.text
        );
        BlockMiss {
            error: Error::match_not_found(index, reason),
            detail: Self::detail(best, index, false),
        }
    }

    fn detail(best: &WindowMatch, index: usize, applied: bool) -> Value {
        json!({
            "block": index,
            "applied": applied,
            "similarity": best.ratio,
            "start_line": best.start_line + 1,
            "end_line": best.end_line,
            "candidate": best.text,
        })
    }
}

impl ReplaceStrategy for SimilarityReplacer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Similarity
    }

    /// Needs some content to match against unless every block is an insert.
    fn can_handle(&self, content: &str, blocks: &[EditBlock]) -> bool {
        !content.is_empty() || blocks.iter().all(EditBlock::is_insert)
    }

    fn replace(&self, content: &str, blocks: &[EditBlock]) -> ReplaceResult {
        let mut current = content.to_string();
        let mut applied = 0;
        let mut errors = Vec::new();
        let mut reports = Vec::with_capacity(blocks.len());

        for (idx, block) in blocks.iter().enumerate() {
            let index = idx + 1;
            if let Err(e) = block.validate() {
                errors.push(block_error(index, &e));
                reports.push(json!({ "block": index, "applied": false }));
                continue;
            }
            match self.apply_block(&current, block, index) {
                Ok((next, detail)) => {
                    log::debug!("similarity: block {} applied", index);
                    current = next;
                    applied += 1;
                    reports.push(detail);
                }
                Err(miss) => {
                    log::debug!("similarity: block {} failed: {}", index, miss.error);
                    errors.push(block_error(index, &miss.error));
                    reports.push(miss.detail);
                }
            }
        }

        ReplaceResult::from_outcome(current, applied, blocks.len(), errors)
            .with_metadata("strategy", StrategyKind::Similarity.as_str())
            .with_metadata("threshold", self.threshold)
            .with_metadata("blocks", reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_text_replaced() {
        let content = "alpha\nbeta\ngamma\n";
        let result = SimilarityReplacer::default()
            .replace(content, &[EditBlock::new("beta", "BETA")]);
        assert!(result.success);
        assert_eq!(result.new_content.as_deref(), Some("alpha\nBETA\ngamma\n"));
        assert_eq!(result.strategy(), Some("similarity"));
    }

    #[test]
    fn test_replacement_trailing_newline_not_doubled() {
        let result = SimilarityReplacer::default()
            .replace("a\nb\nc\n", &[EditBlock::new("b", "B\n")]);
        assert_eq!(result.new_content.as_deref(), Some("a\nB\nc\n"));
    }

    #[test]
    fn test_near_match_above_threshold() {
        let content = "fn compute(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        // the return type differs from the real first line
        let search = "fn compute(a: i32, b: i32) -> i64 {\n    a + b\n}";
        let result = SimilarityReplacer::new(0.9)
            .replace(content, &[EditBlock::new(search, "fn compute() {}")]);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.new_content.as_deref(), Some("fn compute() {}\n"));
    }

    #[test]
    fn test_below_threshold_reports_candidate() {
        let content = "first line\nsecond line\n";
        let result = SimilarityReplacer::new(0.95)
            .replace(content, &[EditBlock::new("secnd lime", "x")]);
        assert!(!result.success);
        assert!(result.new_content.is_none());
        let err = &result.errors[0];
        assert!(err.contains("below threshold 95.0%"));
        assert!(err.contains("second line"));
        let detail = &result.metadata["blocks"][0];
        assert_eq!(detail["candidate"], "second line");
        assert_eq!(detail["start_line"], 2);
    }

    #[test]
    fn test_no_op_is_failure() {
        let result = SimilarityReplacer::default()
            .replace("same\n", &[EditBlock::new("same", "same")]);
        assert!(!result.success);
        assert!(result.errors[0].contains("no-op"));
    }

    #[test]
    fn test_empty_replacement_removes_lines() {
        let result = SimilarityReplacer::default()
            .replace("a\nb\nc\n", &[EditBlock::new("b", "")]);
        assert_eq!(result.new_content.as_deref(), Some("a\nc\n"));
    }

    #[test]
    fn test_insert_block() {
        let result = SimilarityReplacer::default()
            .replace("a\n", &[EditBlock::insert("// top")]);
        assert_eq!(result.new_content.as_deref(), Some("// top\na\n"));
    }

    #[test]
    fn test_first_occurrence_relocation_limitation() {
        // The best window is line 3, but substring relocation finds the same
        // text inside line 1 first and the block is rejected.
        let content = "let total = 1;\nother\ntotal = 1;\n";
        let result = SimilarityReplacer::default()
            .replace(content, &[EditBlock::new("total = 1;", "total = 2;")]);
        assert!(!result.success);
        assert!(result.errors[0].contains("whole-line boundaries"));
        assert_eq!(result.metadata["blocks"][0]["start_line"], 3);
    }

    #[test]
    fn test_cannot_handle_empty_content() {
        let replacer = SimilarityReplacer::default();
        assert!(!replacer.can_handle("", &[EditBlock::new("a", "b")]));
        assert!(replacer.can_handle("", &[EditBlock::insert("a")]));
    }
}
