//! Line-oriented fuzzy matching.
//!
//! Similarity of two strings is `2 * matched / total` over characters, where
//! `matched` is the number of characters kept by a minimal diff (the same
//! shape as a Ratcliff-Obershelp ratio). `ratio(x, x) == 1.0`.
//!
//! All functions here are pure; a [`TextSimilarity`] only borrows its inputs
//! and can be shared between threads.

use crate::lines::split_lines;
use serde::Serialize;
use similar::{Algorithm, DiffOp, TextDiff};

/// Similarity ratio of two strings in `[0, 1]`.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(a, b);
    let matched: usize = diff
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();

    (2 * matched) as f64 / total as f64
}

/// Best window found by [`TextSimilarity::best_matching_window`].
///
/// Line indices are 0-based; `end_line` is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowMatch {
    pub ratio: f64,
    /// Window lines joined with `\n` (no trailing terminator)
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl WindowMatch {
    fn empty() -> Self {
        Self {
            ratio: 0.0,
            text: String::new(),
            start_line: 0,
            end_line: 0,
        }
    }
}

/// Result of the exhaustive window search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExhaustiveMatch {
    pub ratio: f64,
    pub text: String,
    pub window_size: usize,
    pub start: usize,
    pub end: usize,
    pub windows_checked: usize,
}

/// One ranked candidate window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowCandidate {
    pub start: usize,
    pub end: usize,
    pub ratio: f64,
    pub text: String,
}

/// Finds the sub-range of a haystack text that best matches a pattern text.
#[derive(Debug, Clone)]
pub struct TextSimilarity<'a> {
    lines_a: Vec<&'a str>,
    lines_b: Vec<&'a str>,
}

impl<'a> TextSimilarity<'a> {
    /// `text_a` is the pattern, `text_b` the haystack.
    pub fn new(text_a: &'a str, text_b: &'a str) -> Self {
        Self {
            lines_a: split_lines(text_a),
            lines_b: split_lines(text_b),
        }
    }

    /// Number of pattern lines
    pub fn pattern_len(&self) -> usize {
        self.lines_a.len()
    }

    /// Number of haystack lines
    pub fn haystack_len(&self) -> usize {
        self.lines_b.len()
    }

    /// Slide a window of the pattern's line count (or the whole haystack if
    /// the pattern is longer) across the haystack.
    ///
    /// Returns the earliest window with the maximum ratio.
    pub fn best_matching_window(&self) -> WindowMatch {
        let m = self.lines_a.len();
        let n = self.lines_b.len();
        if m == 0 || n == 0 {
            return WindowMatch::empty();
        }

        let pattern = self.lines_a.join("\n");
        let size = m.min(n);
        let mut best: Option<WindowMatch> = None;

        for start in 0..=n - size {
            let window = self.lines_b[start..start + size].join("\n");
            let score = ratio(&pattern, &window);
            if best.as_ref().is_none_or(|b| score > b.ratio) {
                best = Some(WindowMatch {
                    ratio: score,
                    text: window,
                    start_line: start,
                    end_line: start + size,
                });
            }
        }

        best.unwrap_or_else(WindowMatch::empty)
    }

    /// Try every window size at every offset. O(n^2) windows; meant for
    /// diagnostics, never for the replacement hot path.
    pub fn best_matching_window_all_sizes(&self) -> ExhaustiveMatch {
        let n = self.lines_b.len();
        let pattern = self.lines_a.join("\n");
        let mut checked = 0;
        let mut best = ExhaustiveMatch {
            ratio: 0.0,
            text: String::new(),
            window_size: 0,
            start: 0,
            end: 0,
            windows_checked: 0,
        };
        let mut found = false;

        for size in 1..=n {
            for start in 0..=n - size {
                let window = self.lines_b[start..start + size].join("\n");
                let score = ratio(&pattern, &window);
                checked += 1;
                if !found || score > best.ratio {
                    found = true;
                    best = ExhaustiveMatch {
                        ratio: score,
                        text: window,
                        window_size: size,
                        start,
                        end: start + size,
                        windows_checked: 0,
                    };
                }
            }
        }

        best.windows_checked = checked;
        best
    }

    /// Ratio of every pattern line against every haystack line, `[a][b]`.
    pub fn similarity_matrix(&self) -> Vec<Vec<f64>> {
        self.lines_a
            .iter()
            .map(|a| self.lines_b.iter().map(|b| ratio(a, b)).collect())
            .collect()
    }

    /// Every fixed-size window ranked by ratio, best first; ties keep
    /// haystack order.
    pub fn window_similarities(&self) -> Vec<WindowCandidate> {
        let m = self.lines_a.len();
        let n = self.lines_b.len();
        if m == 0 || n == 0 {
            return Vec::new();
        }

        let pattern = self.lines_a.join("\n");
        let size = m.min(n);
        let mut candidates: Vec<WindowCandidate> = (0..=n - size)
            .map(|start| {
                let text = self.lines_b[start..start + size].join("\n");
                WindowCandidate {
                    start,
                    end: start + size,
                    ratio: ratio(&pattern, &text),
                    text,
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_identity_and_bounds() {
        assert_eq!(ratio("abc", "abc"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("abcd", "wxyz"), 0.0);
        let r = ratio("hello world", "hello wurld");
        assert!(r > 0.8 && r < 1.0);
    }

    #[test]
    fn test_ratio_counts_matches() {
        // "abcd" vs "abxd": 3 matched chars of 8 total
        assert!((ratio("abcd", "abxd") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_best_window_of_self_is_exact() {
        let text = "fn main() {\n    println!(\"hi\");\n}";
        let best = TextSimilarity::new(text, text).best_matching_window();
        assert_eq!(best.ratio, 1.0);
        assert_eq!(best.text, text);
        assert_eq!((best.start_line, best.end_line), (0, 3));
    }

    #[test]
    fn test_best_window_locates_block() {
        let haystack = "alpha\nbeta\ngamma\ndelta\n";
        let best = TextSimilarity::new("gamma\ndelta", haystack).best_matching_window();
        assert_eq!(best.ratio, 1.0);
        assert_eq!(best.text, "gamma\ndelta");
        assert_eq!(best.start_line, 2);
    }

    #[test]
    fn test_best_window_prefers_earliest_tie() {
        let haystack = "dup\nother\ndup\n";
        let best = TextSimilarity::new("dup", haystack).best_matching_window();
        assert_eq!(best.start_line, 0);
    }

    #[test]
    fn test_pattern_longer_than_haystack_uses_whole_haystack() {
        let best = TextSimilarity::new("a\nb\nc", "a\nb").best_matching_window();
        assert_eq!(best.text, "a\nb");
        assert_eq!(best.end_line, 2);
        assert!(best.ratio < 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        let best = TextSimilarity::new("", "abc").best_matching_window();
        assert_eq!(best.ratio, 0.0);
        assert!(best.text.is_empty());
        assert!(TextSimilarity::new("a", "").window_similarities().is_empty());
    }

    #[test]
    fn test_all_sizes_dominates_fixed_window() {
        let cases = [
            ("let x = 1;\nlet y = 2;", "let x = 1;\nfoo();\nlet y = 2;\n"),
            ("a\nb\nc", "x\na\nb\ny\nc\n"),
            ("completely different", "nothing\nalike\nhere\n"),
        ];
        for (pattern, haystack) in cases {
            let sim = TextSimilarity::new(pattern, haystack);
            let fixed = sim.best_matching_window();
            let all = sim.best_matching_window_all_sizes();
            assert!(all.ratio >= fixed.ratio, "{pattern:?}");
        }
    }

    #[test]
    fn test_all_sizes_reports_windows_checked() {
        let sim = TextSimilarity::new("b", "a\nb\nc\n");
        let all = sim.best_matching_window_all_sizes();
        // 3 + 2 + 1 windows
        assert_eq!(all.windows_checked, 6);
        assert_eq!(all.ratio, 1.0);
        assert_eq!((all.window_size, all.start, all.end), (1, 1, 2));
    }

    #[test]
    fn test_similarity_matrix_shape() {
        let matrix = TextSimilarity::new("a\nb", "a\nx\nb").similarity_matrix();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].len(), 3);
        assert_eq!(matrix[0][0], 1.0);
        assert_eq!(matrix[1][2], 1.0);
    }

    #[test]
    fn test_window_similarities_ranked() {
        let ranked = TextSimilarity::new("beta", "alpha\nbeta\nbetb\n").window_similarities();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].text, "beta");
        assert!(ranked[0].ratio >= ranked[1].ratio);
        assert!(ranked[1].ratio >= ranked[2].ratio);
    }
}
