//! Diff preview for resolved edits.

use similar::TextDiff;

/// Generate a unified diff between two strings with three lines of context.
///
/// Returns an empty string when the inputs are identical.
pub fn generate_unified_diff(original: &str, modified: &str) -> String {
    if original == modified {
        return String::new();
    }
    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(3)
        .header("original", "modified")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_diff() {
        let diff = generate_unified_diff("line1\nold_text\nline3\n", "line1\nnew_text\nline3\n");
        assert!(diff.contains("-old_text"));
        assert!(diff.contains("+new_text"));
        assert!(diff.starts_with("--- original"));
    }

    #[test]
    fn test_no_changes() {
        assert!(generate_unified_diff("same\n", "same\n").is_empty());
    }
}
