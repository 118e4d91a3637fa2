//! Line helpers shared by the replacers.
//!
//! Lines are split on `\n` only; a `\r` stays part of its line so exact
//! matching remains whitespace-exact.

/// Split text into lines without terminators. A trailing `\n` does not
/// produce an empty final line.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').collect()
}

/// Split text into lines keeping their `\n` terminators.
pub fn split_lines_inclusive(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Drop a single `\n` terminator.
pub fn strip_terminator(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

/// Index of the first run of `content_lines` whose bodies equal `needle`.
pub fn find_line_match(content_lines: &[&str], needle: &[&str]) -> Option<usize> {
    if needle.is_empty() || needle.len() > content_lines.len() {
        return None;
    }
    (0..=content_lines.len() - needle.len()).find(|&start| {
        needle
            .iter()
            .enumerate()
            .all(|(i, wanted)| strip_terminator(content_lines[start + i]) == *wanted)
    })
}

/// Whether `start..end` begins at a line start and ends at a line end.
pub fn is_line_boundary(content: &str, start: usize, end: usize) -> bool {
    let bytes = content.as_bytes();
    let starts_line = start == 0 || bytes.get(start - 1) == Some(&b'\n');
    let ends_line = end == bytes.len() || bytes.get(end) == Some(&b'\n');
    starts_line && ends_line
}

/// 1-based line number of a byte offset.
pub fn line_of_offset(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())].matches('\n').count() + 1
}

/// Insert `text` at the head of `content`, newline-terminated.
pub fn prepend(content: &str, text: &str) -> String {
    let mut out = String::with_capacity(content.len() + text.len() + 1);
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(content);
    out
}

/// First line of `text`, shortened for diagnostics.
pub fn preview(text: &str, max_chars: usize) -> String {
    let first = text.lines().next().unwrap_or("");
    if first.chars().count() > max_chars {
        let cut: String = first.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_find_line_match_whole_lines_only() {
        let lines = split_lines_inclusive("foo bar\nbaz\nfoo\n");
        assert_eq!(find_line_match(&lines, &["foo"]), Some(2));
        assert_eq!(find_line_match(&lines, &["baz", "foo"]), Some(1));
        assert_eq!(find_line_match(&lines, &["bar"]), None);
    }

    #[test]
    fn test_line_boundary() {
        let content = "one\ntwo\nthree";
        assert!(is_line_boundary(content, 4, 7));
        assert!(is_line_boundary(content, 8, content.len()));
        assert!(!is_line_boundary(content, 5, 7));
    }

    #[test]
    fn test_prepend_adds_newline() {
        assert_eq!(prepend("a\n", "HEADER"), "HEADER\na\n");
        assert_eq!(prepend("a\n", "HEADER\n"), "HEADER\na\n");
    }

    #[test]
    fn test_line_of_offset() {
        assert_eq!(line_of_offset("a\nb\nc", 0), 1);
        assert_eq!(line_of_offset("a\nb\nc", 4), 3);
    }
}
