//! Snippet reconstruction around a matched line

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Maximum number of lines in a snippet
pub const MAX_SNIPPET_LINES: usize = 15;

/// Build a block of up to `max_lines` lines centred on `match_line` (1-indexed).
///
/// The file is re-opened and streamed; reading stops once the window is
/// passed. Any I/O failure degrades to the trimmed matched line, so one
/// unreadable file never fails a search.
pub fn build_snippet(path: &Path, match_line: usize, matched_text: &str, max_lines: usize) -> String {
    let fallback = || matched_text.trim().to_string();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("Snippet fallback for {:?}: {}", path, e);
            return fallback();
        }
    };

    let half = max_lines / 2;
    let lower = match_line.saturating_sub(half);
    let upper = match_line.saturating_add(half);

    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("Snippet fallback for {:?}: {}", path, e);
                return fallback();
            }
        }
        line_no += 1;
        if line_no > upper {
            break;
        }
        if line_no >= lower {
            lines.push(decode_line(&buf));
        }
    }

    if lines.is_empty() {
        return fallback();
    }
    lines.truncate(max_lines);
    lines.join("\n")
}

/// Reported `(line_start, line_end)` for a snippet of `snippet_lines` lines
/// around `match_line`.
///
/// The range is derived from the snippet's line count, half before the
/// match and the rest after, with the start clamped to 1. Near the top or
/// bottom of a file the reported range can therefore be asymmetric or
/// extend past the real window.
pub fn snippet_span(match_line: usize, snippet_lines: usize) -> (usize, usize) {
    if snippet_lines <= 1 {
        return (match_line, match_line);
    }
    let half = (snippet_lines - 1) / 2;
    let start = match_line.saturating_sub(half).max(1);
    let end = match_line.saturating_add(snippet_lines - 1 - half);
    (start, end)
}

/// Decode one raw line lossily, dropping the line terminator
pub(crate) fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn numbered_file(temp: &TempDir, count: usize) -> std::path::PathBuf {
        let path = temp.path().join("lines.txt");
        let content: Vec<String> = (1..=count).map(|i| format!("line {}", i)).collect();
        fs::write(&path, content.join("\n") + "\n").unwrap();
        path
    }

    #[test]
    fn test_centered_window() {
        let temp = TempDir::new().unwrap();
        let path = numbered_file(&temp, 100);

        let snippet = build_snippet(&path, 50, "line 50", MAX_SNIPPET_LINES);
        let lines: Vec<&str> = snippet.lines().collect();
        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0], "line 43");
        assert_eq!(lines[7], "line 50");
        assert_eq!(lines[14], "line 57");
        assert_eq!(snippet_span(50, lines.len()), (43, 57));
    }

    #[test]
    fn test_window_near_top_of_file() {
        let temp = TempDir::new().unwrap();
        let path = numbered_file(&temp, 20);

        let snippet = build_snippet(&path, 5, "line 5", MAX_SNIPPET_LINES);
        let lines: Vec<&str> = snippet.lines().collect();
        assert_eq!(lines.first(), Some(&"line 1"));
        assert_eq!(lines.last(), Some(&"line 12"));

        let (start, end) = snippet_span(5, lines.len());
        assert_eq!(start, 1);
        assert!(start <= 5 && 5 <= end);
    }

    #[test]
    fn test_even_window_is_capped() {
        let temp = TempDir::new().unwrap();
        let path = numbered_file(&temp, 100);

        let snippet = build_snippet(&path, 50, "line 50", 4);
        // [48, 52] is five lines; capped to four
        assert_eq!(snippet, "line 48\nline 49\nline 50\nline 51");
    }

    #[test]
    fn test_missing_file_falls_back_to_trimmed_line() {
        let temp = TempDir::new().unwrap();
        let snippet = build_snippet(&temp.path().join("gone.txt"), 3, "   let foo = 1;  ", 15);
        assert_eq!(snippet, "let foo = 1;");
    }

    #[test]
    fn test_line_beyond_end_falls_back() {
        let temp = TempDir::new().unwrap();
        let path = numbered_file(&temp, 3);
        assert_eq!(build_snippet(&path, 500, " foo ", 15), "foo");
    }

    #[test]
    fn test_crlf_and_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mixed.txt");
        fs::write(&path, b"one\r\ntw\xffo\r\nthree").unwrap();

        let snippet = build_snippet(&path, 2, "two", 15);
        assert_eq!(snippet, "one\ntw\u{fffd}o\nthree");
    }

    #[test]
    fn test_huge_line_number_does_not_overflow() {
        let temp = TempDir::new().unwrap();
        let path = numbered_file(&temp, 3);
        assert_eq!(build_snippet(&path, usize::MAX, "foo", 15), "foo");
        assert_eq!(snippet_span(usize::MAX, 15), (usize::MAX - 7, usize::MAX));
    }

    #[test]
    fn test_snippet_span_single_line() {
        assert_eq!(snippet_span(7, 1), (7, 7));
        assert_eq!(snippet_span(7, 0), (7, 7));
    }
}
