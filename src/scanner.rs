//! Phase 1: Scanner
//!
//! The scanner converts raw source text into a line table. It performs:
//! - Line framing (text up to the next `\n` or end of input)
//! - CRLF tolerance (one trailing `\r` trimmed per line)
//! - Indentation counting (leading U+0020 only; tabs are content)
//!
//! Comment and blank lines are NOT filtered here. Inside block strings and
//! multi-line arrays they carry content or terminate constructs, so skipping
//! them is a parsing decision, not a scanning one.

/// A single framed source line.
#[derive(Debug, Clone)]
pub(crate) struct Line {
    /// Full line text, without the newline and without a trailing `\r`.
    pub text: String,
    /// Number of leading spaces.
    pub indent: usize,
    /// Zero-based line number for error reporting.
    pub line_num: usize,
}

impl Line {
    /// Text after the indent.
    pub fn content(&self) -> &str {
        &self.text[self.indent..]
    }
}

/// Scan source text into the line table.
pub(crate) fn scan(source: &str) -> Vec<Line> {
    source
        .split('\n')
        .enumerate()
        .map(|(line_num, raw)| {
            let text = raw.strip_suffix('\r').unwrap_or(raw).to_string();
            let indent = count_indent(&text);
            Line {
                text,
                indent,
                line_num,
            }
        })
        .collect()
}

/// Count the number of leading spaces in a line.
fn count_indent(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_indent() {
        assert_eq!(count_indent(""), 0);
        assert_eq!(count_indent("hello"), 0);
        assert_eq!(count_indent("  hello"), 2);
        assert_eq!(count_indent("    hello"), 4);
        assert_eq!(count_indent("\thello"), 0);
    }

    #[test]
    fn test_scan_simple() {
        let lines = scan("name value");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "name value");
        assert_eq!(lines[0].indent, 0);
        assert_eq!(lines[0].line_num, 0);
    }

    #[test]
    fn test_scan_indented() {
        let lines = scan("outer\n  inner 1");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].indent, 2);
        assert_eq!(lines[1].content(), "inner 1");
    }

    #[test]
    fn test_scan_trims_carriage_return() {
        let lines = scan("a 1\r\nb 2\r");
        assert_eq!(lines[0].text, "a 1");
        assert_eq!(lines[1].text, "b 2");
    }

    #[test]
    fn test_scan_keeps_blank_lines() {
        let lines = scan("a 1\n\n   \nb 2");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[2].indent, 3);
        assert_eq!(lines[2].content(), "");
    }

    #[test]
    fn test_scan_trailing_newline() {
        // "a\n" frames as the line plus one empty trailing line.
        let lines = scan("a 1\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "");
    }
}
