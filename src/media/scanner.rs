//! Media directive scanner.
//!
//! Directives are brace-delimited spans such as `{img https://example.com/a.png}`
//! embedded in expanded text. Braces preceded by a backslash (`\{`, `\}`) are
//! literal and never delimit a directive.
//!
//! # Pairing rule
//!
//! Braces are paired from the right. The scanner walks the text backwards; each
//! unescaped `}` opens a candidate which closes at the nearest unescaped `{` to
//! its left that leaves at least one character of content. Content never spans
//! a line terminator: reaching one abandons the candidate. After a match the
//! scan resumes to the left of its `{`.
//!
//! This means that for unbalanced input the right-most usable `{` wins:
//!
//! ```
//! use postbot::media::scan_directives;
//!
//! let found = scan_directives("{a {img x}");
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].raw, "{img x}");
//! ```

use std::ops::Range;

/// One directive found in expanded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Raw directive text, including the delimiting braces.
    pub raw: String,
    /// Byte range of `raw` within the scanned text.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    /// Outside any directive, looking for an unescaped `}`.
    Text,
    /// Inside a candidate directive whose `}` sits at char index `close`.
    InDirective { close: usize },
}

/// Characters that `.` refuses to match in the directive content.
fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Find all directives in `text`, in left-to-right document order.
///
/// Returns an empty list when the text contains no directive.
#[must_use]
pub fn scan_directives(text: &str) -> Vec<Directive> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let escaped = |i: usize| i > 0 && chars[i - 1].1 == '\\';
    let byte_end = |i: usize| chars[i].0 + chars[i].1.len_utf8();

    let mut found = Vec::new();
    let mut state = ScanState::Text;

    for i in (0..chars.len()).rev() {
        let c = chars[i].1;
        state = match state {
            ScanState::Text => {
                if c == '}' && !escaped(i) {
                    ScanState::InDirective {
                        close: i,
                    }
                } else {
                    ScanState::Text
                }
            }
            ScanState::InDirective {
                close,
            } => {
                if is_line_terminator(c) {
                    ScanState::Text
                } else if c == '{' && !escaped(i) && close - i >= 2 {
                    let span = chars[i].0..byte_end(close);
                    found.push(Directive {
                        raw: text[span.clone()].to_string(),
                        span,
                    });
                    ScanState::Text
                } else {
                    ScanState::InDirective {
                        close,
                    }
                }
            }
        };
    }

    found.reverse();
    found
}

/// Remove every directive span from `text`.
///
/// Escaped braces are left untouched (still escaped).
#[must_use]
pub fn strip_directives(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for directive in scan_directives(text) {
        out.push_str(&text[cursor..directive.span.start]);
        cursor = directive.span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Restore escaped braces (`\{` → `{`, `\}` → `}`).
#[must_use]
pub fn unescape_braces(text: &str) -> String {
    text.replace("\\{", "{").replace("\\}", "}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(text: &str) -> Vec<String> {
        scan_directives(text).into_iter().map(|d| d.raw).collect()
    }

    #[test]
    fn test_no_directives() {
        assert!(scan_directives("").is_empty());
        assert!(scan_directives("just some text").is_empty());
    }

    #[test]
    fn test_single_directive_span() {
        let text = "Hello {img http://a/b.jpg} world";
        let found = scan_directives(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "{img http://a/b.jpg}");
        assert_eq!(&text[found[0].span.clone()], "{img http://a/b.jpg}");
    }

    #[test]
    fn test_multiple_directives_in_document_order() {
        let text = "{img a} one {vid b} two {img c}";
        assert_eq!(raws(text), vec!["{img a}", "{vid b}", "{img c}"]);
    }

    #[test]
    fn test_escaped_braces_are_not_delimiters() {
        let text = r"a \{not a tag\} b";
        assert!(scan_directives(text).is_empty());
        assert_eq!(unescape_braces(&strip_directives(text)), "a {not a tag} b");
    }

    #[test]
    fn test_escaped_close_inside_directive_is_content() {
        let text = r"{img x\}y}";
        assert_eq!(raws(text), vec![r"{img x\}y}"]);
    }

    #[test]
    fn test_escaped_open_inside_directive_is_content() {
        let text = r"{img \{x}";
        assert_eq!(raws(text), vec![r"{img \{x}"]);
    }

    #[test]
    fn test_rightmost_opening_brace_wins() {
        assert_eq!(raws("{a {img x}"), vec!["{img x}"]);
    }

    #[test]
    fn test_extra_closing_brace_absorbed_into_content() {
        // The right-most `}` pairs with the only `{`, swallowing the inner `}`.
        assert_eq!(raws("{a}b}"), vec!["{a}b}"]);
    }

    #[test]
    fn test_empty_braces_need_content() {
        assert!(scan_directives("{}").is_empty());
        // `{` directly left of `}` is consumed as content, so the outer `{` closes it.
        assert_eq!(raws("{a{}"), vec!["{a{}"]);
    }

    #[test]
    fn test_directive_cannot_span_lines() {
        assert!(scan_directives("{img\nx}").is_empty());
        assert_eq!(raws("{img a}\n{img b}"), vec!["{img a}", "{img b}"]);
        assert_eq!(raws("{x\r{img y}"), vec!["{img y}"]);
    }

    #[test]
    fn test_strip_removes_each_span_once() {
        let text = "Hello {img http://a/b.jpg} world {vid http://c/d.mp4}!";
        assert_eq!(strip_directives(text), "Hello  world !");
    }

    #[test]
    fn test_strip_keeps_escapes() {
        let text = r"x {img a} \{y\}";
        assert_eq!(strip_directives(text), r"x  \{y\}");
    }

    #[test]
    fn test_non_ascii_text_spans_are_byte_accurate() {
        let text = "café {img ü} ☕";
        let found = scan_directives(text);
        assert_eq!(found.len(), 1);
        assert_eq!(&text[found[0].span.clone()], "{img ü}");
        assert_eq!(strip_directives(text), "café  ☕");
    }

    #[test]
    fn test_well_formed_directives_leave_no_syntax() {
        let text = "{img a}{img b} mid {vid c} end";
        let found = scan_directives(text);
        assert_eq!(found.len(), 3);
        let stripped = strip_directives(text);
        assert_eq!(stripped.trim(), "mid  end");
        assert!(!stripped.contains('{') && !stripped.contains('}'));
    }
}
