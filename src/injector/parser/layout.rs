//! Line and token geometry over raw document text.
//!
//! The event stream tells us where a node starts; these helpers work out where
//! it ends, how it is indented, and where new content can be spliced in. They
//! lean on the same indentation rules a YAML scanner uses, so they only need
//! to be right for text that already parsed.

/// Classification of a single source line for document splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `---` document start marker (possibly with inline content).
    Start,
    /// `...` document end marker.
    End,
    /// `%YAML` / `%TAG` directive.
    Directive,
    /// Blank or comment-only line.
    Trivia,
    /// Anything else.
    Content,
}

/// Classify a line (without its line break).
pub fn line_kind(line: &str) -> LineKind {
    if is_marker(line, "---") {
        LineKind::Start
    } else if is_marker(line, "...") {
        LineKind::End
    } else if line.starts_with('%') {
        LineKind::Directive
    } else {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            LineKind::Trivia
        } else {
            LineKind::Content
        }
    }
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t', '\r']))
}

/// Whether the text contains a `---` line.
pub fn has_start_marker(text: &str) -> bool {
    text.lines().any(|line| line_kind(line) == LineKind::Start)
}

/// Offset of the first byte of the line containing `offset`.
pub fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset where the line containing `offset` ends, before any `\r\n` / `\n`.
pub fn line_end(text: &str, offset: usize) -> usize {
    let end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
    if end > offset && text[..end].ends_with('\r') {
        end - 1
    } else {
        end
    }
}

/// Zero-based column of `offset` within its line.
pub fn column(text: &str, offset: usize) -> usize {
    offset - line_start(text, offset)
}

/// Skip anchors (`&name`) and tags (`!tag`) in front of a node.
pub fn skip_properties(text: &str, mut offset: usize) -> usize {
    while text[offset..].starts_with(['&', '!']) {
        let rest = &text[offset..];
        let token = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let after = &rest[token..];
        let blank = after.len() - after.trim_start().len();
        offset += token + blank;
    }
    offset
}

/// End offset (exclusive) of the last line belonging to a block mapping whose
/// first key starts at `first_key`.
///
/// Lines belong while indented at least as far as the keys. Comment lines only
/// count when indented past the keys, so trailing comments at the mapping's own
/// level stay after anything appended to it.
pub fn mapping_end(text: &str, first_key: usize) -> usize {
    let keys = column(text, first_key);
    scan_block(
        text,
        line_end(text, first_key),
        |indent, _| indent >= keys,
        |indent| indent > keys,
    )
}

/// End offset (exclusive) of the value of the block mapping entry whose key
/// starts at `key`. A compact sequence (`- item` at the key's own column)
/// belongs to the value.
pub fn value_end(text: &str, key: usize) -> usize {
    let key_column = column(text, key);
    scan_block(
        text,
        line_end(text, key),
        |indent, content| indent > key_column || (indent == key_column && is_sequence_item(content)),
        |indent| indent > key_column,
    )
}

fn is_sequence_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

fn scan_block(
    text: &str,
    first_line_end: usize,
    belongs: impl Fn(usize, &str) -> bool,
    comment_belongs: impl Fn(usize) -> bool,
) -> usize {
    let mut last = first_line_end;
    let Some(mut cursor) = next_line(text, first_line_end) else {
        return last;
    };

    while cursor < text.len() {
        let end = line_end(text, cursor);
        let line = &text[cursor..end];
        let content = line.trim_start_matches(' ');
        let indent = line.len() - content.len();

        match line_kind(line) {
            LineKind::Start | LineKind::End | LineKind::Directive if indent == 0 => break,
            _ => {}
        }

        if content.trim().is_empty() {
            // blank
        } else if content.starts_with('#') {
            if comment_belongs(indent) {
                last = end;
            }
        } else if belongs(indent, content) {
            last = end;
        } else {
            break;
        }

        match next_line(text, end) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    last
}

fn next_line(text: &str, from: usize) -> Option<usize> {
    text[from..].find('\n').map(|i| from + i + 1)
}

/// End offset (exclusive) of a quoted scalar opening at `open`.
pub fn quoted_end(text: &str, open: usize) -> Option<usize> {
    let quote = text[open..].chars().next()?;
    let mut chars = text[open + quote.len_utf8()..].char_indices().peekable();
    let base = open + quote.len_utf8();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            ('"', '\\') => {
                chars.next();
            }
            ('\'', '\'') => {
                if chars.peek().map(|(_, next)| *next) == Some('\'') {
                    chars.next();
                } else {
                    return Some(base + i + 1);
                }
            }
            ('"', '"') => return Some(base + i + 1),
            _ => {}
        }
    }
    None
}

/// End offset (exclusive) of a plain scalar starting at `offset`, limited to
/// its first line. Stops at a comment, at a `:` mapping indicator and, in flow
/// context, at flow indicators. Trailing blanks are not included.
pub fn plain_end(text: &str, offset: usize, flow: bool) -> usize {
    let line = &text[offset..line_end(text, offset)];
    let mut end = line.len();
    let mut prev_blank = false;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|(_, n)| *n);
        let stop = match c {
            '#' => prev_blank,
            ':' => match next {
                None => true,
                Some(n) => n.is_whitespace() || (flow && matches!(n, ',' | '[' | ']' | '{' | '}')),
            },
            ',' | '[' | ']' | '{' | '}' => flow,
            _ => false,
        };
        if stop {
            end = i;
            break;
        }
        prev_blank = c.is_whitespace();
    }

    offset + line[..end].trim_end().len()
}

/// Position of the `:` that follows a key ending at `key_end`.
pub fn colon_after(text: &str, key_end: usize) -> Option<usize> {
    let rest = &text[key_end..];
    let skipped = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    text[key_end + skipped..]
        .starts_with(':')
        .then_some(key_end + skipped)
}

/// Offset of the bracket closing the flow collection opened at `open`.
pub fn flow_close(text: &str, open: usize) -> Option<usize> {
    scan_flow(text, open).map(|(close, _)| close)
}

/// End offset (exclusive) of the last token inside the flow collection opened
/// at `open`, ignoring blanks and comments. Equals `open + 1` when the
/// collection is empty.
pub fn flow_content_end(text: &str, open: usize) -> Option<usize> {
    scan_flow(text, open).map(|(_, content_end)| content_end)
}

fn scan_flow(text: &str, open: usize) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut prev = ' ';
    let mut offset = open;
    let mut content_end = open;
    while let Some(c) = text[offset..].chars().next() {
        let token_start = prev.is_whitespace() || matches!(prev, '{' | '[' | ',' | ':');
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some((offset, content_end));
                }
            }
            '"' | '\'' if token_start => {
                offset = quoted_end(text, offset)?;
                content_end = offset;
                prev = c;
                continue;
            }
            '#' if prev.is_whitespace() => {
                offset = line_end(text, offset);
                prev = ' ';
                continue;
            }
            _ => {}
        }
        if !c.is_whitespace() {
            content_end = offset + c.len_utf8();
        }
        prev = c;
        offset += c.len_utf8();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_kind() {
        assert_eq!(line_kind("---"), LineKind::Start);
        assert_eq!(line_kind("--- # first"), LineKind::Start);
        assert_eq!(line_kind("...\r"), LineKind::End);
        assert_eq!(line_kind("%YAML 1.2"), LineKind::Directive);
        assert_eq!(line_kind("   # note"), LineKind::Trivia);
        assert_eq!(line_kind(""), LineKind::Trivia);
        assert_eq!(line_kind("----"), LineKind::Content);
        assert_eq!(line_kind("  - item"), LineKind::Content);
    }

    #[test]
    fn test_line_bounds() {
        let text = "a: 1\r\nb: 2\nc: 3";
        assert_eq!(line_start(text, 7), 6);
        assert_eq!(line_end(text, 0), 4);
        assert_eq!(line_end(text, 6), 10);
        assert_eq!(line_end(text, 12), text.len());
        assert_eq!(column(text, 9), 3);
    }

    #[test]
    fn test_mapping_end_skips_nested_and_trailing_comments() {
        let text = "labels:\n  app: demo\n  tier:\n    deep: x\n  # trailing\nspec: {}\n";
        let first_key = text.find("app").unwrap();
        let end = mapping_end(text, first_key);
        assert_eq!(&text[..end], "labels:\n  app: demo\n  tier:\n    deep: x");
    }

    #[test]
    fn test_mapping_end_keeps_block_scalar_content() {
        let text = "a:\n  script: |\n    echo hi\n    # not a comment\nb: 1\n";
        let first_key = text.find("script").unwrap();
        let end = mapping_end(text, first_key);
        assert!(text[..end].ends_with("# not a comment"));
    }

    #[test]
    fn test_mapping_end_inside_sequence_item() {
        let text = "- name: a\n  image: x\n- name: b\n";
        let end = mapping_end(text, 2);
        assert_eq!(&text[..end], "- name: a\n  image: x");
    }

    #[test]
    fn test_value_end_includes_compact_sequence() {
        let text = "env:\n- name: A\n  value: b\nnext: 1\n";
        let end = value_end(text, 0);
        assert_eq!(&text[..end], "env:\n- name: A\n  value: b");
    }

    #[test]
    fn test_quoted_end() {
        let text = r#"k: "a \" b" # c"#;
        assert_eq!(quoted_end(text, 3), Some(11));
        let text = "k: 'it''s' rest";
        assert_eq!(quoted_end(text, 3), Some(10));
        assert_eq!(quoted_end("'open", 0), None);
    }

    #[test]
    fn test_plain_end() {
        let text = "key: some value   # comment";
        assert_eq!(&text[5..plain_end(text, 5, false)], "some value");
        assert_eq!(&text[..plain_end(text, 0, false)], "key");
        let text = "{a: b, c: d}";
        assert_eq!(&text[4..plain_end(text, 4, true)], "b");
        let text = "url: http://x#frag";
        assert_eq!(&text[5..plain_end(text, 5, false)], "http://x#frag");
    }

    #[test]
    fn test_colon_after() {
        assert_eq!(colon_after("key  : v", 3), Some(5));
        assert_eq!(colon_after("key v", 3), None);
    }

    #[test]
    fn test_flow_close() {
        let text = "m: {a: '}', b: [1, 2], c: {d: e}} # }";
        assert_eq!(flow_close(text, 3), Some(32));
        assert_eq!(flow_close("{}", 0), Some(1));
        assert_eq!(flow_close("{a: b", 0), None);
    }

    #[test]
    fn test_flow_content_end() {
        assert_eq!(flow_content_end("{}", 0), Some(1));
        assert_eq!(flow_content_end("{  }", 0), Some(1));
        let text = "{a: b, }";
        assert_eq!(&text[..flow_content_end(text, 0).unwrap()], "{a: b,");
        let text = "{a: 'x y'  # note\n}";
        assert_eq!(&text[..flow_content_end(text, 0).unwrap()], "{a: 'x y'");
    }

    #[test]
    fn test_skip_properties() {
        let text = "&anchor !!map {a: b}";
        assert_eq!(skip_properties(text, 0), 14);
        assert_eq!(skip_properties("{a: b}", 0), 0);
    }
}
