//! Multi-document streams: splitting on document markers and re-encoding.

use super::document::{Document, ParseError};
use super::layout::{self, LineKind};

/// A slice of the input holding at most one YAML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    /// 1-based input line of the segment's first line.
    pub line: usize,
}

/// Split an input stream into per-document segments.
///
/// Boundaries sit on column-0 `---`, `...` and `%` directive lines, the only
/// places YAML allows a document to change. Comments and directives ahead of a
/// `---` stay with the document that follows it.
pub fn split_documents(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut start_line = 1;
    let mut offset = 0;
    let mut seen_marker = false;
    let mut seen_content = false;
    let mut ended = false;

    for (number, line) in input.split_inclusive('\n').enumerate() {
        let kind = layout::line_kind(line.trim_end_matches(['\n', '\r']));
        let opens_document = match kind {
            LineKind::Start | LineKind::Directive => seen_marker || seen_content,
            LineKind::Content => ended,
            LineKind::End | LineKind::Trivia => false,
        };

        if opens_document && offset > start {
            segments.push(Segment {
                text: &input[start..offset],
                line: start_line,
            });
            start = offset;
            start_line = number + 1;
            seen_marker = false;
            seen_content = false;
            ended = false;
        }

        match kind {
            LineKind::Start => seen_marker = true,
            LineKind::Content => seen_content = true,
            LineKind::End => ended = true,
            LineKind::Directive | LineKind::Trivia => {}
        }
        offset += line.len();
    }

    if start < input.len() {
        segments.push(Segment {
            text: &input[start..],
            line: start_line,
        });
    }

    segments
}

/// Parse a stream into its non-empty documents, in input order.
///
/// Any malformed document fails the whole stream.
pub fn parse_stream(input: &str) -> Result<Vec<Document>, ParseError> {
    let mut documents = Vec::new();
    for (index, segment) in split_documents(input).into_iter().enumerate() {
        match Document::parse(segment.text, index + 1, segment.line)? {
            Some(document) => documents.push(document),
            None => log::debug!(
                "Skipping empty document {} at line {}",
                index + 1,
                segment.line
            ),
        }
    }
    Ok(documents)
}

/// Re-encode documents into one stream.
///
/// Each document's text is written as-is; a `---` separator is added in front
/// of any document after the first that does not carry its own.
pub fn render_stream(documents: &[Document]) -> String {
    let mut out = String::with_capacity(documents.iter().map(|d| d.text().len() + 4).sum());
    for (position, document) in documents.iter().enumerate() {
        if position > 0 && !document.has_explicit_start() {
            out.push_str("---\n");
        }
        out.push_str(document.text());
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
