//! Checksum injection into a Deployment's pod template metadata.
//!
//! The mutator never re-serializes a document. It walks the tree to
//! `spec.template.metadata.labels` (or `.annotations`), works out the minimal
//! set of text edits that overwrite existing keys and append missing ones, and
//! hands them to [`Document::apply`]. Block mappings grow in block style at the
//! column of their existing entries; flow mappings grow in flow style.

use crate::injector::parser::{
    Document, Edit, Entry, Mapping, Node, ParseError, Scalar, ScalarStyle, layout,
};
use crate::injector::quote::render_scalar;
use crate::injector::types::{ChecksumPair, Mode};

/// Indentation added for each newly created block level.
const INDENT: usize = 2;

/// Error type for tree mutation.
#[derive(Debug, thiserror::Error)]
pub enum MutateError {
    #[error("document {document}: cannot inject checksums, `{path}` is a {found}, not a mapping")]
    UnexpectedNode {
        document: usize,
        path: String,
        found: &'static str,
    },

    #[error("document {document}: edited document no longer parses: {source}")]
    Render {
        document: usize,
        #[source]
        source: ParseError,
    },
}

impl MutateError {
    /// Whether the document can simply be left unchanged.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnexpectedNode { .. })
    }
}

/// Write `pairs` into the pod template metadata field selected by `mode`.
///
/// Missing intermediate mappings are created, existing keys are overwritten in
/// place, and keys already carrying the same value are left alone. Returns
/// whether the document text changed.
pub fn inject(document: &mut Document, pairs: &[ChecksumPair], mode: Mode) -> Result<bool, MutateError> {
    if pairs.is_empty() {
        return Ok(false);
    }

    let pairs = dedup(pairs);
    let path = ["spec", "template", "metadata", mode.metadata_field()];
    let edits = plan(document, &path, &pairs)?;
    if edits.is_empty() {
        return Ok(false);
    }

    log::trace!("Applying {} edit(s) to document {}", edits.len(), document.index());
    let index = document.index();
    document.apply(edits).map_err(|source| MutateError::Render {
        document: index,
        source,
    })?;
    Ok(true)
}

/// Collapse pairs sharing a key. The first occurrence fixes the position, the
/// last one the value.
fn dedup(pairs: &[ChecksumPair]) -> Vec<(&str, &str)> {
    let mut out: Vec<(&str, &str)> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match out.iter_mut().find(|(key, _)| *key == pair.key) {
            Some(existing) => existing.1 = &pair.value,
            None => out.push((&pair.key, &pair.value)),
        }
    }
    out
}

fn plan(document: &Document, path: &[&str], pairs: &[(&str, &str)]) -> Result<Vec<Edit>, MutateError> {
    let text = document.text();
    let unexpected = |depth: usize, found: &'static str| MutateError::UnexpectedNode {
        document: document.index(),
        path: if depth == 0 {
            "<root>".to_string()
        } else {
            path[..depth].join(".")
        },
        found,
    };

    let Some(mut mapping) = document.root().as_mapping() else {
        return Err(unexpected(0, document.root().type_name()));
    };

    for (depth, &segment) in path.iter().enumerate() {
        let rest = &path[depth + 1..];
        let Some(entry) = mapping.get(segment) else {
            return Ok(vec![append_entries(
                text,
                mapping,
                &[Child::Nested(segment, rest)],
                pairs,
            )]);
        };
        match &entry.value {
            Node::Mapping(child) => mapping = child,
            Node::Scalar(scalar) => {
                return Ok(replace_with_mapping(text, mapping, entry, scalar, rest, pairs));
            }
            other => return Err(unexpected(depth + 1, other.type_name())),
        }
    }

    let mut edits = Vec::new();
    let mut missing = Vec::new();
    for &(key, value) in pairs {
        let Some(entry) = mapping.get(key) else {
            missing.push(Child::Pair(key, value));
            continue;
        };
        match &entry.value {
            Node::Scalar(scalar) if scalar.style != ScalarStyle::Implicit && scalar.value == value => {}
            Node::Scalar(scalar) => edits.extend(overwrite_value(text, mapping, entry, scalar, value)),
            other => {
                return Err(MutateError::UnexpectedNode {
                    document: document.index(),
                    path: format!("{}.{}", path.join("."), key),
                    found: other.type_name(),
                });
            }
        }
    }
    if !missing.is_empty() {
        edits.push(append_entries(text, mapping, &missing, pairs));
    }
    Ok(edits)
}

/// Content to add to a mapping: a checksum pair, or a key holding the rest of
/// the path with the pairs at its end.
enum Child<'a> {
    Pair(&'a str, &'a str),
    Nested(&'a str, &'a [&'a str]),
}

fn append_entries(text: &str, mapping: &Mapping, children: &[Child<'_>], pairs: &[(&str, &str)]) -> Edit {
    if mapping.is_flow() {
        return append_flow_entries(text, mapping, children, pairs);
    }

    let nl = newline(text);
    let column = layout::column(text, mapping.offset);
    let mut out = String::new();
    for child in children {
        match child {
            Child::Pair(key, value) => push_pair_line(&mut out, nl, column, key, value),
            Child::Nested(key, rest) => {
                out.push_str(nl);
                out.push_str(&" ".repeat(column));
                out.push_str(&render_scalar(key));
                out.push(':');
                out.push_str(&block_tail(nl, column + INDENT, rest, pairs));
            }
        }
    }
    Edit::insert(layout::mapping_end(text, mapping.offset), out)
}

fn append_flow_entries(text: &str, mapping: &Mapping, children: &[Child<'_>], pairs: &[(&str, &str)]) -> Edit {
    let entries: Vec<String> = children
        .iter()
        .map(|child| match child {
            Child::Pair(key, value) => format!("{}: {}", render_scalar(key), render_scalar(value)),
            Child::Nested(key, rest) => format!("{}: {}", render_scalar(key), flow_tail(rest, pairs)),
        })
        .collect();
    let entries = entries.join(", ");

    let content_end = layout::flow_content_end(text, mapping.offset).unwrap_or(mapping.offset + 1);
    let last = text[..content_end].chars().next_back();
    let insertion = match last {
        Some('{') => entries,
        Some(',') => format!(" {}", entries),
        _ => format!(", {}", entries),
    };
    Edit::insert(content_end, insertion)
}

/// Replace a scalar (typically an empty `labels:`) that sits where a mapping
/// is needed.
fn replace_with_mapping(
    text: &str,
    parent: &Mapping,
    entry: &Entry,
    scalar: &Scalar,
    rest: &[&str],
    pairs: &[(&str, &str)],
) -> Vec<Edit> {
    let key_offset = entry.key.offset();
    let colon = key_colon(text, &entry.key, parent.is_flow());

    if parent.is_flow() {
        let replacement = flow_tail(rest, pairs);
        return match (scalar.style, colon) {
            (ScalarStyle::Implicit, Some(colon)) => vec![Edit::insert(colon + 1, format!(" {}", replacement))],
            (ScalarStyle::Implicit, None) => {
                let end = key_end(text, &entry.key, true);
                vec![Edit::insert(end, format!(": {}", replacement))]
            }
            _ => vec![Edit::replace(scalar_span(text, scalar, true), replacement)],
        };
    }

    let nl = newline(text);
    let block = block_tail(nl, layout::column(text, key_offset) + INDENT, rest, pairs);
    let key_line_end = layout::line_end(text, key_offset);
    let after_colon = colon.map_or(key_line_end, |c| c + 1);

    if scalar.style == ScalarStyle::Implicit {
        return vec![Edit::insert(key_line_end, block)];
    }
    match single_line_span(text, scalar) {
        Some(span) if span.end <= key_line_end => vec![
            Edit::replace(after_colon..span.end, ""),
            Edit::insert(key_line_end, block),
        ],
        _ => vec![Edit::replace(
            after_colon..layout::value_end(text, key_offset),
            block,
        )],
    }
}

/// Overwrite the scalar value of an existing entry.
fn overwrite_value(text: &str, parent: &Mapping, entry: &Entry, scalar: &Scalar, value: &str) -> Vec<Edit> {
    let rendered = render_scalar(value);
    let flow = parent.is_flow();

    if scalar.style == ScalarStyle::Implicit {
        return match key_colon(text, &entry.key, flow) {
            Some(colon) => vec![Edit::insert(colon + 1, format!(" {}", rendered))],
            None => vec![Edit::insert(
                key_end(text, &entry.key, flow),
                format!(": {}", rendered),
            )],
        };
    }

    if flow {
        return vec![Edit::replace(scalar_span(text, scalar, true), rendered)];
    }
    match single_line_span(text, scalar) {
        Some(span) => vec![Edit::replace(span, rendered)],
        None => {
            let key_offset = entry.key.offset();
            let after_colon = key_colon(text, &entry.key, false)
                .map_or(layout::line_end(text, key_offset), |c| c + 1);
            vec![Edit::replace(
                after_colon..layout::value_end(text, key_offset),
                format!(" {}", rendered),
            )]
        }
    }
}

/// Block lines for the rest of a path: each key one level deeper than the
/// last, the pairs one level below the final key.
fn block_tail(nl: &str, column: usize, rest: &[&str], pairs: &[(&str, &str)]) -> String {
    let mut out = String::new();
    let mut column = column;
    for key in rest {
        out.push_str(nl);
        out.push_str(&" ".repeat(column));
        out.push_str(&render_scalar(key));
        out.push(':');
        column += INDENT;
    }
    for (key, value) in pairs {
        push_pair_line(&mut out, nl, column, key, value);
    }
    out
}

/// Flow text for the rest of a path, e.g. `{metadata: {labels: {k: v}}}`.
fn flow_tail(rest: &[&str], pairs: &[(&str, &str)]) -> String {
    let entries: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{}: {}", render_scalar(key), render_scalar(value)))
        .collect();
    let mut out = format!("{{{}}}", entries.join(", "));
    for key in rest.iter().rev() {
        out = format!("{{{}: {}}}", render_scalar(key), out);
    }
    out
}

fn push_pair_line(out: &mut String, nl: &str, column: usize, key: &str, value: &str) {
    out.push_str(nl);
    out.push_str(&" ".repeat(column));
    out.push_str(&render_scalar(key));
    out.push_str(": ");
    out.push_str(&render_scalar(value));
}

fn newline(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}

/// End of a key scalar's text.
fn key_end(text: &str, key: &Node, flow: bool) -> usize {
    match key {
        Node::Scalar(scalar) => scalar_span(text, scalar, flow).end,
        other => other.offset(),
    }
}

/// Position of the `:` after an entry's key.
fn key_colon(text: &str, key: &Node, flow: bool) -> Option<usize> {
    layout::colon_after(text, key_end(text, key, flow))
}

/// Source range of a scalar's first token. Plain scalars are limited to their
/// first line.
fn scalar_span(text: &str, scalar: &Scalar, flow: bool) -> std::ops::Range<usize> {
    let start = scalar.offset;
    let end = match scalar.style {
        ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted => {
            layout::quoted_end(text, start).unwrap_or_else(|| layout::line_end(text, start))
        }
        ScalarStyle::Plain => layout::plain_end(text, start, flow),
        ScalarStyle::Literal | ScalarStyle::Folded => layout::line_end(text, start),
        ScalarStyle::Implicit => start,
    };
    start..end
}

/// The scalar's source range when it is written on a single line.
fn single_line_span(text: &str, scalar: &Scalar) -> Option<std::ops::Range<usize>> {
    if scalar.style.is_block() {
        return None;
    }
    let span = scalar_span(text, scalar, false);
    let source = &text[span.clone()];
    let single = match scalar.style {
        ScalarStyle::Plain => source == scalar.value,
        _ => !source.contains('\n'),
    };
    single.then_some(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::parse(text, 1, 1).unwrap().unwrap()
    }

    fn pairs() -> Vec<ChecksumPair> {
        vec![
            ChecksumPair::for_config_map("app.config", "aaaaaaaaaaa1"),
            ChecksumPair::for_secret("db", "bbbbbbbbbbb2"),
        ]
    }

    fn run(text: &str, mode: Mode) -> String {
        let mut document = doc(text);
        inject(&mut document, &pairs(), mode).unwrap();
        document.text().to_string()
    }

    #[test]
    fn test_appends_to_existing_labels() {
        let input = "\
kind: Deployment
spec:
  template:
    metadata:
      labels:
        app: demo  # keep me
    spec:
      containers: []
";
        let expected = "\
kind: Deployment
spec:
  template:
    metadata:
      labels:
        app: demo  # keep me
        checksum/configmap-app-config: aaaaaaaaaaa1
        checksum/secret-db: bbbbbbbbbbb2
    spec:
      containers: []
";
        assert_eq!(run(input, Mode::Label), expected);
    }

    #[test]
    fn test_creates_missing_annotations() {
        let input = "\
kind: Deployment
spec:
  template:
    metadata:
      labels:
        app: demo
    spec: {}
";
        let expected = "\
kind: Deployment
spec:
  template:
    metadata:
      labels:
        app: demo
      annotations:
        checksum/configmap-app-config: aaaaaaaaaaa1
        checksum/secret-db: bbbbbbbbbbb2
    spec: {}
";
        assert_eq!(run(input, Mode::Annotation), expected);
    }

    #[test]
    fn test_creates_whole_path() {
        let input = "kind: Deployment\nmetadata:\n  name: x\n";
        let expected = "kind: Deployment\nmetadata:\n  name: x\nspec:\n  template:\n    metadata:\n      labels:\n        checksum/configmap-app-config: aaaaaaaaaaa1\n        checksum/secret-db: bbbbbbbbbbb2\n";
        assert_eq!(run(input, Mode::Label), expected);
    }

    #[test]
    fn test_overwrites_existing_value_in_place() {
        let input = "\
spec:
  template:
    metadata:
      annotations:
        checksum/secret-db: \"stale\"   # rotated
        team: core
";
        let expected = "\
spec:
  template:
    metadata:
      annotations:
        checksum/secret-db: bbbbbbbbbbb2   # rotated
        team: core
        checksum/configmap-app-config: aaaaaaaaaaa1
";
        assert_eq!(run(input, Mode::Annotation), expected);
    }

    #[test]
    fn test_unchanged_when_values_match() {
        let input = "\
spec:
  template:
    metadata:
      labels:
        checksum/configmap-app-config: aaaaaaaaaaa1
        checksum/secret-db: 'bbbbbbbbbbb2'
";
        let mut document = doc(input);
        assert!(!inject(&mut document, &pairs(), Mode::Label).unwrap());
        assert_eq!(document.text(), input);
    }

    #[test]
    fn test_empty_pairs_is_noop() {
        let mut document = doc("kind: Deployment\n");
        assert!(!inject(&mut document, &[], Mode::Label).unwrap());
        assert_eq!(document.text(), "kind: Deployment\n");
    }

    #[test]
    fn test_extends_flow_metadata() {
        let input = "spec:\n  template:\n    metadata: {}\n    spec: {}\n";
        let expected = "spec:\n  template:\n    metadata: {labels: {checksum/configmap-app-config: aaaaaaaaaaa1, checksum/secret-db: bbbbbbbbbbb2}}\n    spec: {}\n";
        assert_eq!(run(input, Mode::Label), expected);
    }

    #[test]
    fn test_extends_flow_labels() {
        let input = "spec:\n  template:\n    metadata:\n      labels: {app: demo, }\n";
        let expected = "spec:\n  template:\n    metadata:\n      labels: {app: demo, checksum/configmap-app-config: aaaaaaaaaaa1, checksum/secret-db: bbbbbbbbbbb2 }\n";
        assert_eq!(run(input, Mode::Label), expected);

        let input = "spec: {template: {metadata: {labels: {app: demo}}}}\n";
        let expected = "spec: {template: {metadata: {labels: {app: demo, checksum/configmap-app-config: aaaaaaaaaaa1, checksum/secret-db: bbbbbbbbbbb2}}}}\n";
        assert_eq!(run(input, Mode::Label), expected);
    }

    #[test]
    fn test_replaces_empty_labels() {
        let input = "spec:\n  template:\n    metadata:\n      labels:   # none yet\n    spec: {}\n";
        let expected = "spec:\n  template:\n    metadata:\n      labels:   # none yet\n        checksum/configmap-app-config: aaaaaaaaaaa1\n        checksum/secret-db: bbbbbbbbbbb2\n    spec: {}\n";
        assert_eq!(run(input, Mode::Label), expected);
    }

    #[test]
    fn test_replaces_explicit_null_metadata() {
        let input = "spec:\n  template:\n    metadata: null\n";
        let expected = "spec:\n  template:\n    metadata:\n      labels:\n        checksum/configmap-app-config: aaaaaaaaaaa1\n        checksum/secret-db: bbbbbbbbbbb2\n";
        assert_eq!(run(input, Mode::Label), expected);
    }

    #[test]
    fn test_fills_implicit_value() {
        let input = "spec:\n  template:\n    metadata:\n      labels:\n        checksum/secret-db:\n";
        let expected = "spec:\n  template:\n    metadata:\n      labels:\n        checksum/secret-db: bbbbbbbbbbb2\n        checksum/configmap-app-config: aaaaaaaaaaa1\n";
        assert_eq!(run(input, Mode::Label), expected);
    }

    #[test]
    fn test_numeric_hash_is_quoted() {
        let pairs = vec![ChecksumPair::for_config_map("cfg", "123456789012")];
        let mut document = doc("spec:\n  template:\n    metadata:\n      labels:\n        app: x\n");
        inject(&mut document, &pairs, Mode::Label).unwrap();
        assert!(document.text().contains("checksum/configmap-cfg: \"123456789012\"\n"));
    }

    #[test]
    fn test_later_duplicate_pair_wins() {
        let pairs = vec![
            ChecksumPair::new("checksum/configmap-a-b", "111111111aaa"),
            ChecksumPair::new("checksum/configmap-a-b", "222222222bbb"),
        ];
        let mut document = doc("kind: Deployment\nspec:\n  template:\n    metadata:\n      labels:\n        app: x\n");
        inject(&mut document, &pairs, Mode::Label).unwrap();
        assert_eq!(document.text().matches("checksum/configmap-a-b").count(), 1);
        assert!(document.text().contains("checksum/configmap-a-b: 222222222bbb"));
    }

    #[test]
    fn test_sequence_in_path_is_recoverable_error() {
        let mut document = doc("spec:\n  template: [a, b]\n");
        let err = inject(&mut document, &pairs(), Mode::Label).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("`spec.template` is a sequence"));
        assert_eq!(document.text(), "spec:\n  template: [a, b]\n");
    }

    #[test]
    fn test_preserves_crlf_line_endings() {
        let input = "spec:\r\n  template:\r\n    metadata:\r\n      labels:\r\n        app: x\r\n";
        let output = run(input, Mode::Label);
        assert_eq!(
            output,
            "spec:\r\n  template:\r\n    metadata:\r\n      labels:\r\n        app: x\r\n        checksum/configmap-app-config: aaaaaaaaaaa1\r\n        checksum/secret-db: bbbbbbbbbbb2\r\n"
        );
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let input = "spec:\n  template:\n    metadata: {}\n";
        let once = run(input, Mode::Annotation);
        let twice = run(&once, Mode::Annotation);
        assert_eq!(once, twice);
    }
}
