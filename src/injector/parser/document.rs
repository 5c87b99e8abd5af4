//! Format-preserving YAML documents.
//!
//! A [`Document`] keeps the exact source text of one YAML document together
//! with a node tree built from yaml-rust2's marked event stream. Nothing is
//! ever re-serialized: edits are applied as byte-range splices on the text and
//! the tree is rebuilt from the result, so every byte outside an edit survives
//! unchanged, comments and quoting included.

use std::ops::Range;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::layout;
use super::node::{CollectionStyle, Entry, Mapping, Node, Scalar, ScalarStyle, Sequence};

/// Error type for document parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("document {document} (starting at line {line}): {message}")]
    Syntax {
        document: usize,
        line: usize,
        message: String,
    },
    #[error("document {document} (starting at line {line}) holds more than one YAML document")]
    MultipleDocuments { document: usize, line: usize },
    #[error("document {document} (starting at line {line}) has no content after editing")]
    EmptiedByEdit { document: usize, line: usize },
}

/// A single byte-range replacement on a document's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Edit {
    /// Insert `text` at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            range: offset..offset,
            replacement: text.into(),
        }
    }

    /// Replace `range` with `text`.
    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            replacement: text.into(),
        }
    }
}

/// One YAML document: its source text and the tree indexing it.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    root: Node,
    explicit_start: bool,
    index: usize,
    line: usize,
}

impl Document {
    /// Parse one document's text.
    ///
    /// `index` is the document's 1-based position in the input stream and
    /// `line` the input line it starts on; both only feed diagnostics.
    /// Returns `Ok(None)` for a document without content.
    pub fn parse(
        text: impl Into<String>,
        index: usize,
        line: usize,
    ) -> Result<Option<Self>, ParseError> {
        let text = text.into();
        let mut roots = {
            let mut builder = TreeBuilder::new(&text);
            let mut parser = Parser::new_from_str(&text);
            parser
                .load(&mut builder, true)
                .map_err(|e| ParseError::Syntax {
                    document: index,
                    line,
                    message: e.to_string(),
                })?;
            builder.finish()
        };

        if roots.len() > 1 {
            return Err(ParseError::MultipleDocuments {
                document: index,
                line,
            });
        }
        let Some(root) = roots.pop() else {
            return Ok(None);
        };
        if root.is_implicit() {
            return Ok(None);
        }

        let explicit_start = layout::has_start_marker(&text);
        Ok(Some(Self {
            text,
            root,
            explicit_start,
            index,
            line,
        }))
    }

    /// The document's source text, including its `---` line and any leading
    /// comments.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Whether the text carries its own `---` marker.
    pub fn has_explicit_start(&self) -> bool {
        self.explicit_start
    }

    /// 1-based position in the input stream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Input line the document starts on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Apply non-overlapping edits and rebuild the tree from the new text.
    ///
    /// Insertions at the same offset end up in the order they were given. On
    /// error the document is left as it was.
    pub fn apply(&mut self, edits: Vec<Edit>) -> Result<(), ParseError> {
        if edits.is_empty() {
            return Ok(());
        }

        let mut ordered: Vec<(usize, Edit)> = edits.into_iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            b.range.start.cmp(&a.range.start).then(ib.cmp(ia))
        });
        let mut text = self.text.clone();
        for (_, edit) in ordered {
            text.replace_range(edit.range, &edit.replacement);
        }

        match Self::parse(text, self.index, self.line)? {
            Some(document) => {
                *self = document;
                Ok(())
            }
            None => Err(ParseError::EmptiedByEdit {
                document: self.index,
                line: self.line,
            }),
        }
    }
}

/// Builds [`Node`] trees from parser events.
struct TreeBuilder<'a> {
    text: &'a str,
    /// Byte offset of every char index, plus the end of the text.
    char_offsets: Vec<usize>,
    stack: Vec<Frame>,
    roots: Vec<Node>,
}

enum Frame {
    Mapping { mapping: Mapping, key: Option<Node> },
    Sequence(Sequence),
}

impl<'a> TreeBuilder<'a> {
    fn new(text: &'a str) -> Self {
        let char_offsets = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        Self {
            text,
            char_offsets,
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn finish(self) -> Vec<Node> {
        self.roots
    }

    fn byte_offset(&self, mark: &Marker) -> usize {
        self.char_offsets
            .get(mark.index())
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Flow collections start with their bracket (after any anchor or tag).
    /// Block mappings are re-anchored to their first key once it is known,
    /// since the event mark sits on the first `:`.
    fn collection_start(&self, offset: usize, open: u8) -> (CollectionStyle, usize) {
        let start = layout::skip_properties(self.text, offset);
        if self.text.as_bytes().get(start) == Some(&open) {
            (CollectionStyle::Flow, start)
        } else {
            (CollectionStyle::Block, offset)
        }
    }

    fn scalar_style(&self, style: TScalarStyle, value: &str, offset: usize) -> ScalarStyle {
        match style {
            // A missing node comes through as an empty plain scalar (or `~` on
            // older parsers) marked at the following token.
            TScalarStyle::Plain => {
                if value.is_empty() || (value == "~" && !self.text[offset..].starts_with('~')) {
                    ScalarStyle::Implicit
                } else {
                    ScalarStyle::Plain
                }
            }
            TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
            TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
            TScalarStyle::Literal => ScalarStyle::Literal,
            _ => ScalarStyle::Folded,
        }
    }

    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            None => self.roots.push(node),
            Some(Frame::Sequence(sequence)) => sequence.items.push(node),
            Some(Frame::Mapping { mapping, key }) => match key.take() {
                None => *key = Some(node),
                Some(key) => mapping.entries.push(Entry { key, value: node }),
            },
        }
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, event: Event, mark: Marker) {
        let offset = self.byte_offset(&mark);
        match event {
            Event::Scalar(value, style, ..) => {
                let value: String = value.into();
                let style = self.scalar_style(style, &value, offset);
                self.push(Node::Scalar(Scalar {
                    value,
                    style,
                    offset,
                }));
            }
            Event::Alias(..) => self.push(Node::Alias { offset }),
            Event::MappingStart(..) => {
                let (style, offset) = self.collection_start(offset, b'{');
                self.stack.push(Frame::Mapping {
                    mapping: Mapping {
                        style,
                        offset,
                        entries: Vec::new(),
                    },
                    key: None,
                });
            }
            Event::SequenceStart(..) => {
                let (style, offset) = self.collection_start(offset, b'[');
                self.stack.push(Frame::Sequence(Sequence {
                    style,
                    offset,
                    items: Vec::new(),
                }));
            }
            Event::MappingEnd | Event::SequenceEnd => {
                let node = match self.stack.pop() {
                    Some(Frame::Mapping { mut mapping, .. }) => {
                        if mapping.style == CollectionStyle::Block {
                            if let Some(first) = mapping.entries.first() {
                                mapping.offset = first.key.offset();
                            }
                        }
                        Node::Mapping(mapping)
                    }
                    Some(Frame::Sequence(sequence)) => Node::Sequence(sequence),
                    None => return,
                };
                self.push(node);
            }
            _ => {}
        }
    }
}
