//! Node types of the format-preserving document tree.
//!
//! Every node records the byte offset of its first token in the owning
//! document's text. Offsets are what the mutator uses to splice new content
//! into the original text without re-serializing anything it did not touch.

/// How a scalar was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` block scalar.
    Literal,
    /// `>` block scalar.
    Folded,
    /// A value the parser synthesized for a missing node, e.g. `labels:` with
    /// nothing after it. It occupies no source text.
    Implicit,
}

impl ScalarStyle {
    /// Whether the scalar spans the following lines by construction.
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Literal | Self::Folded)
    }
}

/// Block (indentation based) or flow (`{}` / `[]`) collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStyle {
    Block,
    Flow,
}

/// A scalar node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    /// The resolved string value.
    pub value: String,
    pub style: ScalarStyle,
    /// Offset of the first character (the opening quote or block indicator
    /// for non-plain styles).
    pub offset: usize,
}

/// A key/value pair of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Node,
    pub value: Node,
}

/// A mapping node; entries keep their source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub style: CollectionStyle,
    /// Offset of `{` for flow mappings, of the first key for block mappings.
    pub offset: usize,
    pub entries: Vec<Entry>,
}

impl Mapping {
    /// Find the entry whose key is a scalar equal to `key`.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| entry.key.as_str() == Some(key))
    }

    pub fn is_flow(&self) -> bool {
        self.style == CollectionStyle::Flow
    }
}

/// A sequence node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub style: CollectionStyle,
    pub offset: usize,
    pub items: Vec<Node>,
}

/// One node of a document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(Scalar),
    Mapping(Mapping),
    Sequence(Sequence),
    /// `*anchor` reference.
    Alias { offset: usize },
}

impl Node {
    /// Offset of the node's first token.
    pub fn offset(&self) -> usize {
        match self {
            Node::Scalar(s) => s.offset,
            Node::Mapping(m) => m.offset,
            Node::Sequence(s) => s.offset,
            Node::Alias { offset } => *offset,
        }
    }

    /// The scalar value, if this node is a scalar that occupies source text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(s) if s.style != ScalarStyle::Implicit => Some(&s.value),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Whether the node is a null the parser synthesized (no source text).
    pub fn is_implicit(&self) -> bool {
        matches!(self, Node::Scalar(s) if s.style == ScalarStyle::Implicit)
    }

    /// Short human name of the node type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Alias { .. } => "alias",
        }
    }
}
