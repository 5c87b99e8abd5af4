//! Resource kind classification.
//!
//! Routing only looks at the tree's top-level `kind` scalar, so documents that
//! would not survive typed decoding can still be classified and passed through.

use std::fmt;

use crate::injector::parser::{Document, Node};

/// Resource kinds the injector distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
    Deployment,
    /// Anything else; passed through untouched.
    Other,
}

impl ResourceKind {
    /// Map a Kubernetes `kind` string onto a resource kind.
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "ConfigMap" => Self::ConfigMap,
            "Secret" => Self::Secret,
            "Deployment" => Self::Deployment,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::Deployment => "Deployment",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The document's top-level `kind`, or `""` when the root is not a mapping,
/// has no `kind` key, or `kind` is not a scalar.
pub fn kind_of(document: &Document) -> &str {
    let Node::Mapping(root) = document.root() else {
        return "";
    };
    root.get("kind")
        .and_then(|entry| entry.value.as_str())
        .unwrap_or("")
}

/// Classify a document for routing.
pub fn classify(document: &Document) -> ResourceKind {
    ResourceKind::from_kind(kind_of(document))
}
