//! Format-preserving parsing of Kubernetes manifest streams.

pub mod document;
pub mod layout;
pub mod node;
pub mod stream;

pub use document::{Document, Edit, ParseError};
pub use node::{CollectionStyle, Entry, Mapping, Node, Scalar, ScalarStyle, Sequence};
pub use stream::{parse_stream, render_stream, split_documents};
