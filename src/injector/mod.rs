//! # Checksum injector
//!
//! Rolls Deployments when the ConfigMaps or Secrets they consume change, by
//! writing a content hash of each referenced resource into the pod template as
//! `checksum/configmap-<name>` / `checksum/secret-<name>` labels or
//! annotations.
//!
//! ## Example
//!
//! ```rust,no_run
//! use checksum_injector::injector::{Mode, inject_checksums};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifests = std::fs::read_to_string("manifests.yaml")?;
//! let output = inject_checksums(&manifests, Mode::Annotation)?;
//! print!("{}", output);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod extract;
pub mod hash;
pub mod inject;
pub mod mutate;
pub mod parser;
pub mod quote;
pub mod resources;
pub mod types;

pub use classify::{ResourceKind, classify, kind_of};
pub use extract::referenced_objects;
pub use hash::{content_hash, hash_config_map, hash_secret};
pub use inject::{InjectResult, InjectSummary, inject_checksums, process};
pub use mutate::MutateError;
pub use parser::{Document, ParseError};
pub use resources::DecodeError;
pub use types::{ChecksumPair, ChecksumTables, Mode, ResourceRefs, sanitize_name};
