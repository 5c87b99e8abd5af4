//! # k8s-checksum-injector
//!
//! A filter for Kubernetes manifest streams that makes Deployments roll when
//! the ConfigMaps and Secrets they consume change.
//!
//! Every ConfigMap and Secret in the stream is hashed by content. Each
//! Deployment that references one of them (through volumes, `envFrom` or
//! `env[].valueFrom`) receives a `checksum/configmap-<name>` or
//! `checksum/secret-<name>` entry in its pod template labels or annotations.
//! Everything else in the stream, comments and quoting included, is written
//! back unchanged.
//!
//! ## Example
//!
//! ```rust
//! use checksum_injector::{Mode, inject_checksums};
//!
//! let input = "\
//! kind: ConfigMap
//! metadata:
//!   name: settings
//! data:
//!   level: debug
//! ---
//! kind: Deployment
//! metadata:
//!   name: web
//! spec:
//!   template:
//!     spec:
//!       containers:
//!         - name: web
//!           envFrom:
//!             - configMapRef:
//!                 name: settings
//! ";
//! let output = inject_checksums(input, Mode::Annotation).unwrap();
//! assert!(output.contains("checksum/configmap-settings: "));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod injector;

pub use error::{InjectorError, Result};
pub use injector::{InjectSummary, Mode, inject_checksums};
