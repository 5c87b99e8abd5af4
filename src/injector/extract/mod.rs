//! Extractors for data the injector needs from decoded resources.

pub mod pod_spec;
pub mod references;

pub use pod_spec::*;
pub use references::*;
