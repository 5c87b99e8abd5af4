//! PodSpec extraction utilities.

use crate::injector::resources::{Container, PodSpec, Volume};

/// Iterate over init containers followed by regular containers.
pub fn all_containers(spec: &PodSpec) -> impl Iterator<Item = &Container> {
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter().flatten())
}

/// Iterate over the pod's volumes.
pub fn volumes(spec: &PodSpec) -> impl Iterator<Item = &Volume> {
    spec.volumes.iter().flatten()
}
