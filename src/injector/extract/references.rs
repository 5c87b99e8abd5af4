//! ConfigMap and Secret reference discovery.

use crate::injector::extract::pod_spec::{all_containers, volumes};
use crate::injector::resources::{Container, Deployment, Volume};
use crate::injector::types::{RefCollector, ResourceRefs};

/// Names of every ConfigMap and Secret the Deployment's pod template consumes
/// through volumes, `envFrom` or `env[].valueFrom`.
///
/// Literal env values contribute nothing. Both lists come back sorted with
/// duplicates and empty names removed.
pub fn referenced_objects(deployment: &Deployment) -> ResourceRefs {
    let mut refs = RefCollector::default();
    let Some(spec) = deployment.pod_spec() else {
        return refs.finish();
    };

    for volume in volumes(spec) {
        collect_volume(volume, &mut refs);
    }
    for container in all_containers(spec) {
        collect_container(container, &mut refs);
    }

    refs.finish()
}

fn collect_volume(volume: &Volume, refs: &mut RefCollector) {
    if let Some(cm) = &volume.config_map {
        refs.config_map(cm.name.as_deref());
    }
    if let Some(secret) = &volume.secret {
        refs.secret(secret.secret_name.as_deref());
    }
    let projections = volume
        .projected
        .as_ref()
        .and_then(|p| p.sources.as_ref())
        .into_iter()
        .flatten();
    for source in projections {
        if let Some(cm) = &source.config_map {
            refs.config_map(cm.name.as_deref());
        }
        if let Some(secret) = &source.secret {
            refs.secret(secret.name.as_deref());
        }
    }
}

fn collect_container(container: &Container, refs: &mut RefCollector) {
    for env_from in container.env_from.iter().flatten() {
        if let Some(r) = &env_from.config_map_ref {
            refs.config_map(r.name.as_deref());
        }
        if let Some(r) = &env_from.secret_ref {
            refs.secret(r.name.as_deref());
        }
    }

    let sources = container
        .env
        .iter()
        .flatten()
        .filter_map(|var| var.value_from.as_ref());
    for source in sources {
        if let Some(r) = &source.config_map_key_ref {
            refs.config_map(r.name.as_deref());
        }
        if let Some(r) = &source.secret_key_ref {
            refs.secret(r.name.as_deref());
        }
    }
}
