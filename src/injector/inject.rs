//! Checksum injection orchestration.
//!
//! Ties together parsing, classification, hashing and mutation:
//!
//! 1. parse the stream into format-preserving documents
//! 2. hash every decodable ConfigMap and Secret by name
//! 3. for every decodable Deployment, resolve its references against the
//!    tables and write the matching checksum pairs into its pod template
//! 4. re-encode all documents in their original order

use crate::error::Result;
use crate::injector::classify::{ResourceKind, classify};
use crate::injector::extract::referenced_objects;
use crate::injector::hash::{hash_config_map, hash_secret};
use crate::injector::mutate::inject;
use crate::injector::parser::{Document, parse_stream, render_stream};
use crate::injector::resources::{ConfigMap, Deployment, Resource, Secret, decode};
use crate::injector::types::{ChecksumTable, ChecksumTables, Mode};

/// Counters for one injection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectSummary {
    /// Non-empty documents in the stream.
    pub documents: usize,
    /// ConfigMaps hashed into the table.
    pub config_maps: usize,
    /// Secrets hashed into the table.
    pub secrets: usize,
    /// Deployments seen (decodable or not).
    pub deployments: usize,
    /// Deployments whose text changed.
    pub deployments_updated: usize,
    /// Documents passed through because typed decoding failed.
    pub decode_failures: usize,
    /// Deployments left unchanged because of their tree shape.
    pub skipped: usize,
}

/// Output stream plus run counters.
#[derive(Debug, Clone)]
pub struct InjectResult {
    pub output: String,
    pub summary: InjectSummary,
}

/// Inject checksum markers into every Deployment of a manifest stream.
///
/// Returns the re-encoded stream. Parse and render failures fail the whole
/// call; nothing is emitted for a partially processed stream.
pub fn inject_checksums(input: &str, mode: Mode) -> Result<String> {
    process(input, mode).map(|result| result.output)
}

/// Like [`inject_checksums`], also returning the run counters.
pub fn process(input: &str, mode: Mode) -> Result<InjectResult> {
    let mut documents = parse_stream(input)?;
    let mut summary = InjectSummary {
        documents: documents.len(),
        ..Default::default()
    };

    let tables = build_tables(&documents, &mut summary);

    for document in documents.iter_mut() {
        if classify(document) != ResourceKind::Deployment {
            continue;
        }
        summary.deployments += 1;
        update_deployment(document, &tables, mode, &mut summary)?;
    }

    log::info!(
        "Processed {} document(s): {} ConfigMap(s) and {} Secret(s) hashed, {} of {} Deployment(s) updated ({} mode)",
        summary.documents,
        summary.config_maps,
        summary.secrets,
        summary.deployments_updated,
        summary.deployments,
        mode
    );

    Ok(InjectResult {
        output: render_stream(&documents),
        summary,
    })
}

/// Hash every ConfigMap and Secret. Later documents win on name collisions.
fn build_tables(documents: &[Document], summary: &mut InjectSummary) -> ChecksumTables {
    let mut tables = ChecksumTables::default();
    for document in documents {
        match classify(document) {
            ResourceKind::ConfigMap => {
                if let Some(cm) = decode_or_skip::<ConfigMap>(document, summary) {
                    let hash = hash_config_map(&cm);
                    if record(&mut tables.config_maps, document, &cm, hash) {
                        summary.config_maps += 1;
                    }
                }
            }
            ResourceKind::Secret => {
                if let Some(secret) = decode_or_skip::<Secret>(document, summary) {
                    let hash = hash_secret(&secret);
                    if record(&mut tables.secrets, document, &secret, hash) {
                        summary.secrets += 1;
                    }
                }
            }
            ResourceKind::Deployment | ResourceKind::Other => {}
        }
    }
    tables
}

/// Add a resource's hash to its table. Returns false for unnamed resources.
fn record<R: Resource>(table: &mut ChecksumTable, document: &Document, resource: &R, hash: String) -> bool {
    let name = resource.name();
    if name.is_empty() {
        log::debug!(
            "Document {}: {} without a name is not hashed",
            document.index(),
            R::KIND
        );
        return false;
    }

    log::debug!("{} {} hashes to {}", R::KIND, name, hash);
    if let Some(previous) = table.insert(name, hash) {
        log::warn!(
            "Document {}: duplicate {} '{}' replaces an earlier one (hash {})",
            document.index(),
            R::KIND,
            name,
            previous
        );
    }
    true
}

fn update_deployment(
    document: &mut Document,
    tables: &ChecksumTables,
    mode: Mode,
    summary: &mut InjectSummary,
) -> Result<()> {
    let Some(deployment) = decode_or_skip::<Deployment>(document, summary) else {
        return Ok(());
    };

    let refs = referenced_objects(&deployment);
    log::debug!(
        "Deployment '{}' references ConfigMaps {:?} and Secrets {:?}",
        deployment.name(),
        refs.config_maps,
        refs.secrets
    );
    let pairs = tables.pairs_for(&refs);
    if pairs.is_empty() {
        return Ok(());
    }

    match inject(document, &pairs, mode) {
        Ok(true) => summary.deployments_updated += 1,
        Ok(false) => {}
        Err(e) if e.is_recoverable() => {
            log::warn!("Skipping Deployment '{}': {}", deployment.name(), e);
            summary.skipped += 1;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn decode_or_skip<R: Resource>(document: &Document, summary: &mut InjectSummary) -> Option<R> {
    match decode::<R>(document) {
        Ok(resource) => Some(resource),
        Err(e) => {
            log::debug!("Passing through document {}: {}", document.index(), e);
            summary.decode_failures += 1;
            None
        }
    }
}
