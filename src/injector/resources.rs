//! Typed projections of ConfigMap, Secret and Deployment documents.
//!
//! Only the fields needed for hashing and reference discovery are modelled.
//! Unknown fields are ignored and missing ones default, but a field with the
//! wrong shape fails decoding of the whole document, which then passes through
//! the pipeline untouched.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::injector::classify::ResourceKind;
use crate::injector::parser::Document;

/// Error decoding a document into a typed resource.
#[derive(Debug, thiserror::Error)]
#[error("cannot decode document {document} as {kind}: {source}")]
pub struct DecodeError {
    pub document: usize,
    pub kind: ResourceKind,
    #[source]
    pub source: serde_yaml::Error,
}

/// Resources that can be decoded from a document.
pub trait Resource: for<'de> Deserialize<'de> {
    const KIND: ResourceKind;

    /// `metadata.name`, empty when absent.
    fn name(&self) -> &str;
}

/// Decode a document's content as `R`.
pub fn decode<R: Resource>(document: &Document) -> Result<R, DecodeError> {
    serde_yaml::from_str(document.text()).map_err(|source| DecodeError {
        document: document.index(),
        kind: R::KIND,
        source,
    })
}

/// Base64-encoded bytes, as used by `Secret.data` and `ConfigMap.binaryData`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteString(pub Vec<u8>);

impl<'de> Deserialize<'de> for ByteString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map(ByteString)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
    pub annotations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigMap {
    pub metadata: ObjectMeta,
    pub data: Option<BTreeMap<String, Option<String>>>,
    pub binary_data: Option<BTreeMap<String, ByteString>>,
}

impl ConfigMap {
    /// `binaryData` and `data` merged into one byte-keyed map; `data` wins on
    /// a key present in both.
    pub fn payload(&self) -> BTreeMap<String, Vec<u8>> {
        let mut payload: BTreeMap<String, Vec<u8>> = self
            .binary_data
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.0.clone()))
            .collect();
        for (key, value) in self.data.iter().flatten() {
            payload.insert(key.clone(), value.clone().unwrap_or_default().into_bytes());
        }
        payload
    }
}

impl Resource for ConfigMap {
    const KIND: ResourceKind = ResourceKind::ConfigMap;

    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Secret {
    pub metadata: ObjectMeta,
    pub data: Option<BTreeMap<String, ByteString>>,
    pub string_data: Option<BTreeMap<String, Option<String>>>,
}

impl Secret {
    /// `data` and `stringData` merged into one byte-keyed map; `stringData`
    /// wins on a key present in both, as it does on the API server.
    pub fn payload(&self) -> BTreeMap<String, Vec<u8>> {
        let mut payload: BTreeMap<String, Vec<u8>> = self
            .data
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.0.clone()))
            .collect();
        for (key, value) in self.string_data.iter().flatten() {
            payload.insert(key.clone(), value.clone().unwrap_or_default().into_bytes());
        }
        payload
    }
}

impl Resource for Secret {
    const KIND: ResourceKind = ResourceKind::Secret;

    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub spec: Option<DeploymentSpec>,
}

impl Deployment {
    /// The pod template's spec, if present.
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref()?.template.as_ref()?.spec.as_ref()
    }
}

impl Resource for Deployment {
    const KIND: ResourceKind = ResourceKind::Deployment;

    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeploymentSpec {
    pub template: Option<PodTemplateSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodTemplateSpec {
    pub metadata: Option<ObjectMeta>,
    pub spec: Option<PodSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodSpec {
    pub volumes: Option<Vec<Volume>>,
    pub containers: Option<Vec<Container>>,
    pub init_containers: Option<Vec<Container>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Volume {
    pub name: Option<String>,
    pub config_map: Option<LocalObjectReference>,
    pub secret: Option<SecretVolumeSource>,
    pub projected: Option<ProjectedVolumeSource>,
}

/// Any `{name: ...}` reference: `configMapRef`, `configMapKeyRef`,
/// `configMap` volume sources and projections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocalObjectReference {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretVolumeSource {
    pub secret_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectedVolumeSource {
    pub sources: Option<Vec<VolumeProjection>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeProjection {
    pub config_map: Option<LocalObjectReference>,
    pub secret: Option<LocalObjectReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Container {
    pub name: Option<String>,
    pub env_from: Option<Vec<EnvFromSource>>,
    pub env: Option<Vec<EnvVar>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvFromSource {
    pub config_map_ref: Option<LocalObjectReference>,
    pub secret_ref: Option<LocalObjectReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvVar {
    pub name: Option<String>,
    pub value: Option<String>,
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvVarSource {
    pub config_map_key_ref: Option<LocalObjectReference>,
    pub secret_key_ref: Option<LocalObjectReference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::parse(text, 1, 1).unwrap().unwrap()
    }

    #[test]
    fn test_decode_config_map() {
        let cm: ConfigMap = decode(&doc(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: app.config\ndata:\n  b: two\n  a: one\n",
        ))
        .unwrap();
        assert_eq!(cm.name(), "app.config");
        let payload = cm.payload();
        assert_eq!(payload.get("a").map(Vec::as_slice), Some(&b"one"[..]));
        assert_eq!(payload.get("b").map(Vec::as_slice), Some(&b"two"[..]));
    }

    #[test]
    fn test_config_map_binary_data_is_merged() {
        let cm: ConfigMap = decode(&doc(
            "kind: ConfigMap\nmetadata:\n  name: bin\ndata:\n  same: text\nbinaryData:\n  blob: AAEC\n  same: AAEC\n",
        ))
        .unwrap();
        let payload = cm.payload();
        assert_eq!(payload.get("blob"), Some(&vec![0u8, 1, 2]));
        assert_eq!(payload.get("same"), Some(&b"text".to_vec()));
    }

    #[test]
    fn test_secret_string_data_wins_on_conflict() {
        // "b2xk" is base64 for "old".
        let secret: Secret = decode(&doc(
            "kind: Secret\nmetadata:\n  name: creds\ndata:\n  password: b2xk\n  user: b2xk\nstringData:\n  password: new\n",
        ))
        .unwrap();
        let payload = secret.payload();
        assert_eq!(payload.get("password"), Some(&b"new".to_vec()));
        assert_eq!(payload.get("user"), Some(&b"old".to_vec()));
    }

    #[test]
    fn test_secret_base64_tolerates_line_breaks() {
        let secret: Secret = decode(&doc(
            "kind: Secret\ndata:\n  cert: |\n    aGVs\n    bG8=\n",
        ))
        .unwrap();
        assert_eq!(secret.payload().get("cert"), Some(&b"hello".to_vec()));
        assert_eq!(secret.name(), "");
    }

    #[test]
    fn test_secret_invalid_base64_fails() {
        let err = decode::<Secret>(&doc("kind: Secret\ndata:\n  key: '***'\n")).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Secret);
        assert!(err.to_string().contains("cannot decode document 1 as Secret"));
    }

    #[test]
    fn test_null_values_decode_empty() {
        let cm: ConfigMap = decode(&doc("kind: ConfigMap\ndata:\n  empty:\n")).unwrap();
        assert_eq!(cm.payload().get("empty"), Some(&Vec::new()));
    }

    #[test]
    fn test_wrong_shape_fails() {
        assert!(decode::<ConfigMap>(&doc("kind: ConfigMap\ndata: [a, b]\n")).is_err());
        assert!(
            decode::<Deployment>(&doc(
                "kind: Deployment\nspec:\n  template:\n    metadata:\n      labels: [a]\n"
            ))
            .is_err()
        );
    }

    #[test]
    fn test_decode_deployment_ignores_unknown_fields() {
        let dep: Deployment = decode(&doc(
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: demo\nspec:\n  replicas: 2\n  template:\n    spec:\n      containers:\n        - name: app\n          image: demo:latest\n          envFrom:\n            - configMapRef:\n                name: shared\n",
        ))
        .unwrap();
        assert_eq!(dep.name(), "demo");
        let containers = dep.pod_spec().unwrap().containers.as_ref().unwrap();
        let env_from = containers[0].env_from.as_ref().unwrap();
        assert_eq!(
            env_from[0].config_map_ref.as_ref().unwrap().name.as_deref(),
            Some("shared")
        );
    }
}
