//! Core types shared across the injection pipeline.
//!
//! - `Mode` - where checksum markers are written (labels or annotations)
//! - `ChecksumPair` - one `checksum/<kind>-<name>` key and its hash
//! - `ChecksumTable` / `ChecksumTables` - resource name to hash lookups
//! - `ResourceRefs` - ConfigMap and Secret names a Deployment depends on

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Key prefix for ConfigMap checksums.
pub const CONFIG_MAP_KEY_PREFIX: &str = "checksum/configmap-";
/// Key prefix for Secret checksums.
pub const SECRET_KEY_PREFIX: &str = "checksum/secret-";

/// Where checksum markers are injected in the pod template metadata.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// `spec.template.metadata.labels`
    #[default]
    Label,
    /// `spec.template.metadata.annotations`
    Annotation,
}

impl Mode {
    /// Parse a mode from its command-line spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "label" => Some(Self::Label),
            "annotation" => Some(Self::Annotation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Annotation => "annotation",
        }
    }

    /// The pod template metadata field this mode writes into.
    pub fn metadata_field(&self) -> &'static str {
        match self {
            Self::Label => "labels",
            Self::Annotation => "annotations",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("invalid mode: {} (must be 'label' or 'annotation')", s)
        })
    }
}

/// Replace every `.` in a resource name with `-` so it can be used inside a
/// label key.
pub fn sanitize_name(name: &str) -> String {
    name.replace('.', "-")
}

/// A checksum key and its value, ready to be written into a pod template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPair {
    pub key: String,
    pub value: String,
}

impl ChecksumPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `checksum/configmap-<sanitized name>`
    pub fn for_config_map(name: &str, hash: &str) -> Self {
        Self::new(format!("{}{}", CONFIG_MAP_KEY_PREFIX, sanitize_name(name)), hash)
    }

    /// `checksum/secret-<sanitized name>`
    pub fn for_secret(name: &str, hash: &str) -> Self {
        Self::new(format!("{}{}", SECRET_KEY_PREFIX, sanitize_name(name)), hash)
    }
}

/// Resource name to content hash, for one resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumTable {
    hashes: HashMap<String, String>,
}

impl ChecksumTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hash. Later entries replace earlier ones with the same name;
    /// the replaced hash is returned.
    pub fn insert(&mut self, name: impl Into<String>, hash: impl Into<String>) -> Option<String> {
        self.hashes.insert(name.into(), hash.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.hashes.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// ConfigMap and Secret checksum tables for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumTables {
    pub config_maps: ChecksumTable,
    pub secrets: ChecksumTable,
}

impl ChecksumTables {
    /// Checksum pairs for every reference that has a known hash: ConfigMaps
    /// first, then Secrets, each in the (sorted) order of `refs`.
    pub fn pairs_for(&self, refs: &ResourceRefs) -> Vec<ChecksumPair> {
        let config_maps = refs.config_maps.iter().filter_map(|name| {
            self.config_maps
                .get(name)
                .map(|hash| ChecksumPair::for_config_map(name, hash))
        });
        let secrets = refs.secrets.iter().filter_map(|name| {
            self.secrets
                .get(name)
                .map(|hash| ChecksumPair::for_secret(name, hash))
        });
        config_maps.chain(secrets).collect()
    }
}

/// Names of the ConfigMaps and Secrets a workload references, each sorted and
/// without duplicates or empty names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRefs {
    pub config_maps: Vec<String>,
    pub secrets: Vec<String>,
}

impl ResourceRefs {
    pub fn is_empty(&self) -> bool {
        self.config_maps.is_empty() && self.secrets.is_empty()
    }
}

/// Accumulates references while walking a pod spec.
#[derive(Debug, Default)]
pub struct RefCollector {
    config_maps: BTreeSet<String>,
    secrets: BTreeSet<String>,
}

impl RefCollector {
    pub fn config_map(&mut self, name: Option<&str>) {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.config_maps.insert(name.to_string());
        }
    }

    pub fn secret(&mut self, name: Option<&str>) {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.secrets.insert(name.to_string());
        }
    }

    pub fn finish(self) -> ResourceRefs {
        ResourceRefs {
            config_maps: self.config_maps.into_iter().collect(),
            secrets: self.secrets.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("label"), Some(Mode::Label));
        assert_eq!(Mode::parse("annotation"), Some(Mode::Annotation));
        assert_eq!(Mode::parse("Label"), None);
        assert_eq!(Mode::parse("labels"), None);
        assert!("bogus".parse::<Mode>().unwrap_err().contains("invalid mode: bogus"));
        assert_eq!(Mode::default(), Mode::Label);
    }

    #[test]
    fn test_mode_metadata_field() {
        assert_eq!(Mode::Label.metadata_field(), "labels");
        assert_eq!(Mode::Annotation.metadata_field(), "annotations");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("a.b.c"), "a-b-c");
        assert_eq!(sanitize_name("no-dots"), "no-dots");
        assert_eq!(sanitize_name("mixed.name-here"), "mixed-name-here");
    }

    #[test]
    fn test_checksum_pair_keys() {
        assert_eq!(
            ChecksumPair::for_config_map("app.config", "abc").key,
            "checksum/configmap-app-config"
        );
        assert_eq!(
            ChecksumPair::for_secret("top.secret", "def").key,
            "checksum/secret-top-secret"
        );
    }

    #[test]
    fn test_table_last_insert_wins() {
        let mut table = ChecksumTable::new();
        assert_eq!(table.insert("app", "111111111111"), None);
        assert_eq!(
            table.insert("app", "222222222222"),
            Some("111111111111".to_string())
        );
        assert_eq!(table.get("app"), Some("222222222222"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_pairs_for_skips_unknown_names() {
        let mut tables = ChecksumTables::default();
        tables.config_maps.insert("app.config", "111111111111");
        tables.secrets.insert("top.secret", "333333333333");

        let refs = ResourceRefs {
            config_maps: vec!["app.config".into(), "missing".into()],
            secrets: vec!["top.secret".into()],
        };
        let pairs = tables.pairs_for(&refs);
        assert_eq!(
            pairs,
            vec![
                ChecksumPair::new("checksum/configmap-app-config", "111111111111"),
                ChecksumPair::new("checksum/secret-top-secret", "333333333333"),
            ]
        );
    }

    #[test]
    fn test_collector_sorts_and_dedupes() {
        let mut collector = RefCollector::default();
        collector.config_map(Some("b"));
        collector.config_map(Some("a"));
        collector.config_map(Some("b"));
        collector.config_map(Some(""));
        collector.config_map(None);
        collector.secret(Some("s"));

        let refs = collector.finish();
        assert_eq!(refs.config_maps, vec!["a", "b"]);
        assert_eq!(refs.secrets, vec!["s"]);
        assert!(!refs.is_empty());
    }
}
