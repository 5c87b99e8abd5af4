//! Content hashing for ConfigMaps and Secrets.

use sha2::{Digest, Sha256};

use crate::injector::resources::{ConfigMap, Secret};

/// Number of hex characters kept from the digest.
pub const HASH_LEN: usize = 12;

/// Hash key/value content independent of the order it is supplied in.
///
/// Entries are sorted by key bytes, then each key is fed to SHA-256
/// immediately followed by its value, with no separators. The result is the
/// first [`HASH_LEN`] lowercase hex characters of the digest.
pub fn content_hash<K, V, I>(entries: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let mut entries: Vec<(K, V)> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

    let mut hasher = Sha256::new();
    for (key, value) in &entries {
        hasher.update(key.as_ref());
        hasher.update(value.as_ref());
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_LEN);
    digest
}

pub fn hash_config_map(config_map: &ConfigMap) -> String {
    content_hash(config_map.payload())
}

pub fn hash_secret(secret: &Secret) -> String {
    content_hash(secret.payload())
}
