pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::injector::Mode;
pub use types::InjectorConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    InvalidMode(String),
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<InjectorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Pick the injection mode: an explicit flag wins over the config file, which
/// wins over the default. An invalid mode in the file is an error even when
/// the flag overrides it.
pub fn resolve_mode(flag: Option<Mode>, config: Option<&InjectorConfig>) -> Result<Mode, ConfigError> {
    let configured = match config.and_then(|c| c.mode.as_deref()) {
        Some(raw) => Some(raw.parse::<Mode>().map_err(ConfigError::InvalidMode)?),
        None => None,
    };
    Ok(flag.or(configured).unwrap_or_default())
}
