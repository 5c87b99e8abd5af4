use thiserror::Error;

use crate::config::ConfigError;
use crate::injector::{MutateError, ParseError};

#[derive(Error, Debug)]
pub enum InjectorError {
    #[error("Failed to parse manifest stream: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to render manifest stream: {0}")]
    Render(#[from] MutateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, InjectorError>;
