// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonowatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Cyclic dependency detected: {0}")]
    DependencyCycle(String),

    #[error("Corrupt fingerprint file {path}: {reason}")]
    CacheCorruption { path: String, reason: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MonowatchError {
    /// Whether this error means "the cached fingerprint cannot be trusted".
    ///
    /// Such errors are never fatal: the affected project is rebuilt.
    pub fn is_cache_corruption(&self) -> bool {
        matches!(
            self,
            MonowatchError::CacheCorruption { .. } | MonowatchError::JsonError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MonowatchError>;
