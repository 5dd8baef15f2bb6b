//! Configuration System
//!
//! Layered configuration for an embedded core: built-in defaults, an
//! optional TOML file and `TREELINE_*` environment overrides, validated
//! before use.

use crate::error::CoreError;
use crate::logging::LoggingConfig;
use crate::store::{Database, MemoryDatabase, SledDatabase};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

mod merge {
    pub mod merge_policy;
}

mod sources {
    pub mod environment;
    pub mod repo_file;
}

pub use sources::environment::ENV_PREFIX;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub gc: GcConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

/// Key/value backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database directory; required for the sled backend
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Flush sled to disk after every applied batch (each commit is one)
    #[serde(default = "default_true")]
    pub flush_on_commit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
            flush_on_commit: true,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        match (self.backend, &self.path) {
            (StorageBackend::Sled, None) => Err("Sled backend requires a path".to_string()),
            (StorageBackend::Sled, Some(path)) if path.as_os_str().is_empty() => {
                Err("Store path cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Open the configured backend.
    pub fn open(&self) -> Result<Arc<dyn Database>, CoreError> {
        self.validate().map_err(CoreError::Config)?;
        match (self.backend, &self.path) {
            (StorageBackend::Sled, Some(path)) => {
                debug!(path = %path.display(), "Opening sled store");
                let db = SledDatabase::new(path)?.with_flush_on_batch(self.flush_on_commit);
                Ok(Arc::new(db))
            }
            _ => Ok(Arc::new(MemoryDatabase::new())),
        }
    }
}

/// Garbage collector defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Mark the whole commit chain and sweep permanent objects too
    #[serde(default)]
    pub aggressive: bool,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl CoreConfig {
    /// Load defaults, then `file` (if given), then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, CoreError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        if let Some(file) = file {
            builder = sources::repo_file::add_to_builder(builder, file)?;
        }
        builder = sources::environment::add_to_builder(builder);

        let config: CoreConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            CoreError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if let Err(e) = self.storage.validate() {
            errors.push(ValidationError::Storage(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
