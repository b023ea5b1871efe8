//! Runtime configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! max_recursion_depth = 500
//!
//! [sandbox]
//! timeout_ms = 2000
//! max_memory_bytes = 5242880
//! ```

use crate::runtime::evaluator::DEFAULT_MAX_RECURSION_DEPTH;
use crate::sandbox::{ExecutionRequest, SandboxOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_WORKER_STACK_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid runtime config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid runtime config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub sandbox: SandboxOptions,
    pub max_recursion_depth: usize,
    pub worker_stack_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxOptions::default(),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            worker_stack_bytes: DEFAULT_WORKER_STACK_BYTES,
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_recursion_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_recursion_depth must be at least 1".to_string(),
            ));
        }
        // the evaluator recurses on the worker stack
        if self.worker_stack_bytes < 1024 * 1024 {
            return Err(ConfigError::Invalid(
                "worker_stack_bytes must be at least 1 MiB".to_string(),
            ));
        }
        Ok(())
    }

    /// A request carrying this configuration's sandbox limits.
    pub fn request(&self) -> ExecutionRequest {
        ExecutionRequest::new().with_options(self.sandbox)
    }
}
