use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("timed out after {}ms waiting for lock {}", timeout.as_millis(), path.display())]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("id conflict: '{0}' has already been issued (counter store may be corrupt)")]
    IdConflict(String),

    #[error("invalid scope '{scope}' for {family}: {reason}")]
    InvalidScope {
        family: String,
        scope: String,
        reason: String,
    },

    #[error("invalid family '{0}': expected one of feature, specification, plan, task, decision, pattern, constraint, checkpoint")]
    InvalidFamily(String),

    /// `path` is whatever blocked recovery: the store itself, or an artifact
    /// directory that could not be scanned.
    #[error("counter state cannot be recovered ({}): {reason}", path.display())]
    StoreUnrecoverable { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl IdError {
    /// Transient failures that a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IdError::LockTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, IdError>;
