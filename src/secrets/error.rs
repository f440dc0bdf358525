use std::path::PathBuf;

use thiserror::Error;

/// Secret store errors.
///
/// Variants stay distinct so callers can tell "not configured" from
/// "corrupted" and pick the right recovery.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret store unavailable at {}: {reason}", .path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("failed to write secret '{name}': {source}")]
    WriteFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("secret '{0}' is not configured")]
    NotFound(String),

    #[error("secret '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("secret '{0}' failed authentication (file modified or written on another machine)")]
    AuthenticationFailed(String),

    #[error("invalid secret name '{0}': only letters, digits, '-' and '_' are allowed")]
    InvalidName(String),
}

pub type SecretResult<T> = Result<T, SecretError>;
