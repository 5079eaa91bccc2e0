use thiserror::Error;

/// Failure of an optional platform capability (wake lock, video playback,
/// fullscreen, DOM lookups). These never reach the user; callers fall back or
/// log and carry on.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{capability} is not supported in this environment")]
    Unsupported { capability: &'static str },
    #[error("{capability} request was rejected: {reason}")]
    Rejected {
        capability: &'static str,
        reason: String,
    },
    #[error("required element #{0} is missing")]
    MissingElement(&'static str),
}

impl PlatformError {
    pub fn unsupported(capability: &'static str) -> Self {
        Self::Unsupported { capability }
    }

    pub fn rejected(capability: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            capability,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("persistent storage is unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write key '{key}': {reason}")]
    Write { key: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
