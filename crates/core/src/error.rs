use std::path::PathBuf;

use crate::plugin::{CapabilityType, Rejection};

/// Result alias that carries the custom [`CoreError`] type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Free-form message for failures that do not deserve their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// No registered plugin satisfies a required capability. Candidates that
    /// were skipped because of an interface mismatch are listed in `rejected`.
    #[error("no plugin provides {capability} (requires interface `{required}`, {} rejected)", .rejected.len())]
    Configuration {
        capability: CapabilityType,
        required: &'static str,
        rejected: Vec<Rejection>,
    },
    /// A media file could not be probed or decoded.
    #[error("failed to decode `{}`: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    /// Malformed configuration or settings document.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
}

impl CoreError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<&str> for CoreError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for CoreError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
