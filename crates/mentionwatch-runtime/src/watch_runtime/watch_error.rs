//! Typed fatal errors surfaced to callers of the watch and ack entrypoints.

use mentionwatch_github::CompositeKeyError;
use thiserror::Error;

pub const EXIT_USAGE_ERROR: i32 = 2;
pub const EXIT_IDENTITY_ERROR: i32 = 3;
pub const EXIT_FETCH_ERROR: i32 = 4;
pub const EXIT_STORAGE_ERROR: i32 = 5;
pub const EXIT_OUTPUT_ERROR: i32 = 6;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    InvalidAckKey(#[from] CompositeKeyError),
    #[error("failed to resolve agent identity: {message}")]
    IdentityUnresolved { message: String },
    #[error("notification fetch failed: {message}")]
    Fetch { message: String },
    #[error("watch storage failed: {message}")]
    Storage { message: String },
    #[error("event output failed: {message}")]
    Output { message: String },
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl WatchError {
    pub(crate) fn identity(error: &anyhow::Error) -> Self {
        Self::IdentityUnresolved {
            message: format!("{error:#}"),
        }
    }

    pub(crate) fn fetch(error: &anyhow::Error) -> Self {
        Self::Fetch {
            message: format!("{error:#}"),
        }
    }

    pub(crate) fn storage(error: &anyhow::Error) -> Self {
        Self::Storage {
            message: format!("{error:#}"),
        }
    }

    pub(crate) fn output(error: &anyhow::Error) -> Self {
        Self::Output {
            message: format!("{error:#}"),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAckKey(_) => "ack_key_invalid",
            Self::IdentityUnresolved { .. } => "identity_unresolved",
            Self::Fetch { .. } => "fetch_failed",
            Self::Storage { .. } => "storage_failed",
            Self::Output { .. } => "output_failed",
            Self::Config { .. } => "config_invalid",
        }
    }

    /// Suggested process exit status.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidAckKey(_) | Self::Config { .. } => EXIT_USAGE_ERROR,
            Self::IdentityUnresolved { .. } => EXIT_IDENTITY_ERROR,
            Self::Fetch { .. } => EXIT_FETCH_ERROR,
            Self::Storage { .. } => EXIT_STORAGE_ERROR,
            Self::Output { .. } => EXIT_OUTPUT_ERROR,
        }
    }
}
