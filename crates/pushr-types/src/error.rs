use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("invalid release name {0:?}")]
    InvalidName(String),

    #[error("no file extension on {0:?}")]
    MissingExtension(String),

    #[error("no version available in channel {0:?}")]
    NoVersionInChannel(String),
}

pub type TypeResult<T> = Result<T, TypeError>;
