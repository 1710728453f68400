use std::path::PathBuf;

use pushr_types::TypeError;

/// Errors from store, snapshot, and transfer operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No release with this key exists.
    #[error("release not found: {0}")]
    ReleaseNotFound(String),

    /// The release exists but has no such version.
    #[error("version {version} not found in release {release}")]
    VersionNotFound { release: String, version: String },

    /// The release has no version eligible for the channel.
    #[error("no version of {release} available in channel {channel}")]
    NoVersionInChannel { release: String, channel: String },

    /// The version is already stored or an upload for it is in flight.
    #[error("version {version} of {release} already exists")]
    Conflict { release: String, version: String },

    /// Malformed release name, version string, or extension.
    #[error(transparent)]
    Invalid(#[from] TypeError),

    /// The upload carried no bytes.
    #[error("payload is empty")]
    EmptyPayload,

    /// The upload exceeded the configured maximum size.
    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// The index references a file that is not on disk.
    #[error("payload file missing: {}", path.display())]
    MissingPayload { path: PathBuf },

    /// The snapshot file is absent, empty, or malformed.
    #[error("snapshot {}: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
