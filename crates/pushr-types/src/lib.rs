//! Foundation types for pushr.
//!
//! This crate holds the release data model and the two algorithms that client
//! and server must agree on byte for byte: semver ordering and channel
//! resolution. Every other pushr crate depends on `pushr-types`.
//!
//! # Key Types
//!
//! - [`Release`]: versions of one release, keyed by semver string
//! - [`Version`]: stored payload metadata (content type, size, filename)
//! - [`RegistryRelease`] / [`Asset`]: registry-variant view of a resolved release
//! - [`OrderedVersion`]: a parsed version paired with its original string
//! - [`Channel`]: release track encoded as the first pre-release identifier
//! - [`ContentTypes`]: extension to MIME type lookup table

pub mod channel;
pub mod content_type;
pub mod error;
pub mod names;
pub mod ordering;
pub mod release;
pub mod wire;

pub use channel::{resolve, Channel, STABLE};
pub use content_type::{ContentTypes, DEFAULT_CONTENT_TYPE};
pub use error::{TypeError, TypeResult};
pub use names::{
    file_extension, parse_stored_filename, registry_key, stored_filename, validate_release_key,
    validate_release_name, StoredName,
};
pub use ordering::{order_versions, parse_version, OrderedVersion};
pub use release::{Asset, RegistryRelease, Release, Version};
