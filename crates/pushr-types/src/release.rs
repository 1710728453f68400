use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::{resolve, Channel};
use crate::error::{TypeError, TypeResult};
use crate::ordering::{order_versions, OrderedVersion};

/// Metadata of one uploaded payload.
///
/// Fixed at creation; a version is never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "contenttype")]
    pub content_type: String,
    pub size: u64,
    /// Stored filename relative to the data directory.
    pub filename: String,
}

/// All versions of one release, keyed by their semver string.
///
/// Map order carries no meaning; use [`Release::ordered`] for precedence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub versions: BTreeMap<String, Version>,
}

impl Release {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: &str) -> Option<&Version> {
        self.versions.get(version)
    }

    pub fn contains(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Version keys that parse as semver, ascending by precedence.
    pub fn ordered(&self) -> Vec<OrderedVersion> {
        order_versions(self.versions.keys())
    }

    /// Latest version on `channel`, with the version string it is keyed by.
    pub fn latest(&self, channel: &Channel) -> TypeResult<(&str, &Version)> {
        let ordered = self.ordered();
        let picked = resolve(&ordered, channel)?;
        self.versions
            .get_key_value(picked.raw.as_str())
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| TypeError::NoVersionInChannel(channel.to_string()))
    }
}

/// A downloadable payload in a registry-variant release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Opaque identifier, only meaningful within its repository.
    pub id: String,
    pub name: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// Registry-variant answer to a "latest on channel" query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRelease {
    pub name: String,
    pub version: String,
    pub assets: Vec<Asset>,
}

impl RegistryRelease {
    /// Build the registry view of one resolved version.
    ///
    /// A version carries a single payload, exposed as one asset whose id is
    /// the version string and whose name is the stored file's basename.
    pub fn from_version(name: &str, version: &str, meta: &Version) -> Self {
        let file_name = meta
            .filename
            .rsplit('/')
            .next()
            .unwrap_or(meta.filename.as_str());
        Self {
            name: name.to_string(),
            version: version.to_string(),
            assets: vec![Asset {
                id: version.to_string(),
                name: file_name.to_string(),
                content_type: meta.content_type.clone(),
            }],
        }
    }
}
