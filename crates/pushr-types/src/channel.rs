use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::ordering::OrderedVersion;

/// Name of the default channel.
pub const STABLE: &str = "stable";

/// A release track.
///
/// Pre-release versions belong to the channel named by their first
/// pre-release identifier; versions without a pre-release component are
/// stable. An empty channel name means [`STABLE`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Channel(String);

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self::stable()
        } else {
            Self(name)
        }
    }

    pub fn stable() -> Self {
        Self(STABLE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_stable(&self) -> bool {
        self.0 == STABLE
    }

    /// Whether `version` is eligible for this channel.
    ///
    /// Stable versions are eligible everywhere. On a non-stable channel a
    /// pre-release is eligible when its first identifier equals the channel
    /// name exactly.
    pub fn admits(&self, version: &OrderedVersion) -> bool {
        if version.is_stable() {
            return true;
        }
        !self.is_stable() && version.channel() == Some(self.as_str())
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::stable()
    }
}

impl From<&str> for Channel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Channel {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Channel> for String {
    fn from(c: Channel) -> Self {
        c.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pick the latest version eligible for `channel`.
///
/// `ordered` must be ascending by precedence, as produced by
/// [`order_versions`](crate::ordering::order_versions). The scan runs from the
/// highest version down and returns the first one the channel admits, so a
/// newer stable release wins over an older matching pre-release.
pub fn resolve<'a>(
    ordered: &'a [OrderedVersion],
    channel: &Channel,
) -> TypeResult<&'a OrderedVersion> {
    ordered
        .iter()
        .rev()
        .find(|v| channel.admits(v))
        .ok_or_else(|| TypeError::NoVersionInChannel(channel.to_string()))
}
