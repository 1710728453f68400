//! Semantic-version parsing and precedence ordering.
//!
//! Wraps the `semver` crate. Build metadata is accepted but never takes part
//! in ordering, so two versions differing only in `+build` keep their input
//! order.

use crate::error::{TypeError, TypeResult};

/// Parse a strict SemVer 2.0 string like `"1.2.3-beta.1"`.
pub fn parse_version(s: &str) -> TypeResult<semver::Version> {
    semver::Version::parse(s).map_err(|e| TypeError::InvalidVersion {
        version: s.to_string(),
        reason: e.to_string(),
    })
}

/// A parsed version paired with the exact string it was parsed from.
///
/// The raw string is what releases are keyed by, so resolution results can be
/// looked up again without re-rendering the parsed value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderedVersion {
    pub raw: String,
    pub parsed: semver::Version,
}

impl OrderedVersion {
    pub fn parse(raw: &str) -> TypeResult<Self> {
        Ok(Self {
            raw: raw.to_string(),
            parsed: parse_version(raw)?,
        })
    }

    /// True when the version has no pre-release component.
    pub fn is_stable(&self) -> bool {
        self.parsed.pre.is_empty()
    }

    /// First pre-release identifier (`beta` for `1.0.0-beta.2`), if any.
    pub fn channel(&self) -> Option<&str> {
        if self.parsed.pre.is_empty() {
            return None;
        }
        self.parsed.pre.as_str().split('.').next()
    }
}

/// Parse and sort raw version strings by semver precedence, ascending.
///
/// Strings that are not valid semantic versions are dropped. The sort is
/// stable, so equal-precedence entries keep their input order.
pub fn order_versions<I, S>(raw: I) -> Vec<OrderedVersion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ordered: Vec<OrderedVersion> = raw
        .into_iter()
        .filter_map(|s| OrderedVersion::parse(s.as_ref()).ok())
        .collect();
    ordered.sort_by(|a, b| a.parsed.cmp_precedence(&b.parsed));
    ordered
}
