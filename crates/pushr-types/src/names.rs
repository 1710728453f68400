//! Release keys and the stored-filename scheme.
//!
//! Payloads are stored as `<release>-<version><ext>` relative to the data
//! directory. Release names may not contain `-`, so the first `-` of a stored
//! filename always separates the release from the version and the index can be
//! rebuilt from a directory listing alone.

use crate::error::{TypeError, TypeResult};
use crate::ordering::parse_version;

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Check a release key: `name`, or `namespace/repo` for the registry variant.
pub fn validate_release_key(key: &str) -> TypeResult<()> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() > 2 || !segments.iter().all(|s| valid_segment(s)) {
        return Err(TypeError::InvalidName(key.to_string()));
    }
    Ok(())
}

/// Check a simple-variant release name: exactly one segment.
pub fn validate_release_name(name: &str) -> TypeResult<()> {
    if !valid_segment(name) {
        return Err(TypeError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Release key of a registry repository.
pub fn registry_key(namespace: &str, repo: &str) -> TypeResult<String> {
    if !valid_segment(namespace) || !valid_segment(repo) {
        return Err(TypeError::InvalidName(format!("{namespace}/{repo}")));
    }
    Ok(format!("{namespace}/{repo}"))
}

/// Extension of an uploaded filename, including the leading dot.
pub fn file_extension(filename: &str) -> TypeResult<&str> {
    let missing = || TypeError::MissingExtension(filename.to_string());
    let dot = filename.rfind('.').ok_or_else(missing)?;
    let ext = &filename[dot..];
    if ext.len() < 2
        || !ext[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(missing());
    }
    Ok(ext)
}

/// Stored filename for a payload: `<release>-<version><ext>`.
pub fn stored_filename(key: &str, version: &str, ext: &str) -> String {
    format!("{key}-{version}{ext}")
}

/// The parts recovered from a stored filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredName {
    pub release: String,
    pub version: String,
    pub extension: String,
}

/// Split a stored file's name (no directory part) back into its parts.
///
/// Returns `None` unless the release segment is a valid name, an extension is
/// present, and the version between them parses as semver.
pub fn parse_stored_filename(file_name: &str) -> Option<StoredName> {
    let (release, rest) = file_name.split_once('-')?;
    if !valid_segment(release) {
        return None;
    }
    let ext = file_extension(rest).ok()?;
    let version = &rest[..rest.len() - ext.len()];
    parse_version(version).ok()?;
    Some(StoredName {
        release: release.to_string(),
        version: version.to_string(),
        extension: ext.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_names_are_single_segments() {
        assert!(validate_release_name("test").is_ok());
        assert!(validate_release_name("my_tool.cli").is_ok());
        for bad in ["", "acme/tool", "a-b", "..", "/a"] {
            assert!(validate_release_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn release_keys() {
        assert!(validate_release_key("test").is_ok());
        assert!(validate_release_key("my_tool.cli").is_ok());
        assert!(validate_release_key("acme/tool").is_ok());
        for bad in ["", "a-b", "a/b/c", "..", "a/..", "/a", "a b", "a\\b"] {
            assert!(validate_release_key(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn registry_keys() {
        assert_eq!(registry_key("acme", "tool").unwrap(), "acme/tool");
        assert!(registry_key("acme", "to-ol").is_err());
        assert!(registry_key("", "tool").is_err());
    }

    #[test]
    fn extensions() {
        assert_eq!(file_extension("app.zip").unwrap(), ".zip");
        assert_eq!(file_extension("app.tar.gz").unwrap(), ".gz");
        assert!(file_extension("app").is_err());
        assert!(file_extension("app.").is_err());
        assert!(file_extension("app.z!p").is_err());
    }

    #[test]
    fn stored_filename_layout() {
        assert_eq!(stored_filename("test", "1.0.1-beta", ".zip"), "test-1.0.1-beta.zip");
        assert_eq!(stored_filename("acme/tool", "2.0.0", ".tgz"), "acme/tool-2.0.0.tgz");
    }

    #[test]
    fn parse_back_stored_names() {
        let parsed = parse_stored_filename("test-1.0.1-beta.2.zip").unwrap();
        assert_eq!(parsed.release, "test");
        assert_eq!(parsed.version, "1.0.1-beta.2");
        assert_eq!(parsed.extension, ".zip");

        assert!(parse_stored_filename("test-bogus.zip").is_none());
        assert!(parse_stored_filename("test-1.0.0").is_none());
        assert!(parse_stored_filename("noversion.zip").is_none());
        assert!(parse_stored_filename("test-1.0.0.zip.part").is_none());
    }
}
