//! Rebuild the release index from the data directory.
//!
//! Every stored payload is named `<release>-<version><ext>`, with registry
//! repositories one directory down (`<namespace>/<repo>-<version><ext>`), so
//! a directory listing is enough to reconstruct the index when the snapshot
//! is lost.

use std::path::{Path, PathBuf};

use pushr_types::{parse_stored_filename, registry_key, validate_release_key, ContentTypes};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::store::{Payload, ReleaseStore};

/// Outcome of a recovery scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub indexed: usize,
    /// Files left out of the index, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl RecoveryReport {
    fn skip(&mut self, path: &Path, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(path = %path.display(), %reason, "skipping file during recovery");
        self.skipped.push((path.to_path_buf(), reason));
    }
}

/// Scan `data_dir` and index every file whose name follows the stored layout.
pub fn recover_from_dir(
    data_dir: &Path,
    content_types: &ContentTypes,
) -> StoreResult<(ReleaseStore, RecoveryReport)> {
    let store = ReleaseStore::new();
    let mut report = RecoveryReport::default();

    let walker = WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.skip(e.path().unwrap_or(data_dir), format!("unreadable: {e}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(file_name) = entry.file_name().to_str() else {
            report.skip(path, "file name is not UTF-8");
            continue;
        };
        if file_name.ends_with(".part") {
            report.skip(path, "partial upload");
            continue;
        }
        let Some(parsed) = parse_stored_filename(file_name) else {
            report.skip(path, "not named <release>-<version><ext>");
            continue;
        };

        let key = if entry.depth() == 2 {
            let namespace = path
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            match registry_key(namespace, &parsed.release) {
                Ok(key) => key,
                Err(e) => {
                    report.skip(path, e.to_string());
                    continue;
                }
            }
        } else {
            if let Err(e) = validate_release_key(&parsed.release) {
                report.skip(path, e.to_string());
                continue;
            }
            parsed.release.clone()
        };

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                report.skip(path, format!("unreadable: {e}"));
                continue;
            }
        };
        let payload = Payload {
            content_type: content_types.lookup(&parsed.extension).to_string(),
            extension: parsed.extension,
            size,
        };
        match store.add_version(&key, &parsed.version, payload) {
            Ok(version) => {
                info!(
                    release = %key,
                    version = %parsed.version,
                    content_type = %version.content_type,
                    size,
                    "recovered version"
                );
                report.indexed += 1;
            }
            Err(StoreError::Conflict { .. }) => {
                report.skip(path, format!("duplicate version {}", parsed.version));
            }
            Err(e) => report.skip(path, e.to_string()),
        }
    }

    info!(
        data_dir = %data_dir.display(),
        indexed = report.indexed,
        skipped = report.skipped.len(),
        "recovery scan finished"
    );
    Ok((store, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, rel: &str, len: usize) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![7u8; len]).unwrap();
    }

    #[test]
    fn rebuilds_index_from_file_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "test-1.0.0.zip", 10);
        touch(dir.path(), "test-1.0.1-beta.zip", 11);
        touch(dir.path(), "other-0.2.0.tgz", 12);
        touch(dir.path(), "acme/tool-3.0.0-rc.1.deb", 13);

        let (store, report) = recover_from_dir(dir.path(), &ContentTypes::default()).unwrap();
        assert_eq!(report.indexed, 4);
        assert!(report.skipped.is_empty());

        let v = store.version("test", "1.0.1-beta").unwrap();
        assert_eq!(v.size, 11);
        assert_eq!(v.filename, "test-1.0.1-beta.zip");
        assert_eq!(v.content_type, "application/zip");

        let v = store.version("acme/tool", "3.0.0-rc.1").unwrap();
        assert_eq!(v.filename, "acme/tool-3.0.0-rc.1.deb");
        assert_eq!(v.content_type, "application/vnd.debian.binary-package");
        assert_eq!(store.get("other").unwrap().len(), 1);
    }

    #[test]
    fn skips_unrecognised_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "test-1.0.0.zip", 1);
        touch(dir.path(), "test-bogus.zip", 1);
        touch(dir.path(), "test-2.0.0", 1);
        touch(dir.path(), "pushr.db", 1);
        touch(dir.path(), "test-3.0.0.zip.part", 1);
        touch(dir.path(), "test-1.0.0.tgz", 1);

        let (store, report) = recover_from_dir(dir.path(), &ContentTypes::default()).unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped.len(), 5);
        assert!(report
            .skipped
            .iter()
            .any(|(p, why)| p.ends_with("test-3.0.0.zip.part") && why == "partial upload"));
        assert!(report.skipped.iter().any(|(_, why)| why.starts_with("duplicate")));
        assert_eq!(store.version_count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_does_not_abort_scan() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "test-1.0.0.zip", 1);
        touch(dir.path(), "locked/tool-1.0.0.zip", 1);
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = recover_from_dir(dir.path(), &ContentTypes::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let (store, report) = result.unwrap();
        assert!(store.contains("test", "1.0.0"));
        // privileged users can still list the directory
        if !store.contains("locked/tool", "1.0.0") {
            assert!(report
                .skipped
                .iter()
                .any(|(p, why)| p.starts_with(&locked) && why.starts_with("unreadable")));
        }
    }

    #[test]
    fn empty_directory_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let (store, report) = recover_from_dir(dir.path(), &ContentTypes::default()).unwrap();
        assert!(store.is_empty());
        assert_eq!(report, RecoveryReport::default());
    }
}
