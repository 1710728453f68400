use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use pushr_types::{parse_version, validate_release_key, Release};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::ReleaseStore;

/// Snapshot file magic.
const MAGIC: &[u8; 4] = b"PSHR";

/// On-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Header size: 4 bytes magic + 4 bytes format version + 4 bytes CRC.
const HEADER_SIZE: usize = 12;

/// Full point-in-time copy of the release index.
///
/// On-disk format:
/// ```text
/// [4 bytes: magic "PSHR"]
/// [4 bytes: format version (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized release map)]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub releases: BTreeMap<String, Release>,
}

impl Snapshot {
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let payload =
            bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode and check a snapshot. The error string says what is wrong.
    pub fn decode(data: &[u8]) -> Result<Self, String> {
        if data.is_empty() {
            return Err("file is empty".into());
        }
        if data.len() < HEADER_SIZE {
            return Err(format!("truncated header: {} bytes", data.len()));
        }
        if &data[0..4] != MAGIC {
            return Err("bad magic".into());
        }
        let word =
            |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        let format = word(4);
        if format != FORMAT_VERSION {
            return Err(format!("unsupported format version {format}"));
        }
        let payload = &data[HEADER_SIZE..];
        let expected = word(8);
        let computed = crc32fast::hash(payload);
        if expected != computed {
            return Err(format!(
                "checksum mismatch: expected {expected:08x}, computed {computed:08x}"
            ));
        }
        let snapshot: Snapshot = bincode::deserialize(payload).map_err(|e| e.to_string())?;
        snapshot.check()?;
        Ok(snapshot)
    }

    fn check(&self) -> Result<(), String> {
        for (key, release) in &self.releases {
            validate_release_key(key).map_err(|e| e.to_string())?;
            for version in release.versions.keys() {
                parse_version(version).map_err(|e| e.to_string())?;
            }
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write the whole store to `path`, replacing any previous snapshot.
///
/// The bytes go to a sibling `.tmp` file first and are renamed into place,
/// so an interrupted save leaves the old snapshot intact.
pub fn save(store: &ReleaseStore, path: &Path) -> StoreResult<()> {
    let snapshot = store.snapshot();
    let bytes = snapshot.encode()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    info!(
        path = %path.display(),
        releases = snapshot.releases.len(),
        bytes = bytes.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Load a store from the snapshot at `path`.
pub fn restore(path: &Path) -> StoreResult<ReleaseStore> {
    let data = fs::read(path).map_err(|e| StoreError::Snapshot {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let snapshot = Snapshot::decode(&data).map_err(|reason| StoreError::Snapshot {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(ReleaseStore::from_snapshot(snapshot))
}

/// Load a store from `path`, or start empty if that fails.
///
/// The failure is logged, never propagated: the snapshot is a cache and the
/// process must come up without it.
pub fn restore_or_empty(path: &Path) -> ReleaseStore {
    match restore(path) {
        Ok(store) => {
            info!(
                path = %path.display(),
                releases = store.len(),
                versions = store.version_count(),
                "snapshot restored"
            );
            store
        }
        Err(e) => {
            warn!(error = %e, "could not restore snapshot, starting with an empty store");
            ReleaseStore::new()
        }
    }
}
