use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pushr_types::{
    file_extension, parse_version, stored_filename, validate_release_key, Channel, Release,
    TypeError, Version,
};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;

/// Metadata of a payload that is already on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    /// Extension including the leading dot, e.g. `.zip`.
    pub extension: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Default)]
struct Inner {
    releases: BTreeMap<String, Release>,
    /// (release, version) slots claimed by uploads that have not committed.
    in_flight: HashSet<(String, String)>,
}

/// In-memory index of releases, safe for concurrent use.
///
/// Readers share one `RwLock`; [`reserve`](Self::reserve) and
/// [`Reservation::commit`] take it exclusively for the map update only.
/// Every critical section leaves the map consistent, so a poisoned lock is
/// recovered instead of propagated.
#[derive(Default)]
pub struct ReleaseStore {
    inner: RwLock<Inner>,
}

impl ReleaseStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(Inner {
                releases: snapshot.releases,
                in_flight: HashSet::new(),
            }),
        }
    }

    /// Point-in-time copy of every committed release.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            releases: self.read().releases.clone(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of releases.
    pub fn len(&self) -> usize {
        self.read().releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().releases.is_empty()
    }

    /// Total number of committed versions across all releases.
    pub fn version_count(&self) -> usize {
        self.read().releases.values().map(Release::len).sum()
    }

    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.read()
            .releases
            .get(name)
            .is_some_and(|r| r.contains(version))
    }

    pub fn get(&self, name: &str) -> StoreResult<Release> {
        self.read()
            .releases
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::ReleaseNotFound(name.to_string()))
    }

    /// All releases with their keys, sorted by key.
    pub fn list(&self) -> Vec<(String, Release)> {
        self.read()
            .releases
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }

    pub fn version(&self, name: &str, version: &str) -> StoreResult<Version> {
        let inner = self.read();
        let release = inner
            .releases
            .get(name)
            .ok_or_else(|| StoreError::ReleaseNotFound(name.to_string()))?;
        release
            .get(version)
            .cloned()
            .ok_or_else(|| StoreError::VersionNotFound {
                release: name.to_string(),
                version: version.to_string(),
            })
    }

    /// Latest version of `name` on `channel`, with its version string.
    pub fn latest(&self, name: &str, channel: &Channel) -> StoreResult<(String, Version)> {
        let inner = self.read();
        let release = inner
            .releases
            .get(name)
            .ok_or_else(|| StoreError::ReleaseNotFound(name.to_string()))?;
        let dropped = release.len() - release.ordered().len();
        if dropped > 0 {
            debug!(release = %name, dropped, "ignoring unparsable version keys");
        }
        match release.latest(channel) {
            Ok((v, meta)) => Ok((v.to_string(), meta.clone())),
            Err(TypeError::NoVersionInChannel(channel)) => Err(StoreError::NoVersionInChannel {
                release: name.to_string(),
                channel,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Claim the `(name, version)` slot for an upload.
    ///
    /// All validation happens here, before the caller touches the
    /// filesystem. The slot stays claimed until the reservation is committed
    /// or dropped; a second claim for a committed or claimed slot is a
    /// [`StoreError::Conflict`].
    pub fn reserve(
        &self,
        name: &str,
        version: &str,
        extension: &str,
        content_type: impl Into<String>,
    ) -> StoreResult<Reservation<'_>> {
        validate_release_key(name)?;
        parse_version(version)?;
        if file_extension(extension)? != extension {
            return Err(TypeError::MissingExtension(extension.to_string()).into());
        }

        let slot = (name.to_string(), version.to_string());
        let mut inner = self.write();
        let committed = inner
            .releases
            .get(name)
            .is_some_and(|r| r.contains(version));
        if committed || inner.in_flight.contains(&slot) {
            return Err(StoreError::Conflict {
                release: slot.0,
                version: slot.1,
            });
        }
        inner.in_flight.insert(slot);
        drop(inner);

        Ok(Reservation {
            store: self,
            release: name.to_string(),
            version: version.to_string(),
            filename: stored_filename(name, version, extension),
            content_type: content_type.into(),
            done: false,
        })
    }

    /// Index a payload that is already on disk under its stored filename.
    pub fn add_version(&self, name: &str, version: &str, payload: Payload) -> StoreResult<Version> {
        let reservation = self.reserve(name, version, &payload.extension, payload.content_type)?;
        Ok(reservation.commit(payload.size))
    }

    fn release_slot(&self, release: &str, version: &str) {
        self.write()
            .in_flight
            .remove(&(release.to_string(), version.to_string()));
    }
}

impl std::fmt::Debug for ReleaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("ReleaseStore")
            .field("releases", &inner.releases.len())
            .field("in_flight", &inner.in_flight.len())
            .finish()
    }
}

/// A claimed `(release, version)` slot awaiting its payload.
///
/// Dropping a reservation without committing releases the slot.
#[must_use = "a reservation is released when dropped"]
pub struct Reservation<'a> {
    store: &'a ReleaseStore,
    release: String,
    version: String,
    filename: String,
    content_type: String,
    done: bool,
}

impl Reservation<'_> {
    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Stored filename, relative to the data directory.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Insert the version into the index. The payload file must be complete.
    pub fn commit(mut self, size: u64) -> Version {
        let version = Version {
            content_type: std::mem::take(&mut self.content_type),
            size,
            filename: std::mem::take(&mut self.filename),
        };
        let slot = (std::mem::take(&mut self.release), std::mem::take(&mut self.version));

        let mut inner = self.store.write();
        inner.in_flight.remove(&slot);
        inner
            .releases
            .entry(slot.0.clone())
            .or_default()
            .versions
            .insert(slot.1.clone(), version.clone());
        drop(inner);

        debug!(release = %slot.0, version = %slot.1, size, "version committed");
        self.done = true;
        version
    }

    /// Release the slot without indexing anything.
    pub fn abandon(self) {}
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.store.release_slot(&self.release, &self.version);
        }
    }
}

impl std::fmt::Debug for Reservation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("release", &self.release)
            .field("version", &self.version)
            .field("filename", &self.filename)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn zip(size: u64) -> Payload {
        Payload {
            extension: ".zip".into(),
            content_type: "application/zip".into(),
            size,
        }
    }

    fn test_store() -> ReleaseStore {
        let store = ReleaseStore::new();
        for v in ["1.0.1-beta", "1.0.0", "0.1.0"] {
            store.add_version("test", v, zip(10)).unwrap();
        }
        store
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[test]
    fn get_and_version() {
        let store = test_store();
        let release = store.get("test").unwrap();
        assert_eq!(release.len(), 3);

        let v = store.version("test", "1.0.0").unwrap();
        assert_eq!(v.filename, "test-1.0.0.zip");
        assert_eq!(v.content_type, "application/zip");
        assert_eq!(v.size, 10);
    }

    #[test]
    fn unknown_release_and_version() {
        let store = test_store();
        assert!(matches!(store.get("nope"), Err(StoreError::ReleaseNotFound(_))));
        assert!(matches!(
            store.version("test", "9.9.9"),
            Err(StoreError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn list_is_a_copy() {
        let store = test_store();
        let listed = store.list();
        store.add_version("other", "1.0.0", zip(1)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.version_count(), 4);
    }

    #[test]
    fn latest_per_channel() {
        let store = test_store();
        let (v, meta) = store.latest("test", &Channel::new("")).unwrap();
        assert_eq!(v, "1.0.0");
        assert_eq!(meta.filename, "test-1.0.0.zip");
        assert_eq!(store.latest("test", &Channel::new("stable")).unwrap().0, "1.0.0");
        assert_eq!(store.latest("test", &Channel::new("beta")).unwrap().0, "1.0.1-beta");
    }

    #[test]
    fn latest_without_eligible_version() {
        let store = ReleaseStore::new();
        store.add_version("test", "1.0.0-rc.1", zip(1)).unwrap();
        let err = store.latest("test", &Channel::stable()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NoVersionInChannel { ref channel, .. } if channel == "stable"
        ));
        assert!(matches!(
            store.latest("missing", &Channel::stable()),
            Err(StoreError::ReleaseNotFound(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    #[test]
    fn second_add_conflicts() {
        let store = ReleaseStore::new();
        store.add_version("test", "1.0.0", zip(10)).unwrap();
        let err = store.add_version("test", "1.0.0", zip(20)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        let err = store.add_version("test", "1.0.0", zip(30)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.version("test", "1.0.0").unwrap().size, 10);
        assert_eq!(store.version_count(), 1);
    }

    #[test]
    fn bogus_version_leaves_store_unchanged() {
        let store = test_store();
        let before = store.snapshot();
        let err = store.add_version("test", "bogus", zip(1)).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(TypeError::InvalidVersion { .. })));
        let err = store.add_version("fresh", "bogus", zip(1)).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert_eq!(store.snapshot(), before);
        assert!(store.get("fresh").is_err());
    }

    #[test]
    fn invalid_names_and_extensions() {
        let store = ReleaseStore::new();
        assert!(matches!(
            store.reserve("bad-name", "1.0.0", ".zip", "x"),
            Err(StoreError::Invalid(TypeError::InvalidName(_)))
        ));
        assert!(matches!(
            store.reserve("ok", "1.0.0", "", "x"),
            Err(StoreError::Invalid(TypeError::MissingExtension(_)))
        ));
        assert!(matches!(
            store.reserve("ok", "1.0.0", "a.zip", "x"),
            Err(StoreError::Invalid(TypeError::MissingExtension(_)))
        ));
    }

    #[test]
    fn reservation_hides_version_until_commit() {
        let store = ReleaseStore::new();
        let r = store.reserve("acme/tool", "2.0.0", ".tgz", "application/gzip").unwrap();
        assert_eq!(r.filename(), "acme/tool-2.0.0.tgz");
        assert!(store.get("acme/tool").is_err());
        assert!(matches!(
            store.reserve("acme/tool", "2.0.0", ".tgz", "application/gzip"),
            Err(StoreError::Conflict { .. })
        ));

        let v = r.commit(42);
        assert_eq!(v.size, 42);
        assert_eq!(store.version("acme/tool", "2.0.0").unwrap(), v);
    }

    #[test]
    fn dropped_reservation_frees_slot() {
        let store = ReleaseStore::new();
        let r = store.reserve("test", "1.0.0", ".zip", "application/zip").unwrap();
        r.abandon();
        assert!(!store.contains("test", "1.0.0"));
        let r = store.reserve("test", "1.0.0", ".zip", "application/zip").unwrap();
        r.commit(5);
        assert!(store.contains("test", "1.0.0"));
    }

    #[test]
    fn concurrent_adds_admit_exactly_one() {
        let store = ReleaseStore::new();
        let threads = 16;
        let barrier = Barrier::new(threads);
        let wins: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|i| {
                    let (store, barrier) = (&store, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        store.add_version("test", "1.0.0", zip(i as u64 + 1)).is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap() as usize).sum()
        });
        assert_eq!(wins, 1);
        assert_eq!(store.version_count(), 1);
    }

    #[test]
    fn concurrent_readers_never_see_partial_state() {
        let store = ReleaseStore::new();
        std::thread::scope(|s| {
            s.spawn(|| {
                for patch in 0..200 {
                    store.add_version("test", &format!("1.0.{patch}"), zip(patch)).unwrap();
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        if let Ok(release) = store.get("test") {
                            for (v, meta) in &release.versions {
                                assert_eq!(meta.filename, format!("test-{v}.zip"));
                            }
                        }
                    }
                });
            }
        });
        assert_eq!(store.get("test").unwrap().len(), 200);
    }
}
