//! Release storage for pushr.
//!
//! The [`ReleaseStore`] is the authoritative in-memory index of releases and
//! their versions. Payload bytes never pass through it: they are streamed to
//! and from the data directory by [`transfer`], and the index only learns
//! about a version once its file is complete.
//!
//! # Design Rules
//!
//! 1. Versions are immutable once committed and never deleted.
//! 2. Write-then-link: the payload file is written first, then the index is
//!    updated, so readers never see a version without its file.
//! 3. The lock guards map mutations only; no I/O happens while it is held.
//! 4. The snapshot on disk is a cache of the index, never the reverse. A
//!    missing or corrupt snapshot degrades to an empty store.
//! 5. Stored filenames are `<release>-<version><ext>`, so the index can be
//!    rebuilt from the data directory alone (see [`recovery`]).

pub mod error;
pub mod recovery;
pub mod snapshot;
pub mod store;
pub mod transfer;

pub use error::{StoreError, StoreResult};
pub use recovery::{recover_from_dir, RecoveryReport};
pub use snapshot::{restore, restore_or_empty, save, Snapshot};
pub use store::{Payload, ReleaseStore, Reservation};
pub use transfer::{
    copy_chunked, open_payload, part_path, receive_to_file, TransferLimits, DEFAULT_CHUNK_SIZE,
};
