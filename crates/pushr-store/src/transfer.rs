//! Chunked payload transfer between streams and the data directory.
//!
//! Payloads are never buffered whole: bytes move through a single buffer of
//! `chunk_size` bytes. Uploads land in a `.part` file that is renamed into
//! place only after the copy succeeded, so a failed upload never leaves a
//! file under the stored filename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Default transfer chunk size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Bounds applied to a single transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferLimits {
    pub chunk_size: usize,
    /// Abort once more than this many bytes have been read.
    pub max_bytes: Option<u64>,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_bytes: None,
        }
    }
}

/// Copy `reader` into `writer` one chunk at a time until end of input.
///
/// Returns the number of bytes copied. The size limit is checked between
/// chunks.
pub async fn copy_chunked<R, W>(
    reader: &mut R,
    writer: &mut W,
    limits: TransferLimits,
) -> StoreResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; limits.chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if let Some(limit) = limits.max_bytes {
            if total > limit {
                return Err(StoreError::PayloadTooLarge { limit });
            }
        }
        writer.write_all(&buf[..n]).await?;
    }
    writer.flush().await?;
    Ok(total)
}

/// Path of the in-progress file for `dest`.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

/// Stream `reader` into a new file at `dest`.
///
/// Fails with [`StoreError::EmptyPayload`] when the input is empty. On any
/// failure the partial file is removed before the error is returned.
pub async fn receive_to_file<R>(
    reader: &mut R,
    dest: &Path,
    limits: TransferLimits,
) -> StoreResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let part = part_path(dest);
    let result = write_part(reader, &part, dest, limits).await;
    if let Err(e) = &result {
        match tokio::fs::remove_file(&part).await {
            Ok(()) => debug!(path = %part.display(), error = %e, "removed partial file"),
            Err(rm) if rm.kind() == ErrorKind::NotFound => {}
            Err(rm) => warn!(path = %part.display(), error = %rm, "could not remove partial file"),
        }
    }
    result
}

async fn write_part<R>(
    reader: &mut R,
    part: &Path,
    dest: &Path,
    limits: TransferLimits,
) -> StoreResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = File::create(part).await?;
    let written = copy_chunked(reader, &mut file, limits).await?;
    if written == 0 {
        return Err(StoreError::EmptyPayload);
    }
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(part, dest).await?;
    Ok(written)
}

/// Open a stored payload for download, returning the file and its length.
///
/// A missing file means the index and the data directory disagree, which is
/// reported as [`StoreError::MissingPayload`] rather than a plain not-found.
pub async fn open_payload(path: &Path) -> StoreResult<(File, u64)> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::MissingPayload {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata().await?.len();
    Ok((file, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    /// Yields `good` bytes, then fails.
    struct FailingReader {
        good: Vec<u8>,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.good.is_empty() {
                let reset = io::Error::new(ErrorKind::ConnectionReset, "peer went away");
                return Poll::Ready(Err(reset));
            }
            let n = self.good.len().min(buf.remaining());
            buf.put_slice(&self.good[..n]);
            self.good.drain(..n);
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn copies_multiple_chunks() {
        let limits = TransferLimits { chunk_size: 16, max_bytes: None };
        for len in [1, 15, 16, 17, 16 * 5 + 3] {
            let data = pattern(len);
            let mut out = Vec::new();
            let n = copy_chunked(&mut data.as_slice(), &mut out, limits).await.unwrap();
            assert_eq!(n, len as u64);
            assert_eq!(out, data);
        }
    }

    #[tokio::test]
    async fn receive_writes_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("acme").join("tool-1.0.0.zip");
        let data = pattern(DEFAULT_CHUNK_SIZE * 3 + 7);
        let n = receive_to_file(&mut data.as_slice(), &dest, TransferLimits::default())
            .await
            .unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), data);
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("test-1.0.0.zip");
        let err = receive_to_file(&mut tokio::io::empty(), &dest, TransferLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmptyPayload));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn read_error_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("test-1.0.0.zip");
        let mut reader = FailingReader { good: pattern(100) };
        let limits = TransferLimits { chunk_size: 8, max_bytes: None };
        let err = receive_to_file(&mut reader, &dest, limits).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(ref e) if e.kind() == ErrorKind::ConnectionReset));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("test-1.0.0.zip");
        let data = pattern(100);
        let limits = TransferLimits { chunk_size: 10, max_bytes: Some(50) };
        let err = receive_to_file(&mut data.as_slice(), &dest, limits).await.unwrap_err();
        assert!(matches!(err, StoreError::PayloadTooLarge { limit: 50 }));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());

        let exact = pattern(50);
        assert_eq!(receive_to_file(&mut exact.as_slice(), &dest, limits).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn missing_payload_is_an_inconsistency() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_payload(&dir.path().join("gone.zip")).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingPayload { .. }));

        let present = dir.path().join("here.zip");
        tokio::fs::write(&present, b"abc").await.unwrap();
        let (_, len) = open_payload(&present).await.unwrap();
        assert_eq!(len, 3);
    }
}
