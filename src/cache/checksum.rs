//! Streaming file checksums for cache validation.
//!
//! SHA-256 over fixed-size blocks so memory use stays bounded regardless of
//! document size. The digest is a content-identity fingerprint, not a
//! security boundary.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::utils::CHECKSUM_BLOCK_BYTES;

/// Compute the hex SHA-256 digest of a file, streaming in 4 KiB blocks.
///
/// Blocking; callers on the async runtime go through
/// [`compute_file_checksum`].
pub fn compute_file_checksum_sync(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut block = [0u8; CHECKSUM_BLOCK_BYTES];

    loop {
        let n = file.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Async wrapper: moves the streaming hash onto the blocking thread pool.
pub async fn compute_file_checksum(path: &Path) -> std::io::Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || compute_file_checksum_sync(&path))
        .await
        .map_err(|e| std::io::Error::other(format!("checksum task join error: {e}")))?
}

/// Hex SHA-256 digest of an in-memory buffer (used for content hashes)
#[must_use]
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_checksum_deterministic() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(b"same bytes every time").expect("write");
        let a = compute_file_checksum_sync(f.path()).expect("checksum");
        let b = compute_file_checksum_sync(f.path()).expect("checksum");
        assert_eq!(a, b);
    }

    #[test]
    fn test_checksum_differs_for_different_content() {
        let mut f1 = tempfile::NamedTempFile::new().expect("temp file");
        let mut f2 = tempfile::NamedTempFile::new().expect("temp file");
        f1.write_all(b"content one").expect("write");
        f2.write_all(b"content two").expect("write");
        let a = compute_file_checksum_sync(f1.path()).expect("checksum");
        let b = compute_file_checksum_sync(f2.path()).expect("checksum");
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_spans_block_boundary() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(&vec![0xAB; CHECKSUM_BLOCK_BYTES * 3 + 17])
            .expect("write");
        let digest = compute_file_checksum_sync(f.path()).expect("checksum");
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(compute_file_checksum_sync(Path::new("/no/such/file.doc")).is_err());
    }
}
