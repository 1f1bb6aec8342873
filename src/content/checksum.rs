//! Checksum calculation using MD5
//!
//! The digest is a lowercase hex string (32 characters for 128 bits). Files
//! are streamed through the hasher in fixed-size chunks so large files never
//! need to fit in memory.

use crate::error::DigestError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read buffer size for streaming digests
const CHUNK_SIZE: usize = 128 * 1024;

/// Compute an MD5 checksum for the given content
///
/// # Example
///
/// ```
/// use dirsum::content::checksum::compute_md5;
///
/// let hash = compute_md5(b"file1");
/// assert_eq!(hash, "826e8142e6baabe8af779f5f490cf5f5");
/// ```
pub fn compute_md5(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}

/// Stream a file through MD5, returning the digest and the bytes read
pub fn digest_file(path: &Path) -> Result<(String, u64), DigestError> {
    let read_err = |source| DigestError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(e)),
        };
        context.consume(&buf[..n]);
        total += n as u64;
    }

    Ok((format!("{:x}", context.compute()), total))
}

/// Digest a file whose size was observed during discovery
///
/// A byte count that differs from `expected_size` means the file changed
/// while the run was in progress. That is a torn read and fails the run.
pub fn checksum_file(path: &Path, expected_size: u64) -> Result<String, DigestError> {
    let (digest, actual) = digest_file(path)?;
    if actual != expected_size {
        return Err(DigestError::SizeMismatch {
            path: path.to_path_buf(),
            expected: expected_size,
            actual,
        });
    }
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_compute_md5() {
        assert_eq!(compute_md5(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(compute_md5(b"dir1/file1"), "a09ebcef8ab11daef0e33e4394ea775f");

        let hash = compute_md5(b"file1");
        assert_eq!(hash.len(), 32);
        assert_ne!(hash, compute_md5(b"file2"));
    }

    #[test]
    fn test_digest_file_matches_in_memory_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("large");
        // Spans several read chunks
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let (digest, n) = digest_file(&path).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(digest, compute_md5(&data));
    }

    #[test]
    fn test_checksum_file_size_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a");
        std::fs::write(&path, b"file1").unwrap();

        assert_eq!(
            checksum_file(&path, 5).unwrap(),
            "826e8142e6baabe8af779f5f490cf5f5"
        );

        let err = checksum_file(&path, 7).unwrap_err();
        assert!(matches!(
            err,
            DigestError::SizeMismatch {
                expected: 7,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_checksum_missing_file() {
        let dir = tempdir().unwrap();
        let err = checksum_file(&dir.path().join("missing"), 0).unwrap_err();
        assert!(matches!(err, DigestError::Read { .. }));
    }
}
