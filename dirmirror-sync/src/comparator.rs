//! Content comparison — streamed SHA-256 digests.
//!
//! Only called for same-named files whose sizes already match; a size
//! mismatch is decided by the differ without opening either file.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use dirmirror_core::{io_err, SyncError};

/// Read buffer for hashing.
const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 of the file at `path`, read in [`CHUNK_SIZE`] chunks.
///
/// The file handle is closed before this returns.
pub fn file_digest(path: &Path) -> Result<[u8; 32], SyncError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(path, e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// `true` iff both files have the same SHA-256 digest.
///
/// A failure to open or read either file is returned as-is; equality is
/// unknown in that case.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool, SyncError> {
    let digest_a = file_digest(a)?;
    let digest_b = file_digest(b)?;
    let identical = digest_a == digest_b;
    if !identical {
        tracing::trace!(
            "digest mismatch: {}={} {}={}",
            a.display(),
            hex::encode(digest_a),
            b.display(),
            hex::encode(digest_b)
        );
    }
    Ok(identical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn digest_of_known_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            hex::encode(file_digest(&path).unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_spans_multiple_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.bin");
        let data: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let expected: [u8; 32] = Sha256::digest(&data).into();
        assert_eq!(file_digest(&path).unwrap(), expected);
    }

    #[test]
    fn same_bytes_are_identical() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::write(&a, "same content").unwrap();
        fs::write(&b, "same content").unwrap();
        assert!(files_identical(&a, &b).unwrap());
    }

    #[test]
    fn same_length_different_bytes_are_not_identical() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::write(&a, "hello").unwrap();
        fs::write(&b, "jello").unwrap();
        assert!(!files_identical(&a, &b).unwrap());
    }

    #[test]
    fn missing_file_is_an_error_not_a_verdict() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        fs::write(&a, "x").unwrap();
        let err = files_identical(&a, &tmp.path().join("gone")).unwrap_err();
        assert!(matches!(err, SyncError::PathNotFound { .. }), "got: {err}");
    }
}
