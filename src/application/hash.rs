//! Content hashing for uploads and downloads
//!
//! SHA-256 digests are logged for every uploaded file and used to check that a
//! downloaded sample matches the hash it was requested by.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

use crate::application::{ApplicationResult, IoResultExt};

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// Compute the lowercase hex SHA-256 of `content`.
pub fn content_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 of a file's contents, streaming it through the hasher.
pub fn file_sha256(path: &Path) -> ApplicationResult<String> {
    let mut file = File::open(path).with_path_context("open file for hashing", path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_path_context("read file for hashing", path)?;
    Ok(hex::encode(hasher.finalize()))
}

/// True if `s` looks like a hex-encoded SHA-256 digest (any case).
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == SHA256_HEX_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Compare a downloaded file against the hash it was requested by.
///
/// # Returns
/// `None` when `requested` is not a SHA-256 (MD5/SHA-1 lookups cannot be
/// checked this way), otherwise whether the file digest matches.
pub fn verify_download(path: &Path, requested: &str) -> ApplicationResult<Option<bool>> {
    if !is_sha256_hex(requested) {
        return Ok(None);
    }
    let actual = file_sha256(path)?;
    Ok(Some(actual.eq_ignore_ascii_case(requested)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_content_sha256_known_value() {
        assert_eq!(content_sha256(b"hello"), HELLO_SHA256);
    }

    #[test]
    fn test_is_sha256_hex() {
        assert!(is_sha256_hex(HELLO_SHA256));
        assert!(is_sha256_hex(&HELLO_SHA256.to_uppercase()));
        // md5
        assert!(!is_sha256_hex("5d41402abc4b2a76b9719d911017c592"));
        assert!(!is_sha256_hex(&"g".repeat(64)));
    }

    #[test]
    fn test_verify_download_matches() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sample.bin");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(verify_download(&path, HELLO_SHA256).unwrap(), Some(true));
        assert_eq!(
            verify_download(&path, &HELLO_SHA256.to_uppercase()).unwrap(),
            Some(true)
        );
        assert_eq!(verify_download(&path, &"0".repeat(64)).unwrap(), Some(false));
    }

    #[test]
    fn test_verify_download_skips_non_sha256() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.bin");

        // not hashed, so the missing file is never read
        assert_eq!(
            verify_download(&path, "5d41402abc4b2a76b9719d911017c592").unwrap(),
            None
        );
    }

    #[test]
    fn test_file_sha256_larger_than_copy_buffer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upload.bin");
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(file_sha256(&path).unwrap(), content_sha256(&content));
    }

    #[test]
    fn test_file_sha256_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(file_sha256(&temp.path().join("nope")).is_err());
    }
}
