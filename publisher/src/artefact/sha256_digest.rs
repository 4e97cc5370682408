//! SHA-256 digest newtype and archive hashing.
//!
//! The registry expects the `shasum` field to be a 64-character lowercase
//! hexadecimal string. [`compute_sha256`] streams an archive through `sha2`
//! and produces that representation directly.

use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;

/// Read buffer size used while hashing archives.
const READ_CHUNK: usize = 8192;

/// A lowercase hex-encoded SHA-256 digest.
///
/// Values are only produced by hashing, so the representation is always
/// 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Hash an in-memory byte slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_index_publisher::artefact::sha256_digest::Sha256Digest;
    ///
    /// let digest = Sha256Digest::of_bytes(b"");
    /// assert_eq!(
    ///     digest.as_str(),
    ///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    /// );
    /// ```
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the SHA-256 digest of a file.
///
/// Reads the file at `path` in chunks and returns the lowercase hex digest.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn compute_sha256(path: &Utf8Path) -> std::io::Result<Sha256Digest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        let Some(chunk) = buffer.get(..bytes_read).filter(|c| !c.is_empty()) else {
            break;
        };
        hasher.update(chunk);
    }
    // sha2 renders exactly 64 lowercase hex characters.
    Ok(Sha256Digest(format!("{:x}", hasher.finalize())))
}
