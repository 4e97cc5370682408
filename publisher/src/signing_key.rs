//! Signing key identity and public key export.
//!
//! Registry clients verify the checksum listing against the public key
//! embedded in each manifest. The key is identified by a fixed fingerprint
//! and exported in ASCII-armored form by `gpg`.

use crate::command::{CommandExecutor, failure_message};
use crate::error::{PublisherError, Result};
use log::debug;
use std::fmt;

/// Accepted fingerprint lengths: long key ID and full v4 fingerprint.
const FINGERPRINT_LENGTHS: [usize; 2] = [16, 40];

/// A validated OpenPGP key fingerprint, stored upper-case.
///
/// # Examples
///
/// ```
/// use provider_index_publisher::signing_key::KeyFingerprint;
///
/// let fpr = KeyFingerprint::try_from("370cc41578fc61a73584f324a03728fc9b4b6b85")
///     .expect("valid fingerprint");
/// assert_eq!(fpr.as_str(), "370CC41578FC61A73584F324A03728FC9B4B6B85");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    /// Returns the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for KeyFingerprint {
    type Error = PublisherError;

    fn try_from(value: &str) -> Result<Self> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        let invalid = |reason: String| PublisherError::InvalidSetting {
            field: "signing_key.fingerprint",
            reason: format!("{value:?}: {reason}"),
        };

        if !FINGERPRINT_LENGTHS.contains(&compact.len()) {
            return Err(invalid(format!(
                "expected 16 or 40 hex characters, got {}",
                compact.len()
            )));
        }
        if let Some(bad) = compact.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(invalid(format!("non-hex character '{bad}'")));
        }
        Ok(Self(compact.to_ascii_uppercase()))
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ASCII-armored public key block, embedded verbatim in manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(String);

impl PublicKey {
    /// Wraps an armored key block.
    #[must_use]
    pub fn new(armor: impl Into<String>) -> Self {
        Self(armor.into())
    }

    /// Returns the armored key text.
    #[must_use]
    pub fn armor(&self) -> &str {
        &self.0
    }
}

/// Source of the public half of the release signing key.
pub trait KeySource {
    /// Exports the public key identified by `fingerprint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be exported.
    fn export(&self, fingerprint: &KeyFingerprint) -> Result<PublicKey>;
}

/// Exports public keys from the local GnuPG keyring.
#[derive(Debug)]
pub struct GpgKeySource<E> {
    executor: E,
}

impl<E: CommandExecutor> GpgKeySource<E> {
    /// Creates a source that runs gpg through `executor`.
    #[must_use]
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: CommandExecutor> KeySource for GpgKeySource<E> {
    fn export(&self, fingerprint: &KeyFingerprint) -> Result<PublicKey> {
        let output = self
            .executor
            .run("gpg", &["--armor", "--export", fingerprint.as_str()])?;
        if !output.status.success() {
            return Err(PublisherError::KeyExport {
                fingerprint: fingerprint.to_string(),
                message: failure_message(&output),
            });
        }

        let armor = String::from_utf8_lossy(&output.stdout).into_owned();
        // gpg exits successfully with no output when the key is unknown.
        if armor.trim().is_empty() {
            return Err(PublisherError::KeyExport {
                fingerprint: fingerprint.to_string(),
                message: "no such key in the keyring".to_owned(),
            });
        }

        debug!("exported {} bytes of armored key {fingerprint}", armor.len());
        Ok(PublicKey(armor))
    }
}
