//! Registry manifest schema for published provider archives.
//!
//! One manifest is produced per archive. It tells registry clients where to
//! download the archive, where the checksum listing and its signature live,
//! what the archive's SHA-256 is, and which public key signs the release.
//! Field order is part of the registry contract and follows the declaration
//! order of the structs below:
//!
//! ```json
//! {
//!     "protocols": ["4.0", "5.0"],
//!     "os": "linux",
//!     "arch": "amd64",
//!     "filename": "terraform-provider-kubernetes_1.2.3_linux_amd64.zip",
//!     "download_url": "...",
//!     "shasums_url": "...",
//!     "shasums_signature_url": "...",
//!     "shasum": "...",
//!     "signing_keys": { "gpg_public_keys": [ { "key_id": "...", ... } ] }
//! }
//! ```

use super::naming::ArtefactName;
use super::sha256_digest::Sha256Digest;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// Plugin protocol versions every published provider supports.
pub const PROTOCOLS: [&str; 2] = ["4.0", "5.0"];

/// Indentation used when rendering manifests.
const JSON_INDENT: &[u8] = b"    ";

/// The manifest describing a single OS/architecture build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Supported plugin protocol versions.
    pub protocols: Vec<String>,
    /// Target operating system.
    pub os: String,
    /// Target architecture.
    pub arch: String,
    /// Canonical archive filename.
    pub filename: String,
    /// Where the archive can be downloaded.
    pub download_url: String,
    /// Where the release checksum listing can be downloaded.
    pub shasums_url: String,
    /// Where the detached signature over the checksum listing lives.
    pub shasums_signature_url: String,
    /// Lowercase hex SHA-256 of the archive.
    pub shasum: String,
    /// Keys that sign the release.
    pub signing_keys: SigningKeys,
}

/// The `signing_keys` section of a [`Manifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKeys {
    /// ASCII-armored GPG public keys.
    pub gpg_public_keys: Vec<GpgPublicKey>,
}

/// A GPG public key entry embedded in a [`Manifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpgPublicKey {
    /// Fingerprint of the signing key.
    pub key_id: String,
    /// The exported ASCII-armored public key block.
    pub ascii_armor: String,
    /// Trust signature; always empty for self-published providers.
    pub trust_signature: String,
    /// Attribution for the key owner.
    pub source: String,
    /// URL describing the key owner's security policy.
    pub source_url: String,
}

impl GpgPublicKey {
    /// Create a key entry with an empty trust signature.
    #[must_use]
    pub fn new(
        key_id: impl Into<String>,
        ascii_armor: impl Into<String>,
        source: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            ascii_armor: ascii_armor.into(),
            trust_signature: String::new(),
            source: source.into(),
            source_url: source_url.into(),
        }
    }
}

impl Manifest {
    /// Build the manifest for `name`.
    ///
    /// `binary_url` is the base URL of the binary host and must end with a
    /// `/`; the release version and filenames are appended to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_index_publisher::artefact::manifest::{GpgPublicKey, Manifest};
    /// use provider_index_publisher::artefact::naming::ArtefactName;
    /// use provider_index_publisher::artefact::sha256_digest::Sha256Digest;
    ///
    /// let name: ArtefactName = "tp_1.0.0_linux_amd64.zip".parse().unwrap();
    /// let key = GpgPublicKey::new("ABCD", "armor", "me", "https://example.test/security");
    /// let manifest = Manifest::new(
    ///     &name,
    ///     &Sha256Digest::of_bytes(b"zip"),
    ///     "https://bin.example.test/tp/",
    ///     key,
    /// );
    /// assert_eq!(
    ///     manifest.download_url,
    ///     "https://bin.example.test/tp/1.0.0/tp_1.0.0_linux_amd64.zip"
    /// );
    /// ```
    #[must_use]
    pub fn new(
        name: &ArtefactName,
        shasum: &Sha256Digest,
        binary_url: &str,
        key: GpgPublicKey,
    ) -> Self {
        let release_url = format!("{binary_url}{}/", name.version());
        Self {
            protocols: PROTOCOLS.iter().map(|p| (*p).to_owned()).collect(),
            os: name.os().to_owned(),
            arch: name.arch().to_owned(),
            filename: name.archive_filename(),
            download_url: format!("{release_url}{}", name.archive_filename()),
            shasums_url: format!("{release_url}{}", name.shasums_filename()),
            shasums_signature_url: format!(
                "{release_url}{}",
                name.shasums_signature_filename()
            ),
            shasum: shasum.as_str().to_owned(),
            signing_keys: SigningKeys {
                gpg_public_keys: vec![key],
            },
        }
    }

    /// Render the manifest as JSON indented by four spaces.
    ///
    /// The output has no trailing newline, so the same bytes are written to
    /// disk and sent to the index.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only emits valid UTF-8.
        String::from_utf8(buffer)
            .map_err(|e| <serde_json::Error as serde::ser::Error>::custom(e.to_string()))
    }
}

/// Return the index endpoint that stores the manifest for `name`.
///
/// # Examples
///
/// ```
/// use provider_index_publisher::artefact::manifest::index_url;
/// use provider_index_publisher::artefact::naming::ArtefactName;
///
/// let name: ArtefactName = "tp_1.0.0_linux_amd64.zip".parse().unwrap();
/// assert_eq!(
///     index_url("https://index.example.test/v1/me/tp/", &name),
///     "https://index.example.test/v1/me/tp/1.0.0/download/linux/amd64"
/// );
/// ```
#[must_use]
pub fn index_url(json_index_url: &str, name: &ArtefactName) -> String {
    format!(
        "{json_index_url}{}/download/{}/{}",
        name.version(),
        name.os(),
        name.arch()
    )
}

/// Write `json` to the manifest file for `name` inside `dir`.
///
/// An existing file of the same name is overwritten.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn write_manifest(dir: &Utf8Path, name: &ArtefactName, json: &str) -> io::Result<Utf8PathBuf> {
    let path = dir.join(name.manifest_filename());
    fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
