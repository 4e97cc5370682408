//! Artefact naming policy for provider release archives.
//!
//! Release archives are named `{name}_{version}_{os}_{arch}.zip`. The base
//! name may itself contain underscores, so parsing works from the right: the
//! last three underscore-separated tokens are the version, operating system,
//! and architecture, and everything before them is the base name.

use super::error::{ArtefactError, Result};
use std::fmt;
use std::str::FromStr;

/// The fixed file extension for release archives.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// The fixed file extension for emitted manifests.
pub const MANIFEST_EXTENSION: &str = ".json";

/// Suffix of the checksum listing published alongside each release.
const SHASUMS_SUFFIX: &str = "SHA256SUMS";

/// Delimiter between name components.
const SEPARATOR: char = '_';

/// A parsed release archive name.
///
/// # Examples
///
/// ```
/// use provider_index_publisher::artefact::naming::ArtefactName;
///
/// let name: ArtefactName = "terraform-provider-kubernetes_1.2.3_linux_amd64.zip"
///     .parse()
///     .expect("valid archive name");
/// assert_eq!(name.base(), "terraform-provider-kubernetes");
/// assert_eq!(name.version(), "1.2.3");
/// assert_eq!(name.os(), "linux");
/// assert_eq!(name.arch(), "amd64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtefactName {
    base: String,
    version: String,
    os: String,
    arch: String,
}

impl ArtefactName {
    /// Return the base name (everything before the version token).
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Return the version token.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Return the operating system token.
    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Return the architecture token.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Return the stem shared by the archive and its manifest.
    #[must_use]
    pub fn stem(&self) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.base, self.version, self.os, self.arch
        )
    }

    /// Return the canonical archive filename.
    #[must_use]
    pub fn archive_filename(&self) -> String {
        format!("{}{ARCHIVE_EXTENSION}", self.stem())
    }

    /// Return the filename of the JSON manifest written next to the archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_index_publisher::artefact::naming::ArtefactName;
    ///
    /// let name: ArtefactName = "tp_kube_0.4.0_darwin_arm64.zip".parse().unwrap();
    /// assert_eq!(name.manifest_filename(), "tp_kube_0.4.0_darwin_arm64.json");
    /// ```
    #[must_use]
    pub fn manifest_filename(&self) -> String {
        format!("{}{MANIFEST_EXTENSION}", self.stem())
    }

    /// Return the filename of the release checksum listing.
    #[must_use]
    pub fn shasums_filename(&self) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{SHASUMS_SUFFIX}",
            self.base, self.version
        )
    }

    /// Return the filename of the detached signature over the checksum listing.
    #[must_use]
    pub fn shasums_signature_filename(&self) -> String {
        format!("{}.sig", self.shasums_filename())
    }
}

impl fmt::Display for ArtefactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.archive_filename())
    }
}

impl FromStr for ArtefactName {
    type Err = ArtefactError;

    fn from_str(value: &str) -> Result<Self> {
        parse_archive_name(value)
    }
}

impl TryFrom<&str> for ArtefactName {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        parse_archive_name(value)
    }
}

/// Split `value` into base name, version, OS, and architecture.
fn parse_archive_name(value: &str) -> Result<ArtefactName> {
    let invalid = |reason: &str| ArtefactError::InvalidArtefactName {
        value: value.to_owned(),
        reason: reason.to_owned(),
    };

    let stem = value
        .strip_suffix(ARCHIVE_EXTENSION)
        .ok_or_else(|| invalid("expected a .zip archive"))?;

    let mut tokens = stem.rsplitn(4, SEPARATOR);
    let (Some(arch), Some(os), Some(version), Some(base)) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(invalid(
            "expected four underscore-separated fields: name, version, os, arch",
        ));
    };

    if base.is_empty() {
        return Err(invalid("base name is empty"));
    }
    if [version, os, arch].iter().any(|token| token.is_empty()) {
        return Err(invalid("version, os, and arch must all be non-empty"));
    }

    Ok(ArtefactName {
        base: base.to_owned(),
        version: version.to_owned(),
        os: os.to_owned(),
        arch: arch.to_owned(),
    })
}
