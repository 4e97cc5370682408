//! Release version resolution.
//!
//! A release is only publishable from a tagged commit. The version is taken
//! from the tag that exactly matches `HEAD`, with any leading `v` removed so
//! that URLs carry a bare semantic version.

use crate::command::{CommandExecutor, failure_message};
use crate::error::{PublisherError, Result};
use log::info;
use std::fmt;

/// A bare release version such as `1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Builds a version from raw tag output.
    ///
    /// Surrounding whitespace and leading `v` characters are removed.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::VersionResolution`] if nothing remains.
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_index_publisher::version::ReleaseVersion;
    ///
    /// let version = ReleaseVersion::from_tag("v1.2.3\n").expect("valid tag");
    /// assert_eq!(version.as_str(), "1.2.3");
    /// ```
    pub fn from_tag(tag: &str) -> Result<Self> {
        let bare = tag.trim().trim_start_matches('v');
        if bare.is_empty() {
            return Err(PublisherError::VersionResolution {
                message: format!("tag {:?} does not contain a version", tag.trim()),
            });
        }
        Ok(Self(bare.to_owned()))
    }

    /// Returns the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the release version for the current build.
pub trait VersionSource {
    /// Resolves the release version.
    ///
    /// # Errors
    ///
    /// Returns an error if the current build has no well-defined version.
    fn resolve(&self) -> Result<ReleaseVersion>;
}

/// Resolves the version from the git tag on the current commit.
#[derive(Debug)]
pub struct GitTagVersionSource<E> {
    executor: E,
}

impl<E: CommandExecutor> GitTagVersionSource<E> {
    /// Creates a source that runs git through `executor`.
    #[must_use]
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: CommandExecutor> VersionSource for GitTagVersionSource<E> {
    fn resolve(&self) -> Result<ReleaseVersion> {
        let output = self
            .executor
            .run("git", &["describe", "--exact-match", "--tags"])?;
        if !output.status.success() {
            return Err(PublisherError::VersionResolution {
                message: failure_message(&output),
            });
        }

        let tag = String::from_utf8_lossy(&output.stdout);
        info!("release tag: {}", tag.trim());
        ReleaseVersion::from_tag(&tag)
    }
}
