//! Error types for the provider index publisher.
//!
//! Every failure aborts the run. Variants carry enough context for the
//! printed diagnostic to name the input or operation that failed.

use crate::artefact::error::ArtefactError;
use crate::publish::PublishError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while publishing a release.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// The configuration file could not be read or parsed.
    #[error("invalid configuration {path}: {reason}")]
    Config {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidSetting {
        /// Name of the offending setting.
        field: &'static str,
        /// Description of the validation failure.
        reason: String,
    },

    /// The release version could not be determined from git.
    #[error("cannot determine release version: {message}")]
    VersionResolution {
        /// Description of the failure, usually git's stderr.
        message: String,
    },

    /// The public signing key could not be exported.
    #[error("cannot export public key {fingerprint}: {message}")]
    KeyExport {
        /// Fingerprint of the requested key.
        fingerprint: String,
        /// Description of the failure.
        message: String,
    },

    /// An external command could not be run to completion.
    #[error("{program} failed: {message}")]
    Command {
        /// The program that was invoked.
        program: String,
        /// Description of the failure.
        message: String,
    },

    /// An archive name was invalid.
    #[error(transparent)]
    Artefact(#[from] ArtefactError),

    /// Reading an archive or writing a manifest failed.
    #[error("I/O error on {path}: {source}")]
    FileAccess {
        /// The file being read or written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest serialization failed.
    #[error("manifest serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Uploading a manifest to the index failed.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Writing progress output failed.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`PublisherError`].
pub type Result<T> = std::result::Result<T, PublisherError>;
