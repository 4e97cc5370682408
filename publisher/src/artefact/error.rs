//! Error types for artefact naming.
//!
//! Errors name the rejected input and the constraint it violated.

use thiserror::Error;

/// Errors arising from invalid artefact-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// An archive file name does not follow `{name}_{version}_{os}_{arch}.zip`.
    #[error("invalid artefact name \"{value}\": {reason}")]
    InvalidArtefactName {
        /// The rejected file name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
