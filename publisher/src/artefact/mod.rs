//! Artefact naming, digests, discovery, and registry manifests.
//!
//! This module implements the type-safe domain model for publishing
//! provider archives to a registry index:
//!
//! - [`error`] - Semantic error types for validation failures.
//! - [`naming`] - Archive file name parsing (`ArtefactName`).
//! - [`sha256_digest`] - SHA-256 digest newtype and file hashing.
//! - [`scanner`] - Discovery of build archives in the output directory.
//! - [`manifest`] - Registry manifest schema and serialization.

pub mod error;
pub mod manifest;
pub mod naming;
pub mod scanner;
pub mod sha256_digest;
