//! Provider index publisher library.
//!
//! This crate builds registry manifests for provider release archives and
//! uploads them to a registry index. It is used by the
//! `provider-index-publish` CLI binary and can be consumed programmatically
//! for testing or custom release workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Archive naming, digests, discovery, and manifest schema
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - External command execution with timeouts
//! - [`config`] - TOML configuration with built-in defaults
//! - [`error`] - Semantic error types
//! - [`pipeline`] - Release publishing pipeline orchestration
//! - [`publish`] - Manifest upload and retry policy
//! - [`signing_key`] - Signing key fingerprint and public key export
//! - [`version`] - Release version resolution from git tags

pub mod artefact;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod signing_key;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
