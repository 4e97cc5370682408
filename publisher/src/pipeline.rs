//! Release publishing pipeline.
//!
//! The pipeline runs strictly in order: resolve the release version, export
//! the public key, find the archives, then for each archive build, write,
//! and upload its manifest. The version and key are resolved once and shared
//! read-only by every manifest. Any failure aborts the run; manifests that
//! were already uploaded stay published.

use crate::artefact::error::ArtefactError;
use crate::artefact::manifest::{GpgPublicKey, Manifest, index_url, write_manifest};
use crate::artefact::naming::ArtefactName;
use crate::artefact::scanner::scan_archives;
use crate::artefact::sha256_digest::compute_sha256;
use crate::config::PublisherConfig;
use crate::error::{PublisherError, Result};
use crate::publish::IndexPublisher;
use crate::signing_key::{KeyFingerprint, KeySource, PublicKey};
use crate::version::{ReleaseVersion, VersionSource};
use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use std::io::Write;

/// Values shared by every manifest in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseContext {
    /// Version taken from the git tag.
    pub version: ReleaseVersion,
    /// Fingerprint of the signing key.
    pub fingerprint: KeyFingerprint,
    /// Exported public key.
    pub public_key: PublicKey,
}

/// External collaborators used by [`run`].
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Supplies the release version.
    pub versions: &'a dyn VersionSource,
    /// Exports the public signing key.
    pub keys: &'a dyn KeySource,
    /// Uploads manifests to the index.
    pub publisher: &'a dyn IndexPublisher,
}

/// Switches that change what a run does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Build and write manifests without uploading them.
    pub dry_run: bool,
    /// Suppress progress lines.
    pub quiet: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Manifests built and written to disk.
    pub built: usize,
    /// Manifests uploaded to the index.
    pub published: usize,
}

/// A manifest built for one archive.
#[derive(Debug, Clone)]
pub struct BuiltManifest {
    /// The parsed archive name.
    pub name: ArtefactName,
    /// The manifest contents.
    pub manifest: Manifest,
    /// The serialized manifest, exactly as written and uploaded.
    pub json: String,
    /// Where the manifest was written.
    pub manifest_path: Utf8PathBuf,
    /// The index endpoint the manifest belongs to.
    pub index_url: String,
}

/// Resolves the version and public key shared by every manifest.
///
/// The version is resolved first: an untagged commit aborts the run before
/// any key export or archive scan.
///
/// # Errors
///
/// Returns an error if the version cannot be resolved, the configured
/// fingerprint is invalid, or the key cannot be exported.
pub fn resolve_release(
    config: &PublisherConfig,
    versions: &dyn VersionSource,
    keys: &dyn KeySource,
) -> Result<ReleaseContext> {
    let version = versions.resolve()?;
    let fingerprint = config.fingerprint()?;
    let public_key = keys.export(&fingerprint)?;
    Ok(ReleaseContext {
        version,
        fingerprint,
        public_key,
    })
}

/// Builds the manifest for `archive` and writes it next to the archive.
///
/// # Errors
///
/// Returns an error if the archive name does not parse, the archive cannot
/// be read, or the manifest cannot be serialized or written.
pub fn build_manifest_for(
    archive: &Utf8Path,
    release: &ReleaseContext,
    config: &PublisherConfig,
) -> Result<BuiltManifest> {
    let file_name = archive
        .file_name()
        .ok_or_else(|| ArtefactError::InvalidArtefactName {
            value: archive.to_string(),
            reason: "path has no file name".to_owned(),
        })?;
    let name = ArtefactName::try_from(file_name)?;
    if let Some(message) = version_mismatch(&name, &release.version) {
        warn!("{message}");
    }

    let digest = compute_sha256(archive).map_err(|source| PublisherError::FileAccess {
        path: archive.to_owned(),
        source,
    })?;

    let key = GpgPublicKey::new(
        release.fingerprint.as_str(),
        release.public_key.armor(),
        config.signing_key.source.as_str(),
        config.signing_key.source_url.as_str(),
    );
    let manifest = Manifest::new(&name, &digest, &config.binary_base(), key);
    let json = manifest.to_json()?;

    let dir = archive.parent().unwrap_or_else(|| Utf8Path::new("."));
    let manifest_path =
        write_manifest(dir, &name, &json).map_err(|source| PublisherError::FileAccess {
            path: dir.join(name.manifest_filename()),
            source,
        })?;

    let url = index_url(&config.json_index_base(), &name);
    info!("built manifest {manifest_path} (sha256 {digest})");
    Ok(BuiltManifest {
        name,
        manifest,
        json,
        manifest_path,
        index_url: url,
    })
}

/// Publishes manifests for every archive in the configured directory.
///
/// Progress lines go to `stderr` and index responses to `stdout`.
///
/// # Errors
///
/// Returns the first error encountered; later archives are not processed.
pub fn run(
    config: &PublisherConfig,
    collaborators: Collaborators<'_>,
    options: RunOptions,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<RunSummary> {
    let release = resolve_release(config, collaborators.versions, collaborators.keys)?;
    progress(stderr, options, &format!("Version: {}", release.version))?;

    let archives = scan_archives(&config.dist_dir, &config.archive_pattern).map_err(|source| {
        PublisherError::FileAccess {
            path: config.dist_dir.clone(),
            source,
        }
    })?;
    if archives.is_empty() {
        progress(
            stderr,
            options,
            &format!("No archives matching {} in {}", config.archive_pattern, config.dist_dir),
        )?;
    }

    let mut summary = RunSummary::default();
    for archive in &archives {
        let built = build_manifest_for(archive, &release, config)?;
        summary.built += 1;

        if options.dry_run {
            progress(
                stderr,
                options,
                &format!("Would upload {} to {}", built.manifest_path, built.index_url),
            )?;
            continue;
        }

        progress(
            stderr,
            options,
            &format!("Uploading {} to {}", built.manifest_path, built.index_url),
        )?;
        let response = collaborators
            .publisher
            .put_manifest(&built.index_url, &built.json)?;
        writeln!(stdout, "{response}").map_err(|source| PublisherError::WriteFailed { source })?;
        summary.published += 1;
    }

    Ok(summary)
}

/// Describes a disagreement between an archive's version and the release
/// tag. The archive's own version still builds its URLs.
fn version_mismatch(name: &ArtefactName, version: &ReleaseVersion) -> Option<String> {
    (name.version() != version.as_str()).then(|| {
        format!(
            "{name} is versioned {} but the release tag is {version}",
            name.version()
        )
    })
}

fn progress(stderr: &mut dyn Write, options: RunOptions, line: &str) -> Result<()> {
    if options.quiet {
        return Ok(());
    }
    writeln!(stderr, "{line}").map_err(|source| PublisherError::WriteFailed { source })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
