//! CLI argument definitions for the provider index publisher.
//!
//! This module defines the command-line interface using clap. It is
//! separated from the entrypoint so argument handling can be unit tested.

use crate::config::{DEFAULT_CONFIG_FILE, PublisherConfig};
use crate::error::Result;
use crate::pipeline::RunOptions;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

/// Publish provider release manifests to a registry index.
#[derive(Parser, Debug, Clone)]
#[command(name = "provider-index-publish")]
#[command(version, about)]
#[command(long_about = concat!(
    "Publish provider release manifests to a registry index.\n\n",
    "Run from a tagged commit after the release archives have been built. ",
    "For every archive named {name}_{version}_{os}_{arch}.zip in the output ",
    "directory, a JSON manifest with download URLs, the archive SHA-256, and ",
    "the public signing key is written next to the archive and uploaded to ",
    "the index with an HTTP PUT.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Publish everything in dist/ using provider-index.toml:\n",
    "    $ provider-index-publish\n\n",
    "  Write manifests without uploading:\n",
    "    $ provider-index-publish --dry-run\n\n",
    "  Retry transient upload failures:\n",
    "    $ provider-index-publish --retries 3 --retry-delay-ms 2000\n",
))]
pub struct Cli {
    /// Configuration file [default: provider-index.toml if present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory containing the release archives.
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,

    /// Base URL of the JSON index.
    #[arg(long, value_name = "URL")]
    pub json_index_url: Option<String>,

    /// Base URL of the binary host.
    #[arg(long, value_name = "URL")]
    pub binary_url: Option<String>,

    /// Fingerprint of the release signing key.
    #[arg(long, value_name = "FPR")]
    pub fingerprint: Option<String>,

    /// Retries after a transient upload failure.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Pause between upload retries in milliseconds.
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// Per-request upload timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Build and write manifests without uploading them.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Log filter, e.g. `info` or `provider_index_publisher=debug`.
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Loads the configuration file and applies command-line overrides.
    ///
    /// An explicit `--config` must exist; the implicit default file is
    /// optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn load_config(&self) -> Result<PublisherConfig> {
        let mut config = match &self.config {
            Some(path) => PublisherConfig::load(path)?,
            None => PublisherConfig::load_or_default(Utf8Path::new(DEFAULT_CONFIG_FILE))?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Overwrites configuration values with those given on the command line.
    pub fn apply_overrides(&self, config: &mut PublisherConfig) {
        if let Some(dir) = &self.dist_dir {
            config.dist_dir.clone_from(dir);
        }
        if let Some(url) = &self.json_index_url {
            config.json_index_url.clone_from(url);
        }
        if let Some(url) = &self.binary_url {
            config.binary_url.clone_from(url);
        }
        if let Some(fingerprint) = &self.fingerprint {
            config.signing_key.fingerprint.clone_from(fingerprint);
        }
        if let Some(retries) = self.retries {
            config.publish.retries = retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.publish.retry_delay_ms = delay;
        }
        if let Some(timeout) = self.timeout_secs {
            config.publish.timeout_secs = Some(timeout);
        }
    }

    /// Returns the run options selected on the command line.
    #[must_use]
    pub const fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            quiet: self.quiet,
        }
    }
}
