//! Publisher configuration.
//!
//! Endpoints, the signing key identity, and upload policy are read from a
//! TOML file (by default `provider-index.toml` in the working directory).
//! Every setting has a default, so a missing default file is equivalent to
//! an empty one:
//!
//! ```toml
//! json_index_url = "https://registry.example.test/tf/providers/v1/acme/kubernetes/"
//! binary_url = "https://registry.example.test/binary/acme/terraform-provider-kubernetes/"
//! dist_dir = "dist"
//! archive_pattern = "*.zip"
//!
//! [signing_key]
//! fingerprint = "370CC41578FC61A73584F324A03728FC9B4B6B85"
//! source = "Acme Releases <releases@example.test>"
//! source_url = "https://www.hashicorp.com/security.html"
//!
//! [publish]
//! retries = 2
//! retry_delay_ms = 500
//! timeout_secs = 30
//! ```

use crate::artefact::scanner::DEFAULT_ARCHIVE_PATTERN;
use crate::error::{PublisherError, Result};
use crate::publish::{FixedDelay, NoRetry, RetryStrategy};
use crate::signing_key::KeyFingerprint;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "provider-index.toml";

const DEFAULT_JSON_INDEX_URL: &str =
    "https://dstower.home.dolbyn.com/tf/providers/v1/davidjspooner/kubernetes/";
const DEFAULT_BINARY_URL: &str =
    "https://dstower.home.dolbyn.com/binary/davidjspooner/terraform-provider-kubernetes/";
const DEFAULT_FINGERPRINT: &str = "370CC41578FC61A73584F324A03728FC9B4B6B85";
const DEFAULT_KEY_SOURCE: &str = "DavidSpooner <davidjspooner@gmail.com>";
const DEFAULT_KEY_SOURCE_URL: &str = "https://www.hashicorp.com/security.html";

/// Top-level publisher configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherConfig {
    /// Base URL of the JSON index; manifests are stored beneath it.
    pub json_index_url: String,
    /// Base URL of the binary host serving archives and checksum files.
    pub binary_url: String,
    /// Directory holding the build archives.
    pub dist_dir: Utf8PathBuf,
    /// Glob pattern selecting archives inside [`Self::dist_dir`].
    pub archive_pattern: String,
    /// Identity of the release signing key.
    pub signing_key: SigningKeyConfig,
    /// Upload behaviour.
    pub publish: PublishConfig,
}

/// Identity and attribution of the release signing key.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SigningKeyConfig {
    /// OpenPGP fingerprint of the key.
    pub fingerprint: String,
    /// Attribution recorded in each manifest.
    pub source: String,
    /// Security policy URL recorded in each manifest.
    pub source_url: String,
}

/// Upload policy.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Retries after a transient upload failure; zero disables retrying.
    pub retries: u32,
    /// Pause between retries in milliseconds.
    #[serde(default = "PublishConfig::default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-request timeout in seconds; unset leaves the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            json_index_url: DEFAULT_JSON_INDEX_URL.to_owned(),
            binary_url: DEFAULT_BINARY_URL.to_owned(),
            dist_dir: Utf8PathBuf::from("dist"),
            archive_pattern: DEFAULT_ARCHIVE_PATTERN.to_owned(),
            signing_key: SigningKeyConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl Default for SigningKeyConfig {
    fn default() -> Self {
        Self {
            fingerprint: DEFAULT_FINGERPRINT.to_owned(),
            source: DEFAULT_KEY_SOURCE.to_owned(),
            source_url: DEFAULT_KEY_SOURCE_URL.to_owned(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_delay_ms: Self::default_retry_delay_ms(),
            timeout_secs: None,
        }
    }
}

impl PublishConfig {
    const fn default_retry_delay_ms() -> u64 {
        1000
    }

    /// Returns the retry strategy described by this configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_index_publisher::config::PublishConfig;
    /// use provider_index_publisher::publish::PublishError;
    ///
    /// let config = PublishConfig::default();
    /// let err = PublishError::Status { url: "u".to_owned(), status: 503 };
    /// assert!(config.retry_strategy().next_delay(1, &err).is_none());
    /// ```
    #[must_use]
    pub fn retry_strategy(&self) -> Box<dyn RetryStrategy> {
        if self.retries == 0 {
            Box::new(NoRetry)
        } else {
            Box::new(FixedDelay {
                retries: self.retries,
                delay: Duration::from_millis(self.retry_delay_ms),
            })
        }
    }

    /// Returns the per-request timeout, if one is configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl PublisherConfig {
    /// Parses configuration from TOML text.
    ///
    /// `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Config`] if the text is not valid
    /// configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use provider_index_publisher::config::PublisherConfig;
    ///
    /// let config = PublisherConfig::from_toml_str(
    ///     "dist_dir = \"out\"\n",
    ///     Utf8Path::new("inline"),
    /// )
    /// .expect("valid config");
    /// assert_eq!(config.dist_dir, "out");
    /// ```
    pub fn from_toml_str(source: &str, origin: &Utf8Path) -> Result<Self> {
        toml::from_str::<Self>(source).map_err(|e| PublisherError::Config {
            path: origin.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Config`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| PublisherError::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        debug!("loaded configuration from {path}");
        Self::from_toml_str(&source, path)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Config`] if the file exists but cannot be
    /// read or parsed.
    pub fn load_or_default(path: &Utf8Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("{path} not found; using built-in configuration");
            Ok(Self::default())
        }
    }

    /// Returns the validated signing key fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidSetting`] if the fingerprint is not a
    /// 16 or 40 character hex string.
    pub fn fingerprint(&self) -> Result<KeyFingerprint> {
        KeyFingerprint::try_from(self.signing_key.fingerprint.as_str())
    }

    /// Returns the JSON index base URL with a trailing `/`.
    #[must_use]
    pub fn json_index_base(&self) -> String {
        with_trailing_slash(&self.json_index_url)
    }

    /// Returns the binary host base URL with a trailing `/`.
    #[must_use]
    pub fn binary_base(&self) -> String {
        with_trailing_slash(&self.binary_url)
    }

    /// Checks settings that serde cannot validate on its own.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidSetting`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        for (field, url) in [
            ("json_index_url", &self.json_index_url),
            ("binary_url", &self.binary_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(PublisherError::InvalidSetting {
                    field,
                    reason: format!("{url:?} is not an http(s) URL"),
                });
            }
        }
        if self.dist_dir.as_str().trim().is_empty() {
            return Err(PublisherError::InvalidSetting {
                field: "dist_dir",
                reason: "directory is empty".to_owned(),
            });
        }
        if self.archive_pattern.trim().is_empty() {
            return Err(PublisherError::InvalidSetting {
                field: "archive_pattern",
                reason: "pattern is empty".to_owned(),
            });
        }
        self.fingerprint().map(|_| ())
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn parse(source: &str) -> Result<PublisherConfig> {
        PublisherConfig::from_toml_str(source, Utf8Path::new("test.toml"))
    }

    #[rstest]
    fn defaults_are_valid() {
        let config = PublisherConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.dist_dir, "dist");
        assert_eq!(config.archive_pattern, "*.zip");
        assert_eq!(config.publish.retries, 0);
        assert!(config.publish.timeout().is_none());
    }

    #[rstest]
    fn empty_file_matches_defaults() {
        let config = parse("").expect("empty config");
        assert_eq!(config, PublisherConfig::default());
    }

    #[rstest]
    fn overrides_are_deserialised() {
        let source = concat!(
            "json_index_url = \"https://index.example.test/v1/acme/k8s\"\n",
            "dist_dir = \"out\"\n",
            "[signing_key]\n",
            "fingerprint = \"A03728FC9B4B6B85\"\n",
            "[publish]\n",
            "retries = 3\n",
            "timeout_secs = 10\n",
        );

        let config = parse(source).expect("valid config");

        assert_eq!(config.json_index_base(), "https://index.example.test/v1/acme/k8s/");
        assert_eq!(config.dist_dir, "out");
        assert_eq!(config.signing_key.fingerprint, "A03728FC9B4B6B85");
        assert_eq!(config.signing_key.source, DEFAULT_KEY_SOURCE);
        assert_eq!(config.publish.retries, 3);
        assert_eq!(config.publish.retry_delay_ms, 1000);
        assert_eq!(config.publish.timeout(), Some(Duration::from_secs(10)));
    }

    #[rstest]
    fn rejects_unknown_fields() {
        let outcome = parse("unexpected = true\n");
        assert!(matches!(outcome, Err(PublisherError::Config { .. })));
    }

    #[rstest]
    fn propagates_type_errors() {
        let outcome = parse("[publish]\nretries = \"many\"\n");
        assert!(matches!(outcome, Err(PublisherError::Config { .. })));
    }

    #[rstest]
    #[case("json_index_url = \"ftp://index\"\n", "json_index_url")]
    #[case("binary_url = \"bin\"\n", "binary_url")]
    #[case("dist_dir = \"\"\n", "dist_dir")]
    #[case("archive_pattern = \"  \"\n", "archive_pattern")]
    #[case("[signing_key]\nfingerprint = \"nope\"\n", "signing_key.fingerprint")]
    fn validate_names_bad_field(#[case] source: &str, #[case] expected: &str) {
        let config = parse(source).expect("parses");
        let err = config.validate().expect_err("invalid");
        assert!(matches!(err, PublisherError::InvalidSetting { field, .. } if field == expected));
    }

    #[rstest]
    fn base_urls_keep_existing_trailing_slash() {
        let config = PublisherConfig::default();
        assert_eq!(config.binary_base(), DEFAULT_BINARY_URL);
        assert!(!config.binary_base().ends_with("//"));
    }

    #[rstest]
    fn load_or_default_without_file_uses_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join(DEFAULT_CONFIG_FILE)).expect("utf-8");

        let config = PublisherConfig::load_or_default(&path).expect("defaults");

        assert_eq!(config, PublisherConfig::default());
    }

    #[rstest]
    fn load_reads_file_and_reports_missing_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("custom.toml")).expect("utf-8");

        let missing = PublisherConfig::load(&path);
        assert!(matches!(missing, Err(PublisherError::Config { .. })));

        fs::write(&path, "dist_dir = \"build\"\n").expect("write config");
        let config = PublisherConfig::load(&path).expect("load");
        assert_eq!(config.dist_dir, "build");
    }

    #[rstest]
    fn retry_strategy_follows_settings() {
        let transient = crate::publish::PublishError::Status {
            url: "u".to_owned(),
            status: 500,
        };
        let config = PublishConfig {
            retries: 1,
            retry_delay_ms: 20,
            timeout_secs: None,
        };
        let strategy = config.retry_strategy();
        assert_eq!(strategy.next_delay(1, &transient), Some(Duration::from_millis(20)));
        assert_eq!(strategy.next_delay(2, &transient), None);
    }
}
