//! Shared test utilities for the publisher crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour suites under `tests/`.

use crate::command::CommandExecutor;
use crate::error::{PublisherError, Result};
use crate::publish::{IndexPublisher, PublishError};
use crate::signing_key::{KeyFingerprint, KeySource, PublicKey};
use crate::version::{ReleaseVersion, VersionSource};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn success_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "git").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(PublisherError::StubMismatch {
                message: format!("unexpected invocation: {cmd} {}", args.join(" ")),
            });
        };

        if call.cmd != cmd || call.args.as_slice() != args {
            return Err(PublisherError::StubMismatch {
                message: format!(
                    "expected `{} {}`, got `{cmd} {}`",
                    call.cmd,
                    call.args.join(" "),
                    args.join(" ")
                ),
            });
        }

        call.result
    }
}

/// A version source that returns a fixed tag, or fails when none is set.
#[derive(Debug, Default)]
pub struct FixedVersionSource {
    tag: Option<String>,
    calls: Cell<usize>,
}

impl FixedVersionSource {
    /// Creates a source that resolves `tag`.
    #[must_use]
    pub fn tagged(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_owned()),
            calls: Cell::new(0),
        }
    }

    /// Creates a source behaving like an untagged commit.
    #[must_use]
    pub fn untagged() -> Self {
        Self::default()
    }

    /// Returns how many times the version was resolved.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl VersionSource for FixedVersionSource {
    fn resolve(&self) -> Result<ReleaseVersion> {
        self.calls.set(self.calls.get() + 1);
        match &self.tag {
            Some(tag) => ReleaseVersion::from_tag(tag),
            None => Err(PublisherError::VersionResolution {
                message: "fatal: no tag exactly matches".to_owned(),
            }),
        }
    }
}

/// A key source returning a fixed armored block.
#[derive(Debug)]
pub struct FixedKeySource {
    armor: String,
    calls: Cell<usize>,
}

impl FixedKeySource {
    /// Creates a source that exports `armor` for any fingerprint.
    #[must_use]
    pub fn new(armor: &str) -> Self {
        Self {
            armor: armor.to_owned(),
            calls: Cell::new(0),
        }
    }

    /// Returns how many times a key was exported.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl KeySource for FixedKeySource {
    fn export(&self, _fingerprint: &KeyFingerprint) -> Result<PublicKey> {
        self.calls.set(self.calls.get() + 1);
        Ok(PublicKey::new(self.armor.clone()))
    }
}

/// A single upload captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Target URL.
    pub url: String,
    /// Request body.
    pub body: String,
}

/// An index publisher that records uploads instead of sending them.
///
/// When a failing status is set, every upload after the first
/// `succeed_first` uploads is rejected with it.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    uploads: RefCell<Vec<RecordedUpload>>,
    failure: Option<(usize, u16)>,
}

impl RecordingPublisher {
    /// Creates a publisher that accepts every upload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a publisher that accepts `succeed_first` uploads and rejects
    /// the rest with `status`.
    #[must_use]
    pub fn failing_after(succeed_first: usize, status: u16) -> Self {
        Self {
            uploads: RefCell::default(),
            failure: Some((succeed_first, status)),
        }
    }

    /// Returns the uploads attempted so far, including rejected ones.
    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.borrow().clone()
    }
}

impl IndexPublisher for RecordingPublisher {
    fn put_manifest(&self, url: &str, json: &str) -> std::result::Result<String, PublishError> {
        let mut uploads = self.uploads.borrow_mut();
        uploads.push(RecordedUpload {
            url: url.to_owned(),
            body: json.to_owned(),
        });
        match self.failure {
            Some((succeed_first, status)) if uploads.len() > succeed_first => {
                Err(PublishError::Status {
                    url: url.to_owned(),
                    status,
                })
            }
            _ => Ok(format!("stored {url}")),
        }
    }
}
