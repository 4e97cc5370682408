//! External command execution.
//!
//! The release version and the public signing key both come from external
//! tools (`git` and `gpg`). They are invoked through [`CommandExecutor`] so
//! the pipeline can be exercised without those tools installed.

use crate::error::{PublisherError, Result};
use log::debug;
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default timeout for external commands (5 minutes).
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// [`Output::status`] and decide.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or does not finish
    /// in time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use provider_index_publisher::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("git", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), provider_index_publisher::error::PublisherError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        (**self).run(cmd, args)
    }
}

/// Executes commands on the host system with a timeout.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Creates an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::with_timeout(COMMAND_TIMEOUT)
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        debug!("running: {cmd} {}", args.join(" "));
        let spawn_failed = |e: io::Error| PublisherError::Command {
            program: cmd.to_owned(),
            message: e.to_string(),
        };

        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_failed)?;

        // Both pipes are drained while the child runs so a command writing
        // more than the pipe buffer cannot stall until the timeout.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let Some(status) = child.wait_timeout(self.timeout).map_err(spawn_failed)? else {
            if let Err(e) = child.kill() {
                debug!("failed to kill {cmd}: {e}");
            }
            if let Err(e) = child.wait() {
                debug!("failed to reap {cmd}: {e}");
            }
            // The readers are detached: a grandchild may still hold the pipes.
            return Err(PublisherError::Command {
                program: cmd.to_owned(),
                message: format!(
                    "timed out after {} seconds",
                    self.timeout.as_secs()
                ),
            });
        };

        Ok(Output {
            status,
            stdout: collect(cmd, stdout)?,
            stderr: collect(cmd, stderr)?,
        })
    }
}

type PipeReader = JoinHandle<io::Result<Vec<u8>>>;

/// Reads a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> PipeReader {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut reader) = pipe {
            reader.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn collect(cmd: &str, reader: PipeReader) -> Result<Vec<u8>> {
    let bytes = reader.join().map_err(|_| PublisherError::Command {
        program: cmd.to_owned(),
        message: "output reader thread panicked".to_owned(),
    })??;
    Ok(bytes)
}

/// Returns trimmed stderr, falling back to the exit status when it is empty.
pub(crate) fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("exited with {}", output.status)
    } else {
        trimmed.to_owned()
    }
}
