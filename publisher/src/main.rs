//! Provider index publisher CLI entrypoint.
//!
//! This binary publishes a manifest for every release archive in the build
//! output directory. It must run from a tagged commit with the signing key
//! available in the local GnuPG keyring.

use clap::Parser;
use provider_index_publisher::cli::Cli;
use provider_index_publisher::command::SystemCommandExecutor;
use provider_index_publisher::error::Result;
use provider_index_publisher::pipeline::{Collaborators, RunSummary, run};
use provider_index_publisher::publish::HttpPublisher;
use provider_index_publisher::signing_key::GpgKeySource;
use provider_index_publisher::version::GitTagVersionSource;
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let result = publish(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(result, cli.quiet, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Installs a stderr subscriber; `log` records are bridged into it.
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn publish(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<RunSummary> {
    let config = cli.load_config()?;
    config.validate()?;

    let executor = SystemCommandExecutor::default();
    let versions = GitTagVersionSource::new(executor);
    let keys = GpgKeySource::new(executor);
    let publisher = HttpPublisher::new(config.publish.timeout(), config.publish.retry_strategy());

    let collaborators = Collaborators {
        versions: &versions,
        keys: &keys,
        publisher: &publisher,
    };
    run(&config, collaborators, cli.run_options(), stdout, stderr)
}

fn exit_code_for_run_result(
    result: Result<RunSummary>,
    quiet: bool,
    stderr: &mut dyn Write,
) -> i32 {
    match result {
        Ok(summary) => {
            if !quiet {
                write_stderr_line(
                    stderr,
                    format_args!(
                        "Built {} manifest(s), published {}.",
                        summary.built, summary.published
                    ),
                );
            }
            0
        }
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}
