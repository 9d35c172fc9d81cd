//! Dual-context command execution for WP-CLI.
//!
//! [`WpCli`] runs application sub-commands either against the local site or
//! against a resolved alias through WP-CLI's own `--ssh` channel, and raw
//! executables on the local host. Each call states whether a failure aborts
//! the pull or is counted on the [`RunContext`] so the pull can continue.

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, error};

use crate::context::RunContext;

mod command_line;
mod types;

pub use command_line::CommandLine;
pub use types::{CommandOutput, CommandRunner, ProcessCommandRunner, RunnerError};

/// Flag appended to every WP-CLI sub-command.
pub const QUIET_FLAG: &str = "--quiet";

/// Where a command executes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecContext {
    /// A WP-CLI sub-command against the local site.
    Local,
    /// A WP-CLI sub-command against the resolved alias.
    Remote,
    /// An arbitrary local executable; the first part is the program.
    RawLocal,
}

/// What happens when a command fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OnFailure {
    /// Propagate the failure and abort the pull.
    Abort,
    /// Report the failure, count it, and return empty output.
    Continue,
}

/// Errors surfaced by a single command invocation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    /// Raised when a local command exits with a non-zero status.
    #[error("error running `{command}` (status {status_text}): {stderr}")]
    Failed {
        /// Rendered command line.
        command: String,
        /// Human readable exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
    /// Raised when a remote command exits with a non-zero status.
    #[error("error running remote command `{command}` on `{alias}` (status {status_text}): {stderr}")]
    RemoteFailed {
        /// Rendered command line.
        command: String,
        /// Alias the command was routed to.
        alias: String,
        /// Human readable exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
    /// Raised when a remote command is requested before an alias resolved.
    #[error("cannot run remote command `{command}`: no alias resolved")]
    NoEnvironment {
        /// Rendered command line.
        command: String,
    },
    /// Raised when a raw command line has no program.
    #[error("cannot run an empty command line")]
    EmptyCommand,
    /// Raised when the process could not be started or its output stored.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Runs WP-CLI sub-commands and raw executables with a failure policy.
#[derive(Clone, Debug)]
pub struct WpCli<R: CommandRunner> {
    wp_bin: String,
    runner: R,
}

impl WpCli<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    #[must_use]
    pub fn with_process_runner(wp_bin: impl Into<String>) -> Self {
        Self::new(wp_bin, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> WpCli<R> {
    /// Creates a runner invoking `wp_bin` for WP-CLI sub-commands.
    #[must_use]
    pub fn new(wp_bin: impl Into<String>, runner: R) -> Self {
        Self {
            wp_bin: wp_bin.into(),
            runner,
        }
    }

    /// Returns the underlying process runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs `command` in `exec` and returns its standard output.
    ///
    /// With [`OnFailure::Continue`] a failure is logged, counted on `ctx`, and
    /// reported as empty output. Stderr of a successful command is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] only under [`OnFailure::Abort`].
    pub fn run(
        &self,
        ctx: &mut RunContext,
        command: &CommandLine,
        exec: ExecContext,
        on_failure: OnFailure,
    ) -> Result<String, CommandError> {
        let outcome = self.try_run(ctx, command, exec);
        settle(ctx, outcome, on_failure)
    }

    /// Runs `command` in `exec`, streaming its standard output to
    /// `destination`. Failures always abort.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the command cannot start, exits with a
    /// non-zero status, or the destination cannot be written.
    pub fn run_to_file(
        &self,
        ctx: &RunContext,
        command: &CommandLine,
        exec: ExecContext,
        destination: &Utf8Path,
    ) -> Result<(), CommandError> {
        let (program, args) = self.invocation(ctx, command, exec)?;
        debug!(command = %command, %destination, "streaming command output to file");
        let output =
            self.runner
                .run_to_file(&program, &CommandLine::os_args(&args), destination)?;
        check_status(ctx, command, exec, output).map(|_| ())
    }

    /// Runs `command` as a capability check: `true` on a zero exit status.
    /// Failures are neither logged nor counted.
    #[must_use]
    pub fn probe(&self, ctx: &RunContext, command: &CommandLine, exec: ExecContext) -> bool {
        self.try_run(ctx, command, exec).is_ok()
    }

    fn try_run(
        &self,
        ctx: &RunContext,
        command: &CommandLine,
        exec: ExecContext,
    ) -> Result<String, CommandError> {
        let (program, args) = self.invocation(ctx, command, exec)?;
        debug!(command = %command, ?exec, "running command");
        let output = self.runner.run(&program, &CommandLine::os_args(&args))?;
        check_status(ctx, command, exec, output)
    }

    fn invocation(
        &self,
        ctx: &RunContext,
        command: &CommandLine,
        exec: ExecContext,
    ) -> Result<(String, Vec<String>), CommandError> {
        match exec {
            ExecContext::Local => {
                let mut args = command.parts().to_vec();
                args.push(String::from(QUIET_FLAG));
                Ok((self.wp_bin.clone(), args))
            }
            ExecContext::Remote => {
                let environment = ctx.environment().ok_or_else(|| CommandError::NoEnvironment {
                    command: command.to_string(),
                })?;
                let mut args = Vec::with_capacity(command.parts().len() + 2);
                args.push(environment.ssh_arg());
                args.extend_from_slice(command.parts());
                args.push(String::from(QUIET_FLAG));
                Ok((self.wp_bin.clone(), args))
            }
            ExecContext::RawLocal => {
                let (program, args) = command
                    .parts()
                    .split_first()
                    .ok_or(CommandError::EmptyCommand)?;
                Ok((program.clone(), args.to_vec()))
            }
        }
    }
}

fn check_status(
    ctx: &RunContext,
    command: &CommandLine,
    exec: ExecContext,
    output: CommandOutput,
) -> Result<String, CommandError> {
    if output.is_success() {
        return Ok(output.stdout);
    }

    let status_text = output.status_text();
    let stderr = output.stderr.trim().to_owned();
    match (exec, ctx.environment()) {
        (ExecContext::Remote, Some(environment)) => Err(CommandError::RemoteFailed {
            command: command.to_string(),
            alias: environment.name.clone(),
            status_text,
            stderr,
        }),
        _ => Err(CommandError::Failed {
            command: command.to_string(),
            status_text,
            stderr,
        }),
    }
}

fn settle(
    ctx: &mut RunContext,
    outcome: Result<String, CommandError>,
    on_failure: OnFailure,
) -> Result<String, CommandError> {
    match (outcome, on_failure) {
        (Ok(stdout), _) => Ok(stdout),
        (Err(err), OnFailure::Abort) => Err(err),
        (Err(err), OnFailure::Continue) => {
            error!("{err}");
            ctx.record_failure();
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests;
