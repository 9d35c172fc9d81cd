//! Process-level command types and the runner abstraction.

use std::ffi::OsString;
use std::io;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Human readable exit status, `unknown` when the process was killed.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Failures to start a process or to touch the local filesystem on its
/// behalf.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RunnerError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when an output file cannot be created or written.
    #[error("failed to write {path}: {message}")]
    Io {
        /// File that could not be written.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError>;

    /// Runs `program` and stores its standard output in `destination`.
    ///
    /// The returned output carries an empty `stdout`. The default
    /// implementation buffers the output through [`CommandRunner::run`] and
    /// only writes the file when the command succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started, or
    /// [`RunnerError::Io`] when the destination cannot be written.
    fn run_to_file(
        &self,
        program: &str,
        args: &[OsString],
        destination: &Utf8Path,
    ) -> Result<CommandOutput, RunnerError> {
        let output = self.run(program, args)?;
        if output.is_success() {
            write_file(destination, output.stdout.as_bytes())?;
        }
        Ok(CommandOutput {
            stdout: String::new(),
            ..output
        })
    }
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| spawn_error(program, &err))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_to_file(
        &self,
        program: &str,
        args: &[OsString],
        destination: &Utf8Path,
    ) -> Result<CommandOutput, RunnerError> {
        // Streams straight to disk so dumps are neither buffered nor re-encoded.
        let file = create_file(destination)?;
        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::from(file))
            .output()
            .map_err(|err| spawn_error(program, &err))?;

        if !output.status.success() {
            remove_file(destination);
        }

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::new(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn spawn_error(program: &str, err: &io::Error) -> RunnerError {
    RunnerError::Spawn {
        program: program.to_owned(),
        message: err.to_string(),
    }
}

fn io_error(path: &Utf8Path, err: &io::Error) -> RunnerError {
    RunnerError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn split_path(path: &Utf8Path) -> Result<(Dir, &str), RunnerError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| RunnerError::Io {
        path: path.to_path_buf(),
        message: String::from("path is missing a filename"),
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| io_error(parent, &err))?;
    Ok((dir, file_name))
}

/// Writes `contents` to `path`, replacing any existing file.
fn write_file(path: &Utf8Path, contents: &[u8]) -> Result<(), RunnerError> {
    let (dir, file_name) = split_path(path)?;
    dir.write(file_name, contents)
        .map_err(|err| io_error(path, &err))
}

fn create_file(path: &Utf8Path) -> Result<std::fs::File, RunnerError> {
    let (dir, file_name) = split_path(path)?;
    dir.create(file_name)
        .map(cap_std::fs_utf8::File::into_std)
        .map_err(|err| io_error(path, &err))
}

fn remove_file(path: &Utf8Path) {
    if let Ok((dir, file_name)) = split_path(path) {
        dir.remove_file(file_name).ok();
    }
}
