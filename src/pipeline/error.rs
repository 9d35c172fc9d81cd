//! Error types for the pull pipeline.

use camino::Utf8PathBuf;
use thiserror::Error;

use super::PullStep;
use crate::alias::AliasError;
use crate::config::ConfigError;
use crate::runner::CommandError;

/// Fatal failures that abort a pull.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PullError {
    /// Raised when configuration cannot be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when the alias cannot be resolved, validated, or checked.
    #[error(transparent)]
    Alias(#[from] AliasError),
    /// Raised when a fatal pipeline command fails.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// Raised when neither the configured nor the fallback uploads directory
    /// exists locally.
    #[error(
        "uploads directory {configured} does not exist (fallback {fallback} is also missing): \
         provide a valid upload directory"
    )]
    MissingUploadDir {
        /// Uploads directory from the options.
        configured: String,
        /// Fallback directory that was probed.
        fallback: String,
    },
    /// Raised when a local directory or marker file cannot be prepared.
    #[error("failed to prepare {path}: {message}")]
    Workspace {
        /// Path that could not be prepared.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when another pull holds the lock on the backup directory.
    #[error("another pull is already running (lock held on {path})")]
    AlreadyRunning {
        /// Lock file that is held.
        path: Utf8PathBuf,
    },
    /// Raised when a termination signal arrives during the pull.
    #[error("pull interrupted at {step}")]
    Interrupted {
        /// Step that was about to start, or the last one if it was running.
        step: PullStep,
    },
}
