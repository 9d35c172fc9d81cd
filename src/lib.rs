//! Core library for `wp-sync`, a one-way WordPress pull tool.
//!
//! A pull replaces the local database with the database of a remote WP-CLI
//! alias, rewrites the home URL, toggles plugins, and mirrors the uploads
//! directory. The destructive steps run inside a maintenance-mode bracket
//! that is always released, and non-fatal failures are counted instead of
//! aborting the run.

pub mod alias;
pub mod config;
pub mod context;
pub mod mirror;
pub mod pipeline;
pub mod runner;
pub mod test_support;

pub use alias::{AliasError, AliasRecord, AliasRegistry, Environment, SiteUrls};
pub use config::{ConfigError, PullConfig, PullOptions, PullOverrides};
pub use context::RunContext;
pub use mirror::{MirrorOutcome, TreeMirror};
pub use pipeline::{PullError, PullReport, PullStep, Puller, RunStatus};
pub use runner::{
    CommandError, CommandLine, CommandOutput, CommandRunner, ExecContext, OnFailure,
    ProcessCommandRunner, RunnerError, WpCli,
};
