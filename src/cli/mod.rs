//! Command-line interface definitions for the `wp-sync` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `wp-sync` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wp-sync",
    about = "Pull a remote WordPress environment into the local site",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Replace the local database and uploads with those of a remote alias.
    #[command(
        name = "pull",
        about = "Replace the local database and uploads with those of a remote alias"
    )]
    Pull(PullCommand),
}

/// Arguments for the `wp-sync pull` subcommand.
///
/// Every option overrides the matching value loaded from `wp-sync.toml` or
/// `WP_SYNC_*` environment variables for this run only.
#[derive(Debug, Default, Parser)]
pub(crate) struct PullCommand {
    /// Alias to pull from, for example `@production` or `production`.
    ///
    /// Defaults to the configured `default_alias` when omitted.
    #[arg(value_name = "ALIAS")]
    pub(crate) alias: Option<String>,
    /// Directory receiving the pre-pull backup and the fetched dump.
    #[arg(long, value_name = "DIR")]
    pub(crate) backup_dir: Option<String>,
    /// Plugins to activate after import (comma or space separated).
    #[arg(long, value_name = "PLUGINS")]
    pub(crate) plugins_activate: Option<String>,
    /// Plugins to deactivate after import (comma or space separated).
    #[arg(long, value_name = "PLUGINS")]
    pub(crate) plugins_deactivate: Option<String>,
    /// Uploads directory, relative to the site root, to mirror from the alias.
    #[arg(long, value_name = "DIR")]
    pub(crate) upload_dir: Option<String>,
    /// Comma separated patterns excluded from the uploads mirror.
    #[arg(long, value_name = "PATTERNS")]
    pub(crate) exclude_dirs: Option<String>,
    /// Expected local home URL; read from `WP_HOME` when omitted.
    #[arg(long, value_name = "URL")]
    pub(crate) local_url: Option<String>,
}
