//! One-way uploads mirror from the resolved alias using `rsync`.
//!
//! Every failure here is non-fatal: a stale or partial uploads tree is
//! recovered by pulling again, so problems are reported and counted on the
//! [`RunContext`] instead of aborting the pull.

use camino::Utf8Path;
use tracing::{debug, error, info, warn};

use crate::alias::Environment;
use crate::context::RunContext;
use crate::runner::{CommandLine, CommandRunner, ExecContext, OnFailure, WpCli};

/// Archive, verbose, human-readable, partial/progress.
pub const RSYNC_FLAGS: &str = "-avhP";

/// How a mirror attempt ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirrorOutcome {
    /// The transfer completed.
    Synced,
    /// The mirror tool is unavailable; no transfer was attempted.
    ToolMissing,
    /// The transfer was attempted and failed, or could not be set up.
    Failed,
}

/// Mirrors the remote uploads tree into the local site root.
#[derive(Clone, Debug)]
pub struct TreeMirror {
    rsync_bin: String,
}

impl TreeMirror {
    /// Creates a mirror invoking `rsync_bin`.
    #[must_use]
    pub fn new(rsync_bin: impl Into<String>) -> Self {
        Self {
            rsync_bin: rsync_bin.into(),
        }
    }

    /// Copies `<alias>/<upload_dir>/` to `<local_root>/<upload_dir>/`.
    ///
    /// Probes for the tool first; a missing tool or a failed transfer is
    /// logged and counted once on `ctx`.
    pub fn mirror<R: CommandRunner>(
        &self,
        wp: &WpCli<R>,
        ctx: &mut RunContext,
        local_root: &Utf8Path,
        upload_dir: &str,
        excludes: &[String],
    ) -> MirrorOutcome {
        let version = CommandLine::new([self.rsync_bin.as_str(), "--version"]);
        if !wp.probe(ctx, &version, ExecContext::RawLocal) {
            warn!("{} not found. Please install rsync.", self.rsync_bin);
            ctx.record_failure();
            return MirrorOutcome::ToolMissing;
        }

        let Some(environment) = ctx.environment() else {
            error!("cannot mirror uploads: no alias resolved");
            ctx.record_failure();
            return MirrorOutcome::Failed;
        };
        let command = self.transfer_command(environment, local_root, upload_dir, excludes);

        info!("Syncing uploads folder");
        debug!(command = %command, "mirror command");
        let errors_before = ctx.error_count();
        wp.run(ctx, &command, ExecContext::RawLocal, OnFailure::Continue)
            .ok();
        if ctx.error_count() > errors_before {
            warn!("uploads folder was not fully synced; rerun the pull to retry");
            return MirrorOutcome::Failed;
        }

        info!("Uploads folder synced");
        MirrorOutcome::Synced
    }

    /// Builds the `rsync` invocation for one mirror run.
    #[must_use]
    pub fn transfer_command(
        &self,
        environment: &Environment,
        local_root: &Utf8Path,
        upload_dir: &str,
        excludes: &[String],
    ) -> CommandLine {
        let source = format!(
            "{}:{}/{upload_dir}/",
            environment.connection,
            environment.remote_path.trim_end_matches('/'),
        );
        let destination = format!("{}/", local_root.join(upload_dir));

        CommandLine::new([self.rsync_bin.as_str(), RSYNC_FLAGS])
            .arg(source)
            .arg(destination)
            .args(excludes.iter().map(|pattern| format!("--exclude={pattern}")))
    }
}

#[cfg(test)]
mod tests;
