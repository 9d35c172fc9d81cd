//! The pull pipeline.
//!
//! [`Puller::pull`] resolves the alias, prepares local directories, takes the
//! run lock, and then runs every [`PullStep`] inside the maintenance-mode
//! bracket. Fatal failures unwind straight to the bracket's release; non-fatal
//! ones are counted on the [`RunContext`] and summarised in the
//! [`PullReport`].

use std::fmt;

use camino::Utf8PathBuf;
use tracing::{info, warn};

use crate::alias::{self, SiteUrls};
use crate::config::PullOptions;
use crate::context::RunContext;
use crate::mirror::TreeMirror;
use crate::runner::{
    CommandLine, CommandRunner, ExecContext, OnFailure, ProcessCommandRunner, WpCli,
};

mod error;
mod maintenance;
mod workspace;

pub use error::PullError;
pub use workspace::{LOCK_FILE, LocalTree, MaintenanceSentinel, PullLock, SENTINEL_FILE};

use maintenance::MaintenanceMode;

/// Timestamp format shared by the backup and dump file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Bracketed pipeline steps, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PullStep {
    /// Exports the local database to the backup file.
    Backup,
    /// Exports the remote database into the dump file.
    FetchRemoteDump,
    /// Empties the local database.
    ResetLocal,
    /// Loads the dump file into the local database.
    ImportDump,
    /// Replaces the remote home URL with the local one in every table.
    RewriteUrls,
    /// Activates and deactivates the configured plugins.
    ToggleFeatureFlags,
    /// Mirrors the remote uploads tree.
    MirrorTree,
}

impl PullStep {
    /// Every step in execution order.
    pub const ALL: [Self; 7] = [
        Self::Backup,
        Self::FetchRemoteDump,
        Self::ResetLocal,
        Self::ImportDump,
        Self::RewriteUrls,
        Self::ToggleFeatureFlags,
        Self::MirrorTree,
    ];
}

impl fmt::Display for PullStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Backup => "database backup",
            Self::FetchRemoteDump => "remote database export",
            Self::ResetLocal => "local database reset",
            Self::ImportDump => "database import",
            Self::RewriteUrls => "URL rewrite",
            Self::ToggleFeatureFlags => "plugin toggling",
            Self::MirrorTree => "uploads sync",
        })
    }
}

/// Terminal status of a pull that was not aborted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunStatus {
    /// No non-fatal failure was recorded.
    Success,
    /// At least one non-fatal failure was recorded.
    CompletedWithErrors,
}

/// Summary of a pull that ran to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PullReport {
    /// Alias the content was pulled from.
    pub alias: String,
    /// Number of non-fatal failures.
    pub errors: usize,
    /// Local database backup written before the reset.
    pub backup_file: Utf8PathBuf,
    /// Remote database dump that was imported.
    pub dump_file: Utf8PathBuf,
}

impl PullReport {
    /// Derives the terminal status from the error count.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        if self.errors == 0 {
            RunStatus::Success
        } else {
            RunStatus::CompletedWithErrors
        }
    }
}

/// Everything fixed before the bracket opens.
#[derive(Debug)]
struct RunPlan {
    alias: String,
    urls: SiteUrls,
    backup_dir: Utf8PathBuf,
    upload_dir: String,
    backup_file: Utf8PathBuf,
    dump_file: Utf8PathBuf,
}

/// Runs pulls against one local site.
#[derive(Debug)]
pub struct Puller<R: CommandRunner> {
    wp: WpCli<R>,
    mirror: TreeMirror,
    tree: LocalTree,
    options: PullOptions,
    timestamp: Option<String>,
}

impl Puller<ProcessCommandRunner> {
    /// Creates a puller that spawns real processes from `root`.
    #[must_use]
    pub fn with_process_runner(options: PullOptions, root: impl Into<Utf8PathBuf>) -> Self {
        Self::new(options, ProcessCommandRunner, root)
    }
}

impl<R: CommandRunner> Puller<R> {
    /// Creates a puller for the site rooted at `root`.
    #[must_use]
    pub fn new(options: PullOptions, runner: R, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            wp: WpCli::new(options.wp_bin.clone(), runner),
            mirror: TreeMirror::new(options.rsync_bin.clone()),
            tree: LocalTree::new(root),
            options,
            timestamp: None,
        }
    }

    /// Pins the timestamp used in file names instead of the current time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Command runner wrapper used for every call.
    #[must_use]
    pub const fn wp(&self) -> &WpCli<R> {
        &self.wp
    }

    /// Local site layout.
    #[must_use]
    pub const fn tree(&self) -> &LocalTree {
        &self.tree
    }

    /// Pulls content from `requested`, or the default alias, into the local
    /// site.
    ///
    /// # Errors
    ///
    /// Returns [`PullError`] for every fatal failure. Failures raised before
    /// maintenance mode is entered leave the local site untouched; failures
    /// inside the bracket are returned after maintenance mode is left.
    pub fn pull(
        &self,
        requested: Option<&str>,
        ctx: &mut RunContext,
    ) -> Result<PullReport, PullError> {
        let plan = self.prepare(requested, ctx)?;
        let _lock = self.tree.lock(&plan.backup_dir)?;
        let sentinel = self.tree.sentinel(&plan.backup_dir);
        maintenance::recover_stale(&self.wp, ctx, &sentinel);

        info!("Pulling from {}", plan.alias);
        let guard = MaintenanceMode::new(&self.wp, sentinel);
        let outcome = match guard.activate(ctx) {
            Ok(()) => self.run_steps(ctx, &plan),
            Err(err) => Err(err.into()),
        };
        let released = guard.release(ctx);
        outcome?;
        released?;

        Ok(report(plan, ctx))
    }

    fn prepare(
        &self,
        requested: Option<&str>,
        ctx: &mut RunContext,
    ) -> Result<RunPlan, PullError> {
        let registry = alias::load_registry(&self.wp, ctx)?;
        let entry = alias::resolve(requested, &registry, &self.options.default_alias)?;
        let environment = alias::validate(entry)?;
        let name = environment.name.clone();
        ctx.set_environment(environment);
        let urls = alias::check_connection(&self.wp, ctx, self.options.local_url.as_deref())?;

        let backup_dir = self.tree.ensure_dir(&self.options.backup_dir)?;
        let upload_dir = self.tree.effective_upload_dir(
            &self.options.upload_dir,
            &self.options.fallback_upload_dir,
        )?;

        let timestamp = self
            .timestamp
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format(TIMESTAMP_FORMAT).to_string());
        Ok(RunPlan {
            alias: name,
            urls,
            backup_file: backup_dir.join(format!("backup_{timestamp}.sql")),
            dump_file: backup_dir.join(format!("pull_{timestamp}.sql")),
            backup_dir,
            upload_dir,
        })
    }

    fn run_steps(&self, ctx: &mut RunContext, plan: &RunPlan) -> Result<(), PullError> {
        for step in PullStep::ALL {
            if ctx.is_interrupted() {
                return Err(PullError::Interrupted { step });
            }
            self.run_step(step, ctx, plan)?;
        }
        // A signal during the last step must not end as a finished run.
        if ctx.is_interrupted() {
            return Err(PullError::Interrupted {
                step: PullStep::MirrorTree,
            });
        }
        Ok(())
    }

    fn run_step(
        &self,
        step: PullStep,
        ctx: &mut RunContext,
        plan: &RunPlan,
    ) -> Result<(), PullError> {
        match step {
            PullStep::Backup => {
                info!("Backing up database");
                let command = CommandLine::new(["db", "export"])
                    .arg(plan.backup_file.as_str())
                    .arg("--single-transaction");
                self.local(ctx, &command)?;
            }
            PullStep::FetchRemoteDump => {
                info!("Pulling database from {}", plan.alias);
                let command = CommandLine::new(["db", "export", "-", "--single-transaction"]);
                self.wp
                    .run_to_file(ctx, &command, ExecContext::Remote, &plan.dump_file)?;
                info!("Database pulled from remote");
            }
            PullStep::ResetLocal => {
                info!("Resetting local database");
                self.local(ctx, &CommandLine::new(["db", "reset", "--yes"]))?;
            }
            PullStep::ImportDump => {
                info!("Importing database to local site");
                let command = CommandLine::new(["db", "import"]).arg(plan.dump_file.as_str());
                self.local(ctx, &command)?;
            }
            PullStep::RewriteUrls => {
                info!("Replacing site URL");
                let command = CommandLine::new(["search-replace"])
                    .arg(plan.urls.remote.as_str())
                    .arg(plan.urls.local.as_str())
                    .arg("--all-tables");
                self.local(ctx, &command)?;
            }
            PullStep::ToggleFeatureFlags => self.toggle_plugins(ctx)?,
            PullStep::MirrorTree => {
                self.mirror.mirror(
                    &self.wp,
                    ctx,
                    self.tree.root(),
                    &plan.upload_dir,
                    &self.options.exclude_dirs,
                );
            }
        }
        Ok(())
    }

    fn toggle_plugins(&self, ctx: &mut RunContext) -> Result<(), PullError> {
        let toggles = [
            ("activate", "Activating plugins", &self.options.plugins_activate),
            ("deactivate", "Deactivating plugins", &self.options.plugins_deactivate),
        ];
        for (action, message, plugins) in toggles {
            if plugins.is_empty() {
                continue;
            }
            info!("{message}");
            let command =
                CommandLine::new(["plugin", action]).args(plugins.iter().map(String::as_str));
            self.wp
                .run(ctx, &command, ExecContext::Local, OnFailure::Continue)?;
        }
        Ok(())
    }

    fn local(&self, ctx: &mut RunContext, command: &CommandLine) -> Result<(), PullError> {
        self.wp.run(ctx, command, ExecContext::Local, OnFailure::Abort)?;
        Ok(())
    }
}

fn report(plan: RunPlan, ctx: &RunContext) -> PullReport {
    let errors = ctx.error_count();
    if errors > 0 {
        warn!("Finished with {errors} errors");
    } else {
        info!("All tasks finished");
    }
    PullReport {
        alias: plan.alias,
        errors,
        backup_file: plan.backup_file,
        dump_file: plan.dump_file,
    }
}
