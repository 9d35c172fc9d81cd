//! Maintenance-mode bracket around the destructive pipeline steps.

use tracing::{debug, error, info, warn};

use super::workspace::MaintenanceSentinel;
use crate::context::RunContext;
use crate::runner::{CommandError, CommandLine, CommandRunner, ExecContext, OnFailure, WpCli};

fn activate_command() -> CommandLine {
    CommandLine::new(["maintenance-mode", "activate", "--force"])
}

fn deactivate_command() -> CommandLine {
    CommandLine::new(["maintenance-mode", "deactivate"])
}

fn is_active_command() -> CommandLine {
    CommandLine::new(["maintenance-mode", "is-active"])
}

/// Scoped maintenance mode.
///
/// The guard is armed as soon as it exists, so deactivation runs once on
/// every path out of the bracket: through [`MaintenanceMode::release`] or,
/// if the caller unwinds without releasing, on drop.
pub(crate) struct MaintenanceMode<'a, R: CommandRunner> {
    wp: &'a WpCli<R>,
    sentinel: MaintenanceSentinel,
    armed: bool,
}

impl<'a, R: CommandRunner> MaintenanceMode<'a, R> {
    pub(crate) const fn new(wp: &'a WpCli<R>, sentinel: MaintenanceSentinel) -> Self {
        Self {
            wp,
            sentinel,
            armed: true,
        }
    }

    /// Puts the local site into maintenance mode.
    pub(crate) fn activate(&self, ctx: &mut RunContext) -> Result<(), CommandError> {
        self.sentinel.mark();
        self.wp
            .run(ctx, &activate_command(), ExecContext::Local, OnFailure::Abort)?;
        Ok(())
    }

    /// Leaves maintenance mode. The sentinel is cleared only on success.
    pub(crate) fn release(mut self, ctx: &mut RunContext) -> Result<(), CommandError> {
        self.armed = false;
        self.wp
            .run(ctx, &deactivate_command(), ExecContext::Local, OnFailure::Abort)?;
        self.sentinel.clear();
        Ok(())
    }
}

impl<R: CommandRunner> Drop for MaintenanceMode<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut ctx = RunContext::new();
        match self.wp.run(
            &mut ctx,
            &deactivate_command(),
            ExecContext::Local,
            OnFailure::Abort,
        ) {
            Ok(_) => self.sentinel.clear(),
            Err(err) => error!("failed to leave maintenance mode: {err}"),
        }
    }
}

/// Leaves maintenance mode left behind by an earlier, aborted pull.
///
/// The sentinel is only a hint: `maintenance-mode is-active` decides whether
/// a deactivation is needed. A failed deactivation is counted on `ctx` and
/// the sentinel is kept for the next run.
pub(crate) fn recover_stale<R: CommandRunner>(
    wp: &WpCli<R>,
    ctx: &mut RunContext,
    sentinel: &MaintenanceSentinel,
) {
    if !sentinel.is_present() {
        return;
    }
    if !wp.probe(ctx, &is_active_command(), ExecContext::Local) {
        debug!(path = %sentinel.path(), "maintenance mode already inactive");
        sentinel.clear();
        return;
    }

    warn!(
        path = %sentinel.path(),
        "a previous pull left maintenance mode active; deactivating"
    );
    let errors_before = ctx.error_count();
    wp.run(ctx, &deactivate_command(), ExecContext::Local, OnFailure::Continue)
        .ok();
    if ctx.error_count() == errors_before {
        sentinel.clear();
        info!("Stale maintenance mode cleared");
    }
}
