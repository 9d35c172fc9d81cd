//! Binary entry point for the `wp-sync` CLI.

use std::io::{self, Write};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use wp_sync::{PullConfig, PullError, PullOverrides, Puller, RunContext, RunStatus};

mod cli;

use cli::{Cli, PullCommand};

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "WP_SYNC_LOG";
const DEFAULT_LOG_FILTER: &str = "wp_sync=info";

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to install the interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error(transparent)]
    Pull(#[from] PullError),
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let exit_code = match dispatch(cli) {
        Ok(_) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

fn dispatch(cli: Cli) -> Result<RunStatus, CliError> {
    match cli {
        Cli::Pull(command) => pull(command),
    }
}

fn pull(command: PullCommand) -> Result<RunStatus, CliError> {
    let (alias, overrides) = split_command(command);
    let options = PullConfig::load_without_cli_args()
        .and_then(|config| config.into_options(overrides))
        .map_err(PullError::from)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let puller = Puller::with_process_runner(options, ".");
    let mut ctx = RunContext::with_interrupt_flag(interrupted);
    let report = puller.pull(alias.as_deref(), &mut ctx)?;
    Ok(report.status())
}

fn split_command(command: PullCommand) -> (Option<String>, PullOverrides) {
    let PullCommand {
        alias,
        backup_dir,
        plugins_activate,
        plugins_deactivate,
        upload_dir,
        exclude_dirs,
        local_url,
    } = command;
    (
        alias,
        PullOverrides {
            backup_dir,
            plugins_activate,
            plugins_deactivate,
            upload_dir,
            exclude_dirs,
            local_url,
        },
    )
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "Error: {err}").ok();
}
