//! Unit tests for dual-context command execution.

use super::*;
use crate::alias::Environment;
use crate::test_support::{RuleRunner, ScriptedRunner};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn environment() -> Environment {
    Environment {
        name: String::from("@production"),
        connection: String::from("u@h"),
        remote_path: String::from("/srv/app"),
    }
}

#[fixture]
fn resolved_ctx(environment: Environment) -> RunContext {
    let mut ctx = RunContext::new();
    ctx.set_environment(environment);
    ctx
}

fn option_get_home() -> CommandLine {
    CommandLine::new(["option", "get", "home"])
}

#[rstest]
fn local_commands_append_quiet_flag() {
    let runner = ScriptedRunner::new();
    runner.push_stdout("https://dev.test\n");
    let wp = WpCli::new("wp", runner);
    let mut ctx = RunContext::new();

    let stdout = wp
        .run(&mut ctx, &option_get_home(), ExecContext::Local, OnFailure::Abort)
        .expect("local command should succeed");

    assert_eq!(stdout, "https://dev.test\n");
    let invocations = wp.runner().invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(
        invocations.first().map(|call| call.command_string()),
        Some(String::from("wp option get home --quiet"))
    );
}

#[rstest]
fn remote_commands_route_through_ssh_argument(mut resolved_ctx: RunContext) {
    let runner = ScriptedRunner::new();
    runner.push_stdout("https://example.com");
    let wp = WpCli::new("wp", runner);

    wp.run(
        &mut resolved_ctx,
        &option_get_home(),
        ExecContext::Remote,
        OnFailure::Abort,
    )
    .expect("remote command should succeed");

    assert_eq!(
        wp.runner()
            .invocations()
            .first()
            .map(|call| call.command_string()),
        Some(String::from(
            "wp --ssh=u@h:/srv/app option get home --quiet"
        ))
    );
}

#[rstest]
fn raw_local_commands_run_program_verbatim() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let wp = WpCli::new("wp", runner);
    let mut ctx = RunContext::new();

    wp.run(
        &mut ctx,
        &CommandLine::new(["rsync", "--version"]),
        ExecContext::RawLocal,
        OnFailure::Abort,
    )
    .expect("raw command should succeed");

    let invocations = wp.runner().invocations();
    let call = invocations.first().expect("one invocation");
    assert_eq!(call.program, "rsync");
    assert_eq!(call.command_string(), "rsync --version");
}

#[rstest]
fn raw_local_rejects_empty_command_line() {
    let wp = WpCli::new("wp", ScriptedRunner::new());
    let mut ctx = RunContext::new();

    let err = wp
        .run(
            &mut ctx,
            &CommandLine::default(),
            ExecContext::RawLocal,
            OnFailure::Abort,
        )
        .expect_err("empty command should fail");
    assert_eq!(err, CommandError::EmptyCommand);
    assert!(wp.runner().invocations().is_empty());
}

#[rstest]
fn remote_without_environment_aborts_when_fatal() {
    let wp = WpCli::new("wp", ScriptedRunner::new());
    let mut ctx = RunContext::new();

    let err = wp
        .run(&mut ctx, &option_get_home(), ExecContext::Remote, OnFailure::Abort)
        .expect_err("remote call without alias should fail");

    assert!(matches!(err, CommandError::NoEnvironment { .. }), "{err:?}");
    assert!(wp.runner().invocations().is_empty(), "nothing should run");
    assert_eq!(ctx.error_count(), 0);
}

#[rstest]
fn remote_without_environment_is_counted_when_non_fatal() {
    let wp = WpCli::new("wp", ScriptedRunner::new());
    let mut ctx = RunContext::new();

    let stdout = wp
        .run(
            &mut ctx,
            &option_get_home(),
            ExecContext::Remote,
            OnFailure::Continue,
        )
        .expect("non-fatal failure should not propagate");

    assert!(stdout.is_empty());
    assert_eq!(ctx.error_count(), 1);
    assert!(wp.runner().invocations().is_empty());
}

#[rstest]
fn non_zero_exit_aborts_with_stderr_when_fatal() {
    let runner = ScriptedRunner::new();
    runner.push_failure(3);
    let wp = WpCli::new("wp", runner);
    let mut ctx = RunContext::new();

    let err = wp
        .run(
            &mut ctx,
            &CommandLine::new(["db", "reset", "--yes"]),
            ExecContext::Local,
            OnFailure::Abort,
        )
        .expect_err("failure should propagate");

    let CommandError::Failed {
        command,
        status_text,
        stderr,
    } = err
    else {
        panic!("expected Failed, got {err:?}");
    };
    assert_eq!(command, "db reset --yes");
    assert_eq!(status_text, "3");
    assert_eq!(stderr, "simulated failure");
    assert_eq!(ctx.error_count(), 0);
}

#[rstest]
fn remote_failure_names_the_alias(mut resolved_ctx: RunContext) {
    let runner = ScriptedRunner::new();
    runner.push_missing_exit_code();
    let wp = WpCli::new("wp", runner);

    let err = wp
        .run(
            &mut resolved_ctx,
            &option_get_home(),
            ExecContext::Remote,
            OnFailure::Abort,
        )
        .expect_err("killed process should fail");

    let message = err.to_string();
    assert!(message.contains("`@production`"), "{message}");
    assert!(message.contains("status unknown"), "{message}");
}

#[rstest]
fn non_zero_exit_is_counted_and_returns_empty_output_when_non_fatal() {
    let runner = RuleRunner::new();
    runner.fail("plugin activate", 1, "Plugin 'seo' not found.");
    let wp = WpCli::new("wp", runner);
    let mut ctx = RunContext::new();

    let stdout = wp
        .run(
            &mut ctx,
            &CommandLine::new(["plugin", "activate", "seo"]),
            ExecContext::Local,
            OnFailure::Continue,
        )
        .expect("non-fatal failure should not propagate");

    assert!(stdout.is_empty());
    assert_eq!(ctx.error_count(), 1);
}

#[rstest]
fn spawn_failures_follow_the_failure_policy() {
    let runner = RuleRunner::new();
    runner.fail_to_spawn("rsync");
    let wp = WpCli::new("wp", runner);
    let mut ctx = RunContext::new();
    let command = CommandLine::new(["rsync", "--version"]);

    let err = wp
        .run(&mut ctx, &command, ExecContext::RawLocal, OnFailure::Abort)
        .expect_err("spawn failure should propagate");
    assert!(matches!(err, CommandError::Runner(RunnerError::Spawn { .. })));

    wp.run(&mut ctx, &command, ExecContext::RawLocal, OnFailure::Continue)
        .expect("non-fatal spawn failure should not propagate");
    assert_eq!(ctx.error_count(), 1);
}

#[rstest]
fn successful_output_is_returned_untrimmed() {
    let runner = RuleRunner::new();
    runner.respond("option get home", "https://dev.test\n");
    let wp = WpCli::new("wp", runner);
    let mut ctx = RunContext::new();

    let stdout = wp
        .run(&mut ctx, &option_get_home(), ExecContext::Local, OnFailure::Abort)
        .expect("command should succeed");
    assert_eq!(stdout, "https://dev.test\n");
}

#[rstest]
fn run_to_file_writes_stdout_on_success(resolved_ctx: RunContext) {
    let tmp = TempDir::new().expect("temp dir");
    let destination =
        Utf8PathBuf::from_path_buf(tmp.path().join("pull.sql")).expect("utf8 path");
    let runner = RuleRunner::new();
    runner.respond("db export -", "-- dump\n");
    let wp = WpCli::new("wp", runner);

    wp.run_to_file(
        &resolved_ctx,
        &CommandLine::new(["db", "export", "-", "--single-transaction"]),
        ExecContext::Remote,
        &destination,
    )
    .expect("export should succeed");

    let written = std::fs::read_to_string(&destination).expect("dump written");
    assert_eq!(written, "-- dump\n");
    assert_eq!(
        wp.runner().commands(),
        vec![String::from(
            "wp --ssh=u@h:/srv/app db export - --single-transaction --quiet"
        )]
    );
}

#[rstest]
fn run_to_file_fails_without_writing_on_error(resolved_ctx: RunContext) {
    let tmp = TempDir::new().expect("temp dir");
    let destination =
        Utf8PathBuf::from_path_buf(tmp.path().join("pull.sql")).expect("utf8 path");
    let runner = RuleRunner::new();
    runner.fail("db export", 1, "Error establishing a database connection");
    let wp = WpCli::new("wp", runner);

    let err = wp
        .run_to_file(
            &resolved_ctx,
            &CommandLine::new(["db", "export", "-"]),
            ExecContext::Remote,
            &destination,
        )
        .expect_err("export should fail");

    assert!(matches!(err, CommandError::RemoteFailed { .. }), "{err:?}");
    assert!(!destination.exists());
}

#[rstest]
fn process_runner_streams_to_file() {
    let tmp = TempDir::new().expect("temp dir");
    let destination = Utf8PathBuf::from_path_buf(tmp.path().join("out.txt")).expect("utf8 path");

    let output = ProcessCommandRunner
        .run_to_file(
            "sh",
            &[
                std::ffi::OsString::from("-c"),
                std::ffi::OsString::from("printf streamed"),
            ],
            &destination,
        )
        .expect("sh should run");

    assert!(output.is_success());
    assert!(output.stdout.is_empty());
    assert_eq!(
        std::fs::read_to_string(&destination).expect("file written"),
        "streamed"
    );
}

#[rstest]
fn process_runner_removes_partial_file_on_failure() {
    let tmp = TempDir::new().expect("temp dir");
    let destination = Utf8PathBuf::from_path_buf(tmp.path().join("out.txt")).expect("utf8 path");

    let output = ProcessCommandRunner
        .run_to_file(
            "sh",
            &[
                std::ffi::OsString::from("-c"),
                std::ffi::OsString::from("printf partial; exit 4"),
            ],
            &destination,
        )
        .expect("sh should run");

    assert_eq!(output.code, Some(4));
    assert!(!destination.exists());
}

#[rstest]
fn command_line_display_shell_escapes_parts() {
    let command = CommandLine::new(["search-replace", "https://a b", "it's"]);
    assert_eq!(
        command.to_string(),
        "search-replace 'https://a b' 'it'\\''s'"
    );
}

#[rstest]
fn command_line_builders_preserve_part_order() {
    let empty = CommandLine::default();
    assert!(empty.is_empty());

    let command = CommandLine::new(["plugin", "activate"]).args(["seo", "cache"]);
    assert!(!command.is_empty());
    assert_eq!(command.parts(), ["plugin", "activate", "seo", "cache"]);
}
