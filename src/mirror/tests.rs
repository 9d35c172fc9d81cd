//! Tests for the uploads mirror.

use super::*;
use crate::test_support::RuleRunner;
use rstest::{fixture, rstest};

#[fixture]
fn environment() -> Environment {
    Environment {
        name: String::from("@production"),
        connection: String::from("u@h"),
        remote_path: String::from("/srv/app"),
    }
}

#[fixture]
fn ctx(environment: Environment) -> RunContext {
    let mut ctx = RunContext::new();
    ctx.set_environment(environment);
    ctx
}

fn excludes(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|pattern| (*pattern).to_owned()).collect()
}

#[rstest]
fn transfer_command_mirrors_remote_uploads_into_local_root(environment: Environment) {
    let mirror = TreeMirror::new("rsync");
    let command = mirror.transfer_command(
        &environment,
        Utf8Path::new("."),
        "wp-content/uploads",
        &[],
    );

    assert_eq!(
        command.parts(),
        [
            "rsync",
            "-avhP",
            "u@h:/srv/app/wp-content/uploads/",
            "./wp-content/uploads/",
        ]
    );
}

#[rstest]
fn transfer_command_adds_one_exclude_per_pattern(environment: Environment) {
    let mirror = TreeMirror::new("rsync");
    let command = mirror.transfer_command(
        &environment,
        Utf8Path::new("."),
        "wp-content/uploads",
        &excludes(&["cache", "tmp"]),
    );

    let exclusions: Vec<&String> = command
        .parts()
        .iter()
        .filter(|part| part.starts_with("--exclude"))
        .collect();
    assert_eq!(exclusions, ["--exclude=cache", "--exclude=tmp"]);
}

#[rstest]
fn transfer_command_tolerates_trailing_slash_on_remote_path(mut environment: Environment) {
    environment.remote_path = String::from("/srv/app/");
    let command =
        TreeMirror::new("rsync").transfer_command(&environment, Utf8Path::new("."), "up", &[]);
    assert!(
        command.parts().contains(&String::from("u@h:/srv/app/up/")),
        "{command}"
    );
}

#[rstest]
fn missing_tool_is_counted_once_and_skips_transfer(mut ctx: RunContext) {
    let runner = RuleRunner::new();
    runner.fail_to_spawn("rsync --version");
    let wp = WpCli::new("wp", runner);

    let outcome = TreeMirror::new("rsync").mirror(
        &wp,
        &mut ctx,
        Utf8Path::new("."),
        "wp-content/uploads",
        &[],
    );

    assert_eq!(outcome, MirrorOutcome::ToolMissing);
    assert_eq!(ctx.error_count(), 1);
    assert_eq!(wp.runner().commands(), vec![String::from("rsync --version")]);
}

#[rstest]
fn failed_transfer_is_counted_once(mut ctx: RunContext) {
    let runner = RuleRunner::new();
    runner.fail("rsync -avhP", 23, "some files could not be transferred");
    let wp = WpCli::new("wp", runner);

    let outcome = TreeMirror::new("rsync").mirror(
        &wp,
        &mut ctx,
        Utf8Path::new("."),
        "wp-content/uploads",
        &excludes(&["cache"]),
    );

    assert_eq!(outcome, MirrorOutcome::Failed);
    assert_eq!(ctx.error_count(), 1);
    assert_eq!(wp.runner().count_matching("rsync -avhP"), 1);
}

#[rstest]
fn successful_transfer_records_nothing(mut ctx: RunContext) {
    let wp = WpCli::new("wp", RuleRunner::new());

    let outcome = TreeMirror::new("/usr/bin/rsync").mirror(
        &wp,
        &mut ctx,
        Utf8Path::new("/var/www/site"),
        "web/app/uploads",
        &excludes(&["cache", "tmp"]),
    );

    assert_eq!(outcome, MirrorOutcome::Synced);
    assert_eq!(ctx.error_count(), 0);
    assert_eq!(
        wp.runner().commands(),
        vec![
            String::from("/usr/bin/rsync --version"),
            String::from(
                "/usr/bin/rsync -avhP u@h:/srv/app/web/app/uploads/ /var/www/site/web/app/uploads/ --exclude=cache --exclude=tmp"
            ),
        ]
    );
}

#[rstest]
fn mirror_without_alias_is_counted() {
    let wp = WpCli::new("wp", RuleRunner::new());
    let mut ctx = RunContext::new();

    let outcome =
        TreeMirror::new("rsync").mirror(&wp, &mut ctx, Utf8Path::new("."), "uploads", &[]);

    assert_eq!(outcome, MirrorOutcome::Failed);
    assert_eq!(ctx.error_count(), 1);
}
