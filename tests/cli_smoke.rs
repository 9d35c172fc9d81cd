//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

/// Runs `wp-sync` from an empty directory with no discoverable config.
fn isolated_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wp-sync");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("WP_SYNC_CONFIG_PATH")
        .env("WP_SYNC_LOG", "off");
    cmd
}

#[test]
fn help_lists_the_pull_command() {
    let mut cmd = cargo_bin_cmd!("wp-sync");
    cmd.arg("--help");
    cmd.assert().success().stdout(contains("pull"));
}

#[test]
fn missing_subcommand_prints_usage_and_fails() {
    let mut cmd = cargo_bin_cmd!("wp-sync");
    cmd.assert().failure().stderr(contains("Usage"));
}

#[test]
fn pull_help_documents_every_override() {
    let mut cmd = cargo_bin_cmd!("wp-sync");
    cmd.args(["pull", "--help"]);
    let output = cmd.output().expect("run wp-sync");
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--backup-dir",
        "--plugins-activate",
        "--plugins-deactivate",
        "--upload-dir",
        "--exclude-dirs",
        "--local-url",
    ] {
        assert!(help.contains(flag), "missing {flag} in:\n{help}");
    }
}

#[test]
fn unavailable_wp_cli_is_fatal() {
    let home = TempDir::new().expect("temp dir");
    let mut cmd = isolated_cmd(&home);
    cmd.env("WP_SYNC_WP_BIN", "/nonexistent/wp").arg("pull");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("Error: failed to spawn /nonexistent/wp"));
}

#[test]
fn blank_backup_dir_is_rejected_before_any_command() {
    let home = TempDir::new().expect("temp dir");
    let mut cmd = isolated_cmd(&home);
    cmd.env("WP_SYNC_WP_BIN", "/nonexistent/wp")
        .args(["pull", "--backup-dir", " "]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("missing backup_dir"))
        .stderr(contains("WP_SYNC_BACKUP_DIR"));
}

#[cfg(unix)]
#[test]
fn termination_signal_is_handled_instead_of_killing_the_process() {
    use std::os::unix::fs::PermissionsExt;
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::Duration;

    let home = TempDir::new().expect("temp dir");
    let started = home.path().join("wp-started");
    let wp = home.path().join("fake-wp");
    std::fs::write(
        &wp,
        format!("#!/bin/sh\ntouch '{}'\nsleep 2\n", started.display()),
    )
    .expect("write fake wp");
    std::fs::set_permissions(&wp, std::fs::Permissions::from_mode(0o755))
        .expect("make fake wp executable");

    let child = Command::new(env!("CARGO_BIN_EXE_wp-sync"))
        .arg("pull")
        .current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("WP_SYNC_CONFIG_PATH")
        .env("WP_SYNC_LOG", "off")
        .env("WP_SYNC_WP_BIN", &wp)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn wp-sync");

    for _ in 0..200 {
        if started.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(25));
    }
    assert!(started.exists(), "wp-sync never invoked wp");

    let signalled = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("run kill");
    assert!(signalled.success());

    let output = child.wait_with_output().expect("wait for wp-sync");
    assert_eq!(
        output.status.code(),
        Some(1),
        "SIGTERM should reach the handler, not kill the process"
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}
