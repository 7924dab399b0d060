use crate::common::{INSTA_FILTERS, ripenv_upgrade_command};
use crate::ripenv_upgrade_snapshot;

#[test]
fn help_shows_all_commands() {
    let mut cmd = ripenv_upgrade_command();
    cmd.arg("--help");

    ripenv_upgrade_snapshot!(&INSTA_FILTERS, cmd, @r"
    success: true
    exit_code: 0
    ----- stdout -----
    Selective package upgrades for Pipfile projects.

    Usage: ripenv-upgrade [OPTIONS] <COMMAND>

    Commands:
      update  Upgrade packages in the lockfile, then sync the environment
      help    Print this message or the help of the given subcommand(s)

    Options:
      -v, --verbose...  Increase logging verbosity
      -q, --quiet       Suppress all output
      -h, --help        Print help
      -V, --version     Print version

    Use `ripenv-upgrade help <command>` for more information on a specific command.
    ----- stderr -----
    ");
}

#[test]
fn help_update() {
    let mut cmd = ripenv_upgrade_command();
    cmd.args(["help", "update"]);

    let output = cmd.output().expect("Failed to execute ripenv-upgrade");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in ["--dev", "--categories", "--outdated", "--dry-run", "--lock-only"] {
        assert!(stdout.contains(flag), "missing {flag} in:\n{stdout}");
    }
}

#[test]
fn upgrade_alias_works() {
    let mut cmd = ripenv_upgrade_command();
    cmd.args(["upgrade", "--help"]);

    let output = cmd.output().expect("Failed to execute ripenv-upgrade");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Upgrade packages"));
}

#[test]
fn version_is_reported() {
    let mut cmd = ripenv_upgrade_command();
    cmd.arg("--version");

    let output = cmd.output().expect("Failed to execute ripenv-upgrade");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.starts_with("ripenv-upgrade "), "{stdout}");
}

#[test]
fn unknown_command_errors() {
    let mut cmd = ripenv_upgrade_command();
    cmd.arg("nonexistent");

    let output = cmd.output().expect("Failed to execute ripenv-upgrade");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unknown_category_is_rejected() {
    let mut cmd = ripenv_upgrade_command();
    cmd.args(["update", "--categories", "docs"]);

    let output = cmd.output().expect("Failed to execute ripenv-upgrade");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn update_fails_without_pipfile() {
    let dir = tempfile::TempDir::new().unwrap();

    let mut cmd = ripenv_upgrade_command();
    cmd.current_dir(dir.path())
        .env("PIPENV_MAX_DEPTH", "1")
        .args(["update", "requests"]);

    let output = cmd.output().expect("Failed to execute ripenv-upgrade");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("No Pipfile found"), "{stderr}");
}

#[test]
fn quiet_still_reports_errors() {
    let dir = tempfile::TempDir::new().unwrap();

    let mut cmd = ripenv_upgrade_command();
    cmd.current_dir(dir.path())
        .env("PIPENV_MAX_DEPTH", "1")
        .args(["--quiet", "update"]);

    let output = cmd.output().expect("Failed to execute ripenv-upgrade");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("error"), "{stderr}");
}
