//! End-to-end CLI tests against a scratch data directory

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn snipvault(dirs: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("snipvault").unwrap();
    cmd.env("SNIPVAULT_DATA_DIR", dirs.path().join("data"))
        .env("SNIPVAULT_CONFIG_DIR", dirs.path().join("config"))
        .env_remove("SNIPVAULT_REMOTE_URL");
    cmd
}

#[test]
fn help_lists_the_top_level_commands() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("snippets"))
        .stdout(predicate::str::contains("namespaces"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn unknown_subcommand_fails() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs).arg("frobnicate").assert().failure();
}

#[test]
fn stats_on_a_fresh_store_is_empty() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Snippets: 0"))
        .stdout(predicate::str::contains("Namespaces: 0"));
}

#[test]
fn add_then_list_round_trips_a_snippet() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs)
        .args(["snippets", "add", "Card", "--code", "<div/>", "--language", "tsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Snippet created"));

    snipvault(&dirs)
        .args(["snippets", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Card"))
        .stdout(predicate::str::contains("tsx"));
}

#[test]
fn namespaces_list_shows_the_default() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs)
        .args(["namespaces", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default - Default (default)"));
}

#[test]
fn deleting_the_default_namespace_is_refused() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs)
        .args(["namespaces", "delete", "default"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("default namespace"));
}

#[test]
fn destructive_commands_require_force() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs)
        .args(["snippets", "add", "Keep", "--code", "x"])
        .assert()
        .success();

    snipvault(&dirs)
        .arg("wipe")
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));

    snipvault(&dirs)
        .args(["snippets", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keep"));
}

#[test]
fn export_then_import_restores_the_store() {
    let dirs = TempDir::new().unwrap();
    let backup = dirs.path().join("backup.db");

    snipvault(&dirs)
        .args(["snippets", "add", "Card", "--code", "<div/>"])
        .assert()
        .success();
    snipvault(&dirs)
        .arg("export")
        .arg(&backup)
        .assert()
        .success();

    snipvault(&dirs).args(["wipe", "--force"]).assert().success();
    snipvault(&dirs)
        .args(["snippets", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No snippets found"));

    snipvault(&dirs)
        .arg("import")
        .arg(&backup)
        .arg("--force")
        .assert()
        .success();
    snipvault(&dirs)
        .args(["snippets", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Card"));
}

#[test]
fn config_defaults_to_the_local_backend() {
    let dirs = TempDir::new().unwrap();
    snipvault(&dirs)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend: local"));
}
