use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_commands() {
    Command::cargo_bin("bookshelf")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("lookup"));
}

#[test]
fn config_prints_effective_settings() {
    Command::cargo_bin("bookshelf")
        .unwrap()
        .env("BOOKSHELF_ENV", "staging")
        .env("BOOKSHELF_CONFIG_DIR", std::env::temp_dir().join("bookshelf-cli-none"))
        .env("BOOKSHELF__SERVER__PORT", "9191")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"environment\": \"staging\""))
        .stdout(predicate::str::contains("\"port\": 9191"))
        .stdout(predicate::str::contains("memory://"));
}

#[test]
fn lookup_without_name_is_a_usage_error() {
    Command::cargo_bin("bookshelf")
        .unwrap()
        .arg("lookup")
        .assert()
        .failure();
}
