use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("base_url ="));
    assert!(contents.contains("[logging]"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_url_keeps_other_values() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[api]\ntimeout_secs = 15\n").unwrap();

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", dir.path())
        .args(["config", "set-url", "https://money.example.edu/api/v1"])
        .assert()
        .success();

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains(r#"base_url = "https://money.example.edu/api/v1""#));
    assert!(contents.contains("timeout_secs = 15"));
}

#[test]
fn test_config_set_url_rejects_garbage() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", dir.path())
        .args(["config", "set-url", "not a url"])
        .assert()
        .failure();

    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_config_generate_prints_template() {
    cargo_bin_cmd!("cmoney")
        .args(["config", "generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[api]"))
        .stdout(predicate::str::contains("http://127.0.0.1:8000/api/v1"));
}
