//! Integration tests for login/logout/status and the login guard.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn api_url(server: &MockServer) -> String {
    format!("{}/api/v1", server.uri())
}

fn write_session(home: &TempDir, session: &Value) {
    fs::write(
        home.path().join("session.json"),
        serde_json::to_string(session).unwrap(),
    )
    .unwrap();
}

fn read_session(home: &TempDir) -> Option<Value> {
    let contents = fs::read_to_string(home.path().join("session.json")).ok()?;
    serde_json::from_str(&contents).ok()
}

#[tokio::test]
async fn test_login_writes_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token/"))
        .and(body_json(json!({"username": "alice", "password": "s3cret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .env("CMONEY_BASE_URL", api_url(&server))
        .env_remove("CMONEY_PASSWORD")
        .args(["login", "--username", "alice", "--remember"])
        .write_stdin("s3cret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as alice"));

    let session = read_session(&home).unwrap();
    assert_eq!(session["access_token"], "A1");
    assert_eq!(session["refresh_token"], "R1");
    assert_eq!(session["username"], "alice");
    assert_eq!(session["remember_username"], "alice");

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .env("CMONEY_BASE_URL", api_url(&server))
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as alice"))
        .stdout(predicate::str::contains("A1").not());
}

#[tokio::test]
async fn test_login_rejected_shows_backend_message() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .env("CMONEY_BASE_URL", api_url(&server))
        .env("CMONEY_PASSWORD", "wrong")
        .args(["login", "-u", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active account found"))
        .stderr(predicate::str::contains("session has ended").not());

    assert!(read_session(&home).is_none());
}

#[test]
fn test_login_without_username_or_remembered() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .env("CMONEY_PASSWORD", "x")
        .arg("login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--username"));
}

#[test]
fn test_logout_clears_session() {
    let home = tempdir().unwrap();
    write_session(
        &home,
        &json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "username": "alice",
            "remember_username": "alice"
        }),
    );

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    assert!(!home.path().join("session.json").exists());

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_truncated_session_file_does_not_block_commands() {
    let home = tempdir().unwrap();
    fs::write(home.path().join("session.json"), r#"{"access_token": "#).unwrap();

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));

    assert!(!home.path().join("session.json").exists());
}

#[test]
fn test_protected_command_without_session_is_redirected() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .env("CMONEY_BASE_URL", "http://127.0.0.1:9/api/v1")
        .args(["budgets", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("redirected to /login"));

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .args(["open", "#/budgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("redirected to /login"));
}

#[tokio::test]
async fn test_refresh_failure_logs_out_and_hints_login() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    write_session(
        &home,
        &json!({"access_token": "A1", "refresh_token": "R1", "username": "alice"}),
    );

    Mock::given(method("GET"))
        .and(path("/api/v1/categories/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is invalid or expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .env("CMONEY_BASE_URL", api_url(&server))
        .args(["categories", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session refresh failed"))
        .stderr(predicate::str::contains("cmoney login"));

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_transparently() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    write_session(
        &home,
        &json!({"access_token": "A1", "refresh_token": "R1", "username": "alice"}),
    );

    Mock::given(method("GET"))
        .and(path("/api/v1/budgets/current_month/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/budgets/current_month/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3, "year_month": "2025-09", "amount": "1500.00", "category": null,
            "spent_amount": "300.00", "usage_percentage": "20.00"
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("cmoney")
        .env("CMONEY_HOME", home.path())
        .env("CMONEY_BASE_URL", api_url(&server))
        .args(["budgets", "current"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall"))
        .stdout(predicate::str::contains("1500.00"));

    let session = read_session(&home).unwrap();
    assert_eq!(session["access_token"], "A2");
    assert_eq!(session["refresh_token"], "R1");
}
