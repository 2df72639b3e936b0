//! Integration tests for the bearer interceptor and refresh-on-401 recovery.

use std::time::Duration;

use cmoney_core::session::{AuthEvent, LogoutReason, SessionKey, TokenPair};
use cmoney_core::{ApiClient, ApiErrorKind, ApiRequest, SessionManager};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn client_for(server: &MockServer, session: &SessionManager) -> ApiClient {
    ApiClient::new(format!("{}/api/v1", server.uri()), session.clone())
}

fn logged_in(access: &str, refresh: &str) -> SessionManager {
    let session = SessionManager::in_memory();
    session
        .begin(
            "alice",
            &TokenPair {
                access: access.to_string(),
                refresh: refresh.to_string(),
            },
            true,
        )
        .unwrap();
    session
}

fn assert_cleared(session: &SessionManager) {
    for key in SessionKey::ALL {
        assert_eq!(session.get(key), None, "{} should be cleared", key.as_str());
    }
}

async fn mount_refresh(server: &MockServer, refresh: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token/refresh/"))
        .and(body_json(json!({ "refresh": refresh })))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bearer_header_attached() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path("/api/v1/categories/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server, &session)
        .send(&ApiRequest::get("/categories/").header("Authorization", "Bearer forged"))
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 200);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].headers.get_all("authorization").iter().count(), 1);
}

#[tokio::test]
async fn test_no_session_sends_no_header_and_keeps_401() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = SessionManager::in_memory();

    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Authentication credentials were not provided."
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(200), 0).await;

    let err = client_for(&server, &session)
        .send(&ApiRequest::get("/transactions/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::SessionEnded);
    assert_eq!(err.status.map(|s| s.as_u16()), Some(401));
    assert!(err.requires_login());
    assert_cleared(&session);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_refresh_then_retry_once() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");
    let mut events = session.subscribe();

    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Given token not valid for any token type"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [], "count": 0})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})),
        1,
    )
    .await;

    let response = client_for(&server, &session)
        .send(&ApiRequest::get("/transactions/").query("limit", "5"))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(session.access_token().as_deref(), Some("A2"));
    assert_eq!(session.refresh_token().as_deref(), Some("R1"));
    assert_eq!(events.try_recv().unwrap(), AuthEvent::TokenRefreshed);

    // The refresh call itself goes out without a bearer token.
    let requests = server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == "/api/v1/auth/token/refresh/")
        .unwrap();
    assert!(refresh.headers.get("authorization").is_none());
    let retried = requests.last().unwrap();
    assert_eq!(retried.url.query(), Some("limit=5"));
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path("/api/v1/budgets/alerts/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/budgets/alerts/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"access": "A2", "refresh": "R2"})),
        1,
    )
    .await;

    client_for(&server, &session)
        .send(&ApiRequest::get("/budgets/alerts/"))
        .await
        .unwrap();

    assert_eq!(session.refresh_token().as_deref(), Some("R2"));
}

#[tokio::test]
async fn test_refresh_failure_clears_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");
    let mut events = session.subscribe();

    Mock::given(method("GET"))
        .and(path("/api/v1/budgets/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid"
        })),
        1,
    )
    .await;

    let err = client_for(&server, &session)
        .send(&ApiRequest::get("/budgets/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::RefreshFailed);
    assert!(err.message.contains("Token is invalid or expired"));
    assert_cleared(&session);
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::LoggedOut {
            reason: LogoutReason::RefreshFailed
        }
    );
}

#[tokio::test]
async fn test_refresh_without_access_field_clears_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path("/api/v1/budgets/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"token": "??"})),
        1,
    )
    .await;

    let err = client_for(&server, &session)
        .send(&ApiRequest::get("/budgets/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::RefreshFailed);
    assert_cleared(&session);
}

#[tokio::test]
async fn test_missing_refresh_token_returns_original_401() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = SessionManager::in_memory();
    session.set(SessionKey::AccessToken, "A1").unwrap();
    session.set(SessionKey::Username, "alice").unwrap();
    let mut events = session.subscribe();

    Mock::given(method("GET"))
        .and(path("/api/v1/reports/summary/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(200), 0).await;

    let err = client_for(&server, &session)
        .send(&ApiRequest::get("/reports/summary/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::SessionEnded);
    assert!(err.requires_login());
    assert_eq!(err.message, "Token expired");
    assert_cleared(&session);
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::LoggedOut {
            reason: LogoutReason::MissingRefreshToken
        }
    );
}

#[tokio::test]
async fn test_retry_401_is_not_intercepted_again() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})),
        1,
    )
    .await;

    let err = client_for(&server, &session)
        .send(&ApiRequest::get("/transactions/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Unauthorized);
    assert!(!err.requires_login());
    assert_eq!(session.access_token().as_deref(), Some("A2"));
    assert_eq!(session.refresh_token().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_refresh_timeout_clears_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");
    let mut events = session.subscribe();

    Mock::given(method("GET"))
        .and(path("/api/v1/budgets/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let client = ApiClient::with_http(http, format!("{}/api/v1", server.uri()), session.clone());

    let err = client
        .send(&ApiRequest::get("/budgets/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::RefreshFailed);
    assert!(err.requires_login());
    assert_cleared(&session);
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::LoggedOut {
            reason: LogoutReason::RefreshFailed
        }
    );
}

#[tokio::test]
async fn test_other_errors_pass_through() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");

    Mock::given(method("POST"))
        .and(path("/api/v1/budgets/9/copy_to_next_month/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Next month's budget already exists"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(200), 0).await;

    let err = client_for(&server, &session)
        .send(&ApiRequest::post("/budgets/9/copy_to_next_month/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::HttpStatus);
    assert_eq!(err.message, "Next month's budget already exists");
    assert_eq!(session.access_token().as_deref(), Some("A1"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let session = logged_in("A1", "R1");

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(3)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"access": "A2"}))
            .set_delay(Duration::from_millis(150)),
        1,
    )
    .await;

    let client = client_for(&server, &session);
    let transactions = ApiRequest::get("/transactions/");
    let categories = ApiRequest::get("/categories/");
    let budgets = ApiRequest::get("/budgets/");
    let (a, b, c) = tokio::join!(
        client.send(&transactions),
        client.send(&categories),
        client.send(&budgets),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(session.access_token().as_deref(), Some("A2"));
}
