//! Authenticated HTTP client for the C-Money API.
//!
//! Every request goes through two interceptors:
//! - outbound: attach `Authorization: Bearer <access>` when a session exists
//! - inbound: on 401, refresh the access token once and re-issue the request
//!
//! Refreshes are single-flight. Concurrent 401s wait on one refresh gate, and
//! a request whose rejected token was already replaced simply retries with the
//! new one.

mod request;

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;

pub use request::{ApiRequest, ApiResponse};

use crate::config::Config;
use crate::error::{ApiError, ApiErrorKind, ApiResult};
use crate::session::{LogoutReason, SessionKey, SessionManager, mask_token};

pub const REFRESH_PATH: &str = "/auth/token/refresh/";

const USER_AGENT: &str = concat!("cmoney/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens.
    #[serde(default)]
    refresh: Option<String>,
}

/// Shared HTTP client. Cheap to clone; clones share the session and refresh gate.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionManager,
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Client with default transport settings.
    pub fn new(base_url: impl Into<String>, session: SessionManager) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, session)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: SessionManager,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Builds a client from the effective base URL and timeout in `config`.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &Config, session: SessionManager) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self::with_http(http, base_url, session))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Sends `request` with the current access token, recovering from one 401.
    ///
    /// The retried request is not intercepted again: a 401 on retry is
    /// returned as [`ApiErrorKind::Unauthorized`] and the session is kept.
    /// A 401 with no refresh token clears the session and is returned as
    /// [`ApiErrorKind::SessionEnded`].
    ///
    /// # Errors
    /// Returns transport, status, or refresh failures. A refresh failure also
    /// clears the session.
    pub async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let token = self.session.access_token();
        let response = self.dispatch(request, token.as_deref()).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return response.into_result();
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            "request rejected with 401"
        );
        let original = ApiError::http_status(response.status, &response.body);
        let fresh = self.recover(token.as_deref(), original).await?;

        tracing::debug!(method = %request.method, path = %request.path, "retrying request");
        self.dispatch(request, Some(&fresh)).await?.into_result()
    }

    /// Sends `request` without a bearer token and without 401 recovery.
    ///
    /// Used for login, registration and the refresh call itself. A 401 here
    /// means rejected credentials, so it is reported as
    /// [`ApiErrorKind::HttpStatus`].
    ///
    /// # Errors
    /// Returns transport or status failures.
    pub async fn send_public(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.dispatch(request, None)
            .await?
            .into_result()
            .map_err(|err| match err.kind {
                ApiErrorKind::Unauthorized => ApiError {
                    kind: ApiErrorKind::HttpStatus,
                    ..err
                },
                _ => err,
            })
    }

    /// Sends `request` and decodes the JSON body.
    ///
    /// # Errors
    /// See [`ApiClient::send`]; also fails if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        self.send(&request).await?.json()
    }

    /// POST a JSON body to `path` and decode the response.
    ///
    /// # Errors
    /// See [`ApiClient::send`]; also fails if the body does not decode.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path).json(to_value(body)?);
        self.send(&request).await?.json()
    }

    /// PATCH a JSON body to `path` and decode the response.
    ///
    /// # Errors
    /// See [`ApiClient::send`]; also fails if the body does not decode.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::patch(path).json(to_value(body)?);
        self.send(&request).await?.json()
    }

    /// DELETE `path`, ignoring any response body.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send(&ApiRequest::delete(path)).await.map(|_| ())
    }

    async fn recover(&self, rejected: Option<&str>, original: ApiError) -> ApiResult<String> {
        let _gate = self.refresh_gate.lock().await;

        let current = self.session.snapshot();
        if let Some(access) = current.access_token
            && Some(access.as_str()) != rejected
        {
            tracing::debug!("access token already replaced; skipping refresh");
            return Ok(access);
        }

        let Some(refresh) = current.refresh_token else {
            tracing::warn!("401 with no refresh token; ending session");
            self.force_logout(LogoutReason::MissingRefreshToken);
            return Err(original.into_session_ended());
        };

        match self.refresh_access_token(&refresh).await {
            Ok(access) => {
                tracing::info!(access = %mask_token(&access), "access token refreshed");
                Ok(access)
            }
            Err(err) => {
                tracing::warn!(kind = %err.kind, error = %err, "token refresh failed; ending session");
                self.force_logout(LogoutReason::RefreshFailed);
                Err(err)
            }
        }
    }

    async fn refresh_access_token(&self, refresh: &str) -> ApiResult<String> {
        let request = ApiRequest::post(REFRESH_PATH).json(json!({ "refresh": refresh }));
        let tokens: RefreshResponse = self
            .send_public(&request)
            .await
            .and_then(|response| response.json())
            .map_err(ApiError::into_refresh_failure)?;

        if tokens.access.is_empty() {
            return Err(ApiError::new(
                ApiErrorKind::RefreshFailed,
                "Session refresh failed: empty access token",
            ));
        }

        if let Err(err) = self.session.update_access_token(&tokens.access) {
            tracing::warn!(error = %format!("{err:#}"), "failed to persist refreshed access token");
        }
        if let Some(rotated) = tokens.refresh.as_deref().filter(|r| !r.is_empty())
            && let Err(err) = self.session.set(SessionKey::RefreshToken, rotated)
        {
            tracing::warn!(error = %format!("{err:#}"), "failed to persist rotated refresh token");
        }

        Ok(tokens.access)
    }

    fn force_logout(&self, reason: LogoutReason) {
        if let Err(err) = self.session.end(reason) {
            tracing::warn!(error = %format!("{err:#}"), "failed to clear session");
        }
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> ApiResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::from_transport(&err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::from_transport(&err))?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            authenticated = token.is_some(),
            "api response"
        );
        Ok(ApiResponse { status, body })
    }
}

pub(crate) fn to_value<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body)
        .map_err(|err| ApiError::validation(format!("Failed to encode request body: {err}")))
}
