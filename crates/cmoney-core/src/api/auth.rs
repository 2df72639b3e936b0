//! Login, registration and account endpoints.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::amount;
use crate::client::{ApiClient, ApiRequest, to_value};
use crate::error::{ApiError, ApiResult};
use crate::session::{LogoutReason, TokenPair};

pub const TOKEN_PATH: &str = "/auth/token/";
pub const REGISTER_PATH: &str = "/auth/register/";
pub const PROFILE_PATH: &str = "/auth/profile/";
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change-password/";
pub const STATS_PATH: &str = "/auth/stats/";

const LOGIN_FALLBACK: &str = "invalid username or password";
const REGISTER_FALLBACK: &str = "registration failed";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
    refresh: String,
}

/// Fields of the registration form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub monthly_budget: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub date_joined: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Registered {
    user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserStats {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub member_since: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

/// Server acknowledgement carrying a display message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

/// Exchanges credentials for a token pair and starts a session.
///
/// With `remember` the username is kept for pre-filling the next login;
/// without it any previously remembered username is dropped.
///
/// # Errors
/// Returns the backend's message (or a generic one) on rejected
/// credentials, and a storage error if the session cannot be saved.
pub async fn login(
    client: &ApiClient,
    username: &str,
    password: &str,
    remember: bool,
) -> ApiResult<()> {
    let request = ApiRequest::post(TOKEN_PATH).json(json!({
        "username": username,
        "password": password,
    }));

    let tokens: TokenResponse = client
        .send_public(&request)
        .await
        .and_then(|response| response.json())
        .map_err(|err| with_fallback(err, LOGIN_FALLBACK))?;

    client
        .session()
        .begin(
            username,
            &TokenPair {
                access: tokens.access,
                refresh: tokens.refresh,
            },
            remember,
        )
        .map_err(|err| ApiError::storage(&err))
}

/// Creates an account. Does not log in.
///
/// # Errors
/// Fails locally when the passwords differ; otherwise surfaces the
/// backend's field errors joined line by line.
pub async fn register(client: &ApiClient, form: &Registration) -> ApiResult<User> {
    if form.password != form.password_confirm {
        return Err(ApiError::validation("passwords do not match"));
    }

    let request = ApiRequest::post(REGISTER_PATH).json(to_value(form)?);
    let registered: Registered = client
        .send_public(&request)
        .await
        .and_then(|response| response.json())
        .map_err(|err| with_fallback(err, REGISTER_FALLBACK))?;

    tracing::info!(username = %registered.user.username, "account registered");
    Ok(registered.user)
}

/// Ends the session. Nothing is sent to the backend.
///
/// # Errors
/// Returns a storage error if the session file cannot be removed.
pub fn logout(client: &ApiClient) -> ApiResult<()> {
    client
        .session()
        .end(LogoutReason::UserRequested)
        .map_err(|err| ApiError::storage(&err))
}

pub fn remembered_username(client: &ApiClient) -> Option<String> {
    client.session().remembered_username()
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn profile(client: &ApiClient) -> ApiResult<User> {
    client.get_json(ApiRequest::get(PROFILE_PATH)).await
}

/// Changes the password. The current session stays valid.
///
/// # Errors
/// Fails locally when the new passwords differ; otherwise see [`ApiClient::send`].
pub async fn change_password(
    client: &ApiClient,
    old_password: &str,
    new_password: &str,
    new_password_confirm: &str,
) -> ApiResult<Acknowledgement> {
    if new_password != new_password_confirm {
        return Err(ApiError::validation("new passwords do not match"));
    }

    let body = json!({
        "old_password": old_password,
        "new_password": new_password,
        "new_password_confirm": new_password_confirm,
    });
    client.post_json(CHANGE_PASSWORD_PATH, &body).await
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn stats(client: &ApiClient) -> ApiResult<UserStats> {
    client.get_json(ApiRequest::get(STATS_PATH)).await
}

fn with_fallback(err: ApiError, fallback: &str) -> ApiError {
    ApiError {
        message: err.user_message_or(fallback),
        ..err
    }
}
