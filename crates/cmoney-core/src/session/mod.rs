//! Session persistence and the session manager.
//!
//! The [`SessionStore`] trait is the raw key/value contract (set, get,
//! remove, clear). [`SessionManager`] is the only component that touches the
//! store keys: it hands out immutable [`Session`] snapshots and publishes
//! [`AuthEvent`]s whenever the logged-in state changes.

mod file;
mod memory;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

const AUTH_EVENT_CAPACITY: usize = 16;

/// Durable key/value storage for session fields.
///
/// Values are opaque strings, trusted as-is. No expiry, no encryption.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns an error if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the change cannot be persisted.
    fn remove(&self, key: &str) -> Result<()>;

    /// Removes every key. Clearing an empty store is a no-op.
    ///
    /// # Errors
    /// Returns an error if the change cannot be persisted.
    fn clear(&self) -> Result<()>;
}

/// Persisted session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    Username,
    RememberUsername,
}

impl SessionKey {
    pub const ALL: [SessionKey; 4] = [
        SessionKey::AccessToken,
        SessionKey::RefreshToken,
        SessionKey::Username,
        SessionKey::RememberUsername,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionKey::AccessToken => "access_token",
            SessionKey::RefreshToken => "refresh_token",
            SessionKey::Username => "username",
            SessionKey::RememberUsername => "remember_username",
        }
    }
}

/// Immutable view of the session at one point in time.
///
/// Empty strings read from the store are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub remember_username: Option<String>,
}

impl Session {
    /// True when an access token is present. Freshness is not checked.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    /// The "remember me" flag.
    pub fn remember(&self) -> bool {
        self.remember_username.is_some()
    }
}

/// Logged-in state, keyed solely by access-token presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// A request got 401 and there was no refresh token to recover with.
    MissingRefreshToken,
    /// The refresh endpoint call failed.
    RefreshFailed,
}

/// Auth-state transitions published by the [`SessionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn { username: String },
    TokenRefreshed,
    /// The session was destroyed; the user must re-authenticate.
    LoggedOut { reason: LogoutReason },
}

/// Access and refresh tokens issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Owns the session store and all reads/writes of its keys.
///
/// Cheap to clone; clones share the same store and event channel.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { store, events }
    }

    /// A manager over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::default()))
    }

    /// Subscribes to auth-state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn get(&self, key: SessionKey) -> Option<String> {
        self.store
            .get(key.as_str())
            .filter(|value| !value.is_empty())
    }

    /// # Errors
    /// Returns an error if the value cannot be persisted.
    pub fn set(&self, key: SessionKey, value: &str) -> Result<()> {
        self.store.set(key.as_str(), value)
    }

    /// # Errors
    /// Returns an error if the change cannot be persisted.
    pub fn remove(&self, key: SessionKey) -> Result<()> {
        self.store.remove(key.as_str())
    }

    pub fn snapshot(&self) -> Session {
        Session {
            access_token: self.get(SessionKey::AccessToken),
            refresh_token: self.get(SessionKey::RefreshToken),
            username: self.get(SessionKey::Username),
            remember_username: self.get(SessionKey::RememberUsername),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.get(SessionKey::AccessToken)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(SessionKey::RefreshToken)
    }

    pub fn auth_state(&self) -> AuthState {
        self.snapshot().auth_state()
    }

    /// Username saved by "remember me", used to pre-fill the login form.
    pub fn remembered_username(&self) -> Option<String> {
        self.get(SessionKey::RememberUsername)
    }

    /// Stores a freshly issued token pair (Unauthenticated -> Authenticated).
    ///
    /// # Errors
    /// Returns an error if any field cannot be persisted.
    pub fn begin(&self, username: &str, tokens: &TokenPair, remember: bool) -> Result<()> {
        self.set(SessionKey::AccessToken, &tokens.access)?;
        self.set(SessionKey::RefreshToken, &tokens.refresh)?;
        self.set(SessionKey::Username, username)?;
        if remember {
            self.set(SessionKey::RememberUsername, username)?;
        } else {
            self.remove(SessionKey::RememberUsername)?;
        }

        tracing::info!(username, remember, "session started");
        let _ = self.events.send(AuthEvent::LoggedIn {
            username: username.to_string(),
        });
        Ok(())
    }

    /// Replaces the access token after a successful refresh.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted.
    pub fn update_access_token(&self, access: &str) -> Result<()> {
        self.set(SessionKey::AccessToken, access)?;
        let _ = self.events.send(AuthEvent::TokenRefreshed);
        Ok(())
    }

    /// Destroys the whole session (Authenticated -> Unauthenticated).
    ///
    /// The event is published even when persisting the clear fails, so
    /// subscribers still route to the login view.
    ///
    /// # Errors
    /// Returns an error if the store cannot be cleared.
    pub fn end(&self, reason: LogoutReason) -> Result<()> {
        let cleared = self.store.clear();
        tracing::info!(?reason, "session cleared");
        let _ = self.events.send(AuthEvent::LoggedOut { reason });
        cleared
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("auth_state", &self.auth_state())
            .finish_non_exhaustive()
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
